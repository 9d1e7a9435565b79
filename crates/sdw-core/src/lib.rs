//! SDW Core - shared SoundWire stream coordination for Qualcomm sound cards

pub mod config;
pub mod sim;
pub mod stream;
pub mod types;

pub use types::*;
