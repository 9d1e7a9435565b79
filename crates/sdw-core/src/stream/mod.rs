//! Shared SoundWire stream lifecycle
//!
//! Several codec DAIs (WSA speaker amps, RX/TX macros) share one SoundWire
//! stream runtime. Each PCM substream drives it through:
//!
//! - **hw_params**: pick the codec stream runtime, or program TDM slots
//! - **prepare**: prepare and enable the stream, once per open/close cycle
//! - **release** (hw_free): disable and deprepare the stream
//!
//! All entry points are safe to call redundantly. Endpoints that don't take
//! part in the shared-stream protocol turn every call into a no-op.
//!
//! # Example Usage
//!
//! ```ignore
//! use sdw_core::stream::{PreparedFlag, StreamCoordinator};
//!
//! let coordinator = StreamCoordinator::new(bus);
//! let mut stream = None;
//! let mut prepared = PreparedFlag::default();
//!
//! coordinator.hw_params(&substream, &params, &link, &cpu_dai, &mut stream)?;
//! coordinator.prepare(&substream, stream.as_ref(), &mut prepared)?;
//! // ... playback ...
//! coordinator.release(&substream, stream.as_ref(), &mut prepared);
//! ```

mod coordinator;
mod error;
mod tdm;
mod transport;

pub use coordinator::{select_stream, PreparedFlag, StreamCoordinator};
pub use error::{StreamError, StreamResult, TransportError, EINVAL};
pub use tdm::{
    SlotAssignment, SlotSide, CAPTURE_SLOT_MASK, STEREO_SLOT_MASK, SUPPORTED_FORMATS, TDM_SLOTS,
    TDM_SLOT_OFFSETS, TDM_SLOT_WIDTH,
};
pub use transport::{ChannelMap, CodecStream, EndpointRegistry, SlotConfigurator, StreamTransport};
