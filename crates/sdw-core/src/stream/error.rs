//! Stream coordinator error types

use thiserror::Error;

use crate::types::SampleFormat;

/// errno value used for invalid PCM parameters
pub const EINVAL: i32 = 22;

/// Failure reported by the transport collaborator
///
/// Carries the errno-style code the bus driver returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {code})")]
pub struct TransportError {
    /// Negative errno as returned by the bus driver
    pub code: i32,
    /// Human-readable description
    pub message: String,
}

impl TransportError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Errors that can occur while driving the shared stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// prepare_stream failed; nothing was changed
    #[error("Failed to prepare stream: {0}")]
    TransportPrepareFailed(TransportError),

    /// enable_stream failed; the stream has already been deprepared again
    #[error("Failed to enable stream: {0}")]
    TransportEnableFailed(TransportError),

    /// TDM interfaces only accept S16_LE
    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(SampleFormat),

    /// The DAI rejected the TDM slot or channel map
    #[error("Slot configuration rejected: {0}")]
    SlotConfigurationRejected(TransportError),
}

impl StreamError {
    /// Negative errno equivalent of this error
    pub fn errno(&self) -> i32 {
        match self {
            StreamError::TransportPrepareFailed(e)
            | StreamError::TransportEnableFailed(e)
            | StreamError::SlotConfigurationRejected(e) => e.code,
            StreamError::UnsupportedSampleFormat(_) => -EINVAL,
        }
    }
}

/// Result type for stream coordinator operations
pub type StreamResult<T> = Result<T, StreamError>;
