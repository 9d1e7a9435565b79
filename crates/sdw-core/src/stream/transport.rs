//! Collaborator traits for the stream coordinator
//!
//! The coordinator never touches hardware itself. It drives:
//! - a [`StreamTransport`] that prepares, enables, disables and deprepares
//!   the shared SoundWire stream runtime
//! - a [`SlotConfigurator`] that programs TDM slot masks and channel maps
//! - an [`EndpointRegistry`] that lists the per-codec stream runtimes of a
//!   multi-codec DAI link
//!
//! All methods take `&self`: one transport is shared by every substream of a
//! sound card, so implementations that keep state use interior mutability.

use super::error::TransportError;
use crate::types::Substream;

/// Lifecycle operations on a shared stream runtime
///
/// The bus requires prepare before enable and disable before deprepare.
pub trait StreamTransport {
    /// Opaque stream runtime owned by the bus driver
    type Handle;

    /// Allocate bandwidth and program port parameters
    fn prepare_stream(&self, handle: &Self::Handle) -> Result<(), TransportError>;

    /// Start data transfer on all ports of the stream
    fn enable_stream(&self, handle: &Self::Handle) -> Result<(), TransportError>;

    /// Stop data transfer on all ports of the stream
    fn disable_stream(&self, handle: &Self::Handle) -> Result<(), TransportError>;

    /// Release bandwidth allocated by prepare
    fn deprepare_stream(&self, handle: &Self::Handle) -> Result<(), TransportError>;
}

impl<T: StreamTransport + ?Sized> StreamTransport for &T {
    type Handle = T::Handle;

    fn prepare_stream(&self, handle: &Self::Handle) -> Result<(), TransportError> {
        (**self).prepare_stream(handle)
    }

    fn enable_stream(&self, handle: &Self::Handle) -> Result<(), TransportError> {
        (**self).enable_stream(handle)
    }

    fn disable_stream(&self, handle: &Self::Handle) -> Result<(), TransportError> {
        (**self).disable_stream(handle)
    }

    fn deprepare_stream(&self, handle: &Self::Handle) -> Result<(), TransportError> {
        (**self).deprepare_stream(handle)
    }
}

/// One side of a TDM channel map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMap<'a> {
    /// Number of channels mapped on this side, never more than `offsets.len()`
    pub channels: u32,
    /// Byte offset of each channel within the frame
    pub offsets: &'a [u32],
}

impl ChannelMap<'static> {
    /// A side with nothing mapped
    pub const EMPTY: ChannelMap<'static> = ChannelMap {
        channels: 0,
        offsets: &[],
    };
}

impl<'a> ChannelMap<'a> {
    pub fn new(channels: u32, offsets: &'a [u32]) -> Self {
        Self { channels, offsets }
    }

    pub fn is_empty(&self) -> bool {
        self.channels == 0
    }
}

/// TDM slot and channel-map programming on a CPU DAI
pub trait SlotConfigurator {
    /// Program the active slot masks, slot count and slot width
    fn set_tdm_slot(
        &self,
        device_mask: u32,
        channel_mask: u32,
        slots: u32,
        slot_width: u32,
    ) -> Result<(), TransportError>;

    /// Program the per-channel slot offsets for both sides
    fn set_channel_map(
        &self,
        device: ChannelMap<'_>,
        channel: ChannelMap<'_>,
    ) -> Result<(), TransportError>;
}

/// Stream runtime attached to one codec DAI of a DAI link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecStream<H> {
    /// The codec exposes a stream runtime for this direction
    Supported(H),
    /// The codec has no stream for this direction
    Unsupported,
}

impl<H> CodecStream<H> {
    pub fn into_handle(self) -> Option<H> {
        match self {
            CodecStream::Supported(h) => Some(h),
            CodecStream::Unsupported => None,
        }
    }
}

impl<H> From<Option<H>> for CodecStream<H> {
    fn from(value: Option<H>) -> Self {
        match value {
            Some(h) => CodecStream::Supported(h),
            None => CodecStream::Unsupported,
        }
    }
}

/// Lookup of codec stream runtimes for a substream
pub trait EndpointRegistry<H> {
    /// Stream runtimes of every codec DAI on the substream's link, in link order
    fn codec_streams(&self, substream: &Substream) -> Vec<CodecStream<H>>;
}

impl<H: Clone> EndpointRegistry<H> for Vec<CodecStream<H>> {
    fn codec_streams(&self, _substream: &Substream) -> Vec<CodecStream<H>> {
        self.clone()
    }
}
