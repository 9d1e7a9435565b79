//! TDM slot assignment for the tertiary TDM interface
//!
//! The TDM codec uses a fixed frame of 8 slots, 32 bits wide. Playback and
//! capture use the slots in opposite roles:
//!
//! ```text
//!              device side                  channel side
//! playback     mask 0b0000_0011             offsets [0, 4, .. 28] × channels
//! capture      mask 0b0000_1111             mask 0b0000_0011
//!              offsets [0, 4, .. 28] × channels
//! ```

use super::error::{StreamError, StreamResult, TransportError, EINVAL};
use super::transport::{ChannelMap, SlotConfigurator};
use crate::types::{Direction, HwParams, SampleFormat};

/// Number of slots in a TDM frame
pub const TDM_SLOTS: u32 = 8;

/// Width of a TDM slot in bits
pub const TDM_SLOT_WIDTH: u32 = 32;

/// Byte offset of each channel within a TDM frame
pub static TDM_SLOT_OFFSETS: [u32; TDM_SLOTS as usize] = [0, 4, 8, 12, 16, 20, 24, 28];

/// First two slots
pub const STEREO_SLOT_MASK: u32 = 0b0000_0011;

/// Slots the codec feeds on capture
pub const CAPTURE_SLOT_MASK: u32 = 0b0000_1111;

/// Sample formats the TDM interface accepts
pub const SUPPORTED_FORMATS: [SampleFormat; 1] = [SampleFormat::S16Le];

/// Slot mask and channel map for one side of the TDM link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSide {
    pub mask: u32,
    pub map: ChannelMap<'static>,
}

/// Slot layout derived from one hw_params call
///
/// Computed and discarded within a single configure call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    pub direction: Direction,
    pub channels: u32,
    pub slot_width: u32,
    pub slots: u32,
    pub device: SlotSide,
    pub channel: SlotSide,
}

impl SlotAssignment {
    /// Derive the slot layout for a direction and set of hw params
    ///
    /// # Errors
    /// - [`StreamError::UnsupportedSampleFormat`] for anything but S16_LE
    /// - [`StreamError::SlotConfigurationRejected`] for 0 or more than
    ///   [`TDM_SLOTS`] channels, so a channel map never outruns its offsets
    pub fn for_params(direction: Direction, params: &HwParams) -> StreamResult<Self> {
        if !SUPPORTED_FORMATS.contains(&params.format) {
            return Err(StreamError::UnsupportedSampleFormat(params.format));
        }
        if params.channels == 0 || params.channels > TDM_SLOTS {
            return Err(StreamError::SlotConfigurationRejected(TransportError::new(
                -EINVAL,
                format!("{} channels do not fit {} TDM slots", params.channels, TDM_SLOTS),
            )));
        }

        let full = ChannelMap::new(params.channels, &TDM_SLOT_OFFSETS);
        let (device, channel) = match direction {
            Direction::Playback => (
                SlotSide {
                    mask: STEREO_SLOT_MASK,
                    map: ChannelMap::EMPTY,
                },
                SlotSide { mask: 0, map: full },
            ),
            Direction::Capture => (
                SlotSide {
                    mask: CAPTURE_SLOT_MASK,
                    map: full,
                },
                SlotSide {
                    mask: STEREO_SLOT_MASK,
                    map: ChannelMap::EMPTY,
                },
            ),
        };

        Ok(Self {
            direction,
            channels: params.channels,
            slot_width: TDM_SLOT_WIDTH,
            slots: TDM_SLOTS,
            device,
            channel,
        })
    }

    /// Program this layout into a DAI: slot masks first, then channel map
    ///
    /// # Errors
    /// [`StreamError::SlotConfigurationRejected`] with the first rejection.
    pub fn apply<D>(&self, dai: &D) -> StreamResult<()>
    where
        D: SlotConfigurator + ?Sized,
    {
        dai.set_tdm_slot(
            self.device.mask,
            self.channel.mask,
            self.slots,
            self.slot_width,
        )
        .map_err(|e| {
            log::error!("tdm: failed to set tdm slot: {}", e);
            StreamError::SlotConfigurationRejected(e)
        })?;

        dai.set_channel_map(self.device.map, self.channel.map)
            .map_err(|e| {
                log::error!("tdm: failed to set channel map: {}", e);
                StreamError::SlotConfigurationRejected(e)
            })?;

        log::debug!(
            "tdm: {} configured, {} channels, device mask {:#04x}, channel mask {:#04x}",
            self.direction,
            self.channels,
            self.device.mask,
            self.channel.mask
        );
        Ok(())
    }
}
