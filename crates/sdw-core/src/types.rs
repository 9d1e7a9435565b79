//! Common types for the SoundWire stream coordinator
//!
//! Endpoint identities, stream directions and the small amount of PCM
//! parameter state the coordinator reads from a substream.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of CPU DAI roles known to the coordinator
pub const NUM_ENDPOINTS: usize = 15;

/// Hardware role of the CPU DAI attached to a substream
///
/// Assigned when the DAI is registered and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointId {
    /// WSA speaker codec DMA, RX 0
    WsaCodecDmaRx0,
    /// WSA speaker codec DMA, RX 1
    WsaCodecDmaRx1,
    /// RX macro codec DMA, RX 0
    RxCodecDmaRx0,
    /// RX macro codec DMA, RX 1
    RxCodecDmaRx1,
    /// TX macro codec DMA, TX 0
    TxCodecDmaTx0,
    /// TX macro codec DMA, TX 1
    TxCodecDmaTx1,
    /// TX macro codec DMA, TX 2
    TxCodecDmaTx2,
    /// TX macro codec DMA, TX 3
    TxCodecDmaTx3,
    /// VA macro codec DMA (digital mics, no SoundWire stream)
    VaCodecDmaTx0,
    /// Tertiary TDM playback
    TertiaryTdmRx0,
    /// Tertiary TDM capture
    TertiaryTdmTx0,
    PrimaryMi2sRx,
    PrimaryMi2sTx,
    SlimbusRx0,
    SlimbusTx0,
}

impl EndpointId {
    /// All endpoint roles in registration order
    pub const ALL: [EndpointId; NUM_ENDPOINTS] = [
        EndpointId::WsaCodecDmaRx0,
        EndpointId::WsaCodecDmaRx1,
        EndpointId::RxCodecDmaRx0,
        EndpointId::RxCodecDmaRx1,
        EndpointId::TxCodecDmaTx0,
        EndpointId::TxCodecDmaTx1,
        EndpointId::TxCodecDmaTx2,
        EndpointId::TxCodecDmaTx3,
        EndpointId::VaCodecDmaTx0,
        EndpointId::TertiaryTdmRx0,
        EndpointId::TertiaryTdmTx0,
        EndpointId::PrimaryMi2sRx,
        EndpointId::PrimaryMi2sTx,
        EndpointId::SlimbusRx0,
        EndpointId::SlimbusTx0,
    ];

    /// Stable snake_case name, matching the serde representation
    pub fn name(&self) -> &'static str {
        match self {
            EndpointId::WsaCodecDmaRx0 => "wsa_codec_dma_rx0",
            EndpointId::WsaCodecDmaRx1 => "wsa_codec_dma_rx1",
            EndpointId::RxCodecDmaRx0 => "rx_codec_dma_rx0",
            EndpointId::RxCodecDmaRx1 => "rx_codec_dma_rx1",
            EndpointId::TxCodecDmaTx0 => "tx_codec_dma_tx0",
            EndpointId::TxCodecDmaTx1 => "tx_codec_dma_tx1",
            EndpointId::TxCodecDmaTx2 => "tx_codec_dma_tx2",
            EndpointId::TxCodecDmaTx3 => "tx_codec_dma_tx3",
            EndpointId::VaCodecDmaTx0 => "va_codec_dma_tx0",
            EndpointId::TertiaryTdmRx0 => "tertiary_tdm_rx0",
            EndpointId::TertiaryTdmTx0 => "tertiary_tdm_tx0",
            EndpointId::PrimaryMi2sRx => "primary_mi2s_rx",
            EndpointId::PrimaryMi2sTx => "primary_mi2s_tx",
            EndpointId::SlimbusRx0 => "slimbus_rx0",
            EndpointId::SlimbusTx0 => "slimbus_tx0",
        }
    }

    /// Whether hw_params should pick up the codec stream runtime for this role
    ///
    /// WSA RX 1 shares the stream of WSA RX 0 and never selects its own.
    pub fn selects_stream_handle(&self) -> bool {
        role_of(*self) == StreamRole::Relevant && *self != EndpointId::WsaCodecDmaRx1
    }

    /// Whether this role is a TDM interface configured through slot masks
    pub fn is_tdm(&self) -> bool {
        matches!(self, EndpointId::TertiaryTdmRx0 | EndpointId::TertiaryTdmTx0)
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when parsing an unknown endpoint name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown endpoint: {0}")]
pub struct UnknownEndpoint(pub String);

impl FromStr for EndpointId {
    type Err = UnknownEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        EndpointId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| UnknownEndpoint(s.to_string()))
    }
}

/// Participation of an endpoint role in the shared-stream protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    /// Prepare/release drive the shared stream for this role
    Relevant,
    /// The transport handles this role alone; coordinator calls are no-ops
    Irrelevant,
}

/// Roles whose substreams prepare, enable and release the shared stream
const STREAM_RELEVANT: [EndpointId; 8] = [
    EndpointId::WsaCodecDmaRx0,
    EndpointId::WsaCodecDmaRx1,
    EndpointId::RxCodecDmaRx0,
    EndpointId::RxCodecDmaRx1,
    EndpointId::TxCodecDmaTx0,
    EndpointId::TxCodecDmaTx1,
    EndpointId::TxCodecDmaTx2,
    EndpointId::TxCodecDmaTx3,
];

/// Classify an endpoint role
///
/// This is the single table every coordinator entry point consults.
pub fn role_of(id: EndpointId) -> StreamRole {
    if STREAM_RELEVANT.contains(&id) {
        StreamRole::Relevant
    } else {
        StreamRole::Irrelevant
    }
}

/// PCM stream direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Playback,
    Capture,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Playback => write!(f, "playback"),
            Direction::Capture => write!(f, "capture"),
        }
    }
}

/// PCM sample format as negotiated by hw_params
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    /// Signed 16-bit little-endian
    #[default]
    S16Le,
    /// Signed 24-bit little-endian in 32-bit container
    S24Le,
    /// Packed signed 24-bit little-endian
    S24Packed,
    /// Signed 32-bit little-endian
    S32Le,
    /// 32-bit float little-endian
    FloatLe,
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::S16Le => "S16_LE",
            SampleFormat::S24Le => "S24_LE",
            SampleFormat::S24Packed => "S24_3LE",
            SampleFormat::S32Le => "S32_LE",
            SampleFormat::FloatLe => "FLOAT_LE",
        };
        write!(f, "{}", name)
    }
}

/// The parts of a PCM substream the coordinator reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substream {
    /// Role of the CPU DAI this substream runs on
    pub endpoint: EndpointId,
    /// Playback or capture
    pub direction: Direction,
}

impl Substream {
    pub fn new(endpoint: EndpointId, direction: Direction) -> Self {
        Self {
            endpoint,
            direction,
        }
    }

    pub fn playback(endpoint: EndpointId) -> Self {
        Self::new(endpoint, Direction::Playback)
    }

    pub fn capture(endpoint: EndpointId) -> Self {
        Self::new(endpoint, Direction::Capture)
    }
}

/// Hardware parameters handed to hw_params
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HwParams {
    pub format: SampleFormat,
    pub channels: u32,
}

impl HwParams {
    pub fn new(format: SampleFormat, channels: u32) -> Self {
        Self {
            format,
            channels,
        }
    }
}
