//! In-memory SoundWire transport for tests and the `sdw-sim` tool
//!
//! [`RecordingTransport`] records every call it receives, tracks the bus
//! state of each stream it has seen, and fails operations on demand. It
//! enforces the bus ordering (prepare → enable → disable → deprepare), so a
//! coordinator that skips a step gets an error back just like on hardware.
//!
//! [`Scenario`] describes one scripted open/close cycle of a substream and
//! drives it through a [`StreamCoordinator`].

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{read_yaml, CoordinatorConfig};
use crate::stream::{
    ChannelMap, CodecStream, PreparedFlag, SlotConfigurator, StreamCoordinator, StreamResult,
    StreamTransport, TransportError, EINVAL,
};
use crate::types::{Direction, EndpointId, HwParams, SampleFormat, Substream};

/// Stream runtime identifier used by the simulated bus
pub type StreamId = u32;

/// Operations the simulated transport can be asked to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportOp {
    Prepare,
    Enable,
    Disable,
    Deprepare,
    SetTdmSlot,
    SetChannelMap,
}

/// One recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Prepare(StreamId),
    Enable(StreamId),
    Disable(StreamId),
    Deprepare(StreamId),
    SetTdmSlot {
        device_mask: u32,
        channel_mask: u32,
        slots: u32,
        slot_width: u32,
    },
    SetChannelMap {
        device_channels: u32,
        device_offsets: Vec<u32>,
        channel_channels: u32,
        channel_offsets: Vec<u32>,
    },
}

impl TransportCall {
    pub fn op(&self) -> TransportOp {
        match self {
            TransportCall::Prepare(_) => TransportOp::Prepare,
            TransportCall::Enable(_) => TransportOp::Enable,
            TransportCall::Disable(_) => TransportOp::Disable,
            TransportCall::Deprepare(_) => TransportOp::Deprepare,
            TransportCall::SetTdmSlot { .. } => TransportOp::SetTdmSlot,
            TransportCall::SetChannelMap { .. } => TransportOp::SetChannelMap,
        }
    }
}

/// Bus-side state of a stream runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusState {
    #[default]
    Configured,
    Prepared,
    Enabled,
}

/// Transport that records calls instead of talking to hardware
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: RefCell<Vec<TransportCall>>,
    failures: RefCell<HashMap<TransportOp, VecDeque<i32>>>,
    states: RefCell<HashMap<StreamId, BusState>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with `code`
    ///
    /// Failures queue up: calling this twice fails the next two calls.
    pub fn fail_next(&self, op: TransportOp, code: i32) {
        self.failures.borrow_mut().entry(op).or_default().push_back(code);
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.borrow().clone()
    }

    /// Number of recorded calls of one kind
    pub fn count(&self, op: TransportOp) -> usize {
        self.calls.borrow().iter().filter(|c| c.op() == op).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Current bus state of a stream
    pub fn state(&self, id: StreamId) -> BusState {
        self.states.borrow().get(&id).copied().unwrap_or_default()
    }

    /// Whether the stream holds bus resources (prepared or enabled)
    pub fn is_prepared(&self, id: StreamId) -> bool {
        self.state(id) != BusState::Configured
    }

    fn record(&self, call: TransportCall) -> Result<(), TransportError> {
        let op = call.op();
        self.calls.borrow_mut().push(call);
        let injected = self
            .failures
            .borrow_mut()
            .get_mut(&op)
            .and_then(|queue| queue.pop_front());
        match injected {
            Some(code) => Err(TransportError::new(code, format!("injected {:?} failure", op))),
            None => Ok(()),
        }
    }

    fn transition(
        &self,
        call: TransportCall,
        id: StreamId,
        from: BusState,
        to: BusState,
    ) -> Result<(), TransportError> {
        let op = call.op();
        self.record(call)?;
        let current = self.state(id);
        if current != from {
            return Err(TransportError::new(
                -EINVAL,
                format!("{:?} on stream {} in state {:?}", op, id, current),
            ));
        }
        self.states.borrow_mut().insert(id, to);
        Ok(())
    }
}

impl StreamTransport for RecordingTransport {
    type Handle = StreamId;

    fn prepare_stream(&self, handle: &StreamId) -> Result<(), TransportError> {
        self.transition(
            TransportCall::Prepare(*handle),
            *handle,
            BusState::Configured,
            BusState::Prepared,
        )
    }

    fn enable_stream(&self, handle: &StreamId) -> Result<(), TransportError> {
        self.transition(
            TransportCall::Enable(*handle),
            *handle,
            BusState::Prepared,
            BusState::Enabled,
        )
    }

    fn disable_stream(&self, handle: &StreamId) -> Result<(), TransportError> {
        self.transition(
            TransportCall::Disable(*handle),
            *handle,
            BusState::Enabled,
            BusState::Prepared,
        )
    }

    fn deprepare_stream(&self, handle: &StreamId) -> Result<(), TransportError> {
        self.transition(
            TransportCall::Deprepare(*handle),
            *handle,
            BusState::Prepared,
            BusState::Configured,
        )
    }
}

impl SlotConfigurator for RecordingTransport {
    fn set_tdm_slot(
        &self,
        device_mask: u32,
        channel_mask: u32,
        slots: u32,
        slot_width: u32,
    ) -> Result<(), TransportError> {
        self.record(TransportCall::SetTdmSlot {
            device_mask,
            channel_mask,
            slots,
            slot_width,
        })
    }

    fn set_channel_map(
        &self,
        device: ChannelMap<'_>,
        channel: ChannelMap<'_>,
    ) -> Result<(), TransportError> {
        self.record(TransportCall::SetChannelMap {
            device_channels: device.channels,
            device_offsets: device.offsets.to_vec(),
            channel_channels: channel.channels,
            channel_offsets: channel.offsets.to_vec(),
        })
    }
}

/// Failure to inject during a scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedFailure {
    pub op: TransportOp,
    /// Negative errno returned by the failing call
    pub code: i32,
    /// Number of consecutive calls that fail
    #[serde(default = "default_times")]
    pub times: u32,
}

fn default_times() -> u32 {
    1
}

/// Scripted open/close cycle of one substream
///
/// ```yaml
/// endpoint: rx_codec_dma_rx0
/// direction: playback
/// params: { format: s16_le, channels: 2 }
/// codec_streams: [~, 3]
/// failures:
///   - { op: enable, code: -110 }
/// prepare_attempts: 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub endpoint: EndpointId,
    pub direction: Direction,
    pub params: HwParams,
    /// Stream runtime of each codec DAI on the link; `~` for unsupported
    pub codec_streams: Vec<Option<StreamId>>,
    pub failures: Vec<InjectedFailure>,
    /// How many times prepare is called before release
    pub prepare_attempts: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            endpoint: EndpointId::RxCodecDmaRx0,
            direction: Direction::Playback,
            params: HwParams::new(SampleFormat::S16Le, 2),
            codec_streams: vec![Some(1)],
            failures: Vec::new(),
            prepare_attempts: 1,
        }
    }
}

/// What happened during a scenario run
#[derive(Debug)]
pub struct ScenarioReport {
    pub selected_stream: Option<StreamId>,
    pub hw_params: StreamResult<()>,
    pub prepare_results: Vec<StreamResult<()>>,
    /// Prepared flag right before release
    pub prepared_before_release: bool,
    /// Prepared flag after release
    pub prepared_after_release: bool,
    pub calls: Vec<TransportCall>,
}

impl Scenario {
    /// Load a scenario file
    ///
    /// # Errors
    /// The file is missing or is not a valid scenario.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        read_yaml(path)
    }

    pub fn substream(&self) -> Substream {
        Substream::new(self.endpoint, self.direction)
    }

    /// Run hw_params, prepare (`prepare_attempts` times) and release
    pub fn run(&self, config: CoordinatorConfig) -> ScenarioReport {
        let transport = RecordingTransport::new();
        for failure in &self.failures {
            for _ in 0..failure.times {
                transport.fail_next(failure.op, failure.code);
            }
        }

        let coordinator = StreamCoordinator::with_config(&transport, config);
        let substream = self.substream();
        let registry: Vec<CodecStream<StreamId>> =
            self.codec_streams.iter().copied().map(CodecStream::from).collect();

        let mut stream = None;
        let mut prepared = PreparedFlag::default();

        log::info!("scenario: {} {}", substream.endpoint, substream.direction);
        let hw_params =
            coordinator.hw_params(&substream, &self.params, &registry, &transport, &mut stream);

        let prepare_results = (0..self.prepare_attempts)
            .map(|attempt| {
                let result = coordinator.prepare(&substream, stream.as_ref(), &mut prepared);
                if let Err(e) = &result {
                    log::warn!("scenario: prepare attempt {} failed: {}", attempt + 1, e);
                }
                result
            })
            .collect();

        let prepared_before_release = prepared.is_prepared();
        coordinator.release(&substream, stream.as_ref(), &mut prepared);

        ScenarioReport {
            selected_stream: stream,
            hw_params,
            prepare_results,
            prepared_before_release,
            prepared_after_release: prepared.is_prepared(),
            calls: transport.calls(),
        }
    }
}
