//! Shared-stream lifecycle coordinator
//!
//! Drives a SoundWire stream runtime that several codec DAIs share through
//! one open/close cycle of a PCM substream:
//!
//! ```text
//! hw_params ──► prepare ──► (running) ──► release
//!   │             │                          │
//!   │             ├─ prepare_stream          ├─ disable_stream
//!   │             └─ enable_stream           └─ deprepare_stream
//!   └─ select codec stream / program TDM slots
//! ```
//!
//! The stream ports must be enabled before the WSA speaker amplifiers are
//! unmuted, otherwise DC accumulates on the line and produces click/pop
//! noise. The amplifiers are driven by the codec's DAPM and digital mute,
//! which run after prepare returns.

use crate::config::{CoordinatorConfig, TdmErrorPolicy};
use crate::types::{role_of, HwParams, StreamRole, Substream};

use super::error::{StreamError, StreamResult};
use super::tdm::SlotAssignment;
use super::transport::{CodecStream, EndpointRegistry, SlotConfigurator, StreamTransport};

/// Whether the shared stream of a substream is currently enabled
///
/// Owned by the caller for the lifetime of the substream. Only
/// [`StreamCoordinator::prepare`] sets it and only
/// [`StreamCoordinator::release`] clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreparedFlag(bool);

impl PreparedFlag {
    pub fn is_prepared(&self) -> bool {
        self.0
    }
}

/// Pick the stream runtime of a multi-codec DAI link
///
/// Scans every codec in link order; the last codec exposing a stream wins.
pub fn select_stream<H, I>(streams: I) -> Option<H>
where
    I: IntoIterator<Item = CodecStream<H>>,
{
    streams
        .into_iter()
        .fold(None, |selected, stream| stream.into_handle().or(selected))
}

/// Lifecycle coordinator for a shared stream runtime
pub struct StreamCoordinator<T> {
    transport: T,
    config: CoordinatorConfig,
}

impl<T: StreamTransport> StreamCoordinator<T> {
    /// Create a coordinator with the default configuration
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, CoordinatorConfig::default())
    }

    pub fn with_config(transport: T, config: CoordinatorConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Prepare and enable the shared stream
    ///
    /// No-op when the substream has no stream, its endpoint doesn't take part
    /// in the shared-stream protocol, or the stream is already prepared.
    ///
    /// # Errors
    /// - [`StreamError::TransportPrepareFailed`] if prepare fails; nothing changed
    /// - [`StreamError::TransportEnableFailed`] if enable fails; the stream
    ///   has been deprepared again
    pub fn prepare(
        &self,
        substream: &Substream,
        handle: Option<&T::Handle>,
        prepared: &mut PreparedFlag,
    ) -> StreamResult<()> {
        let Some(handle) = handle else {
            return Ok(());
        };

        if role_of(substream.endpoint) != StreamRole::Relevant {
            return Ok(());
        }

        if prepared.is_prepared() {
            log::debug!("prepare: {} already prepared", substream.endpoint);
            return Ok(());
        }

        self.transport
            .prepare_stream(handle)
            .map_err(StreamError::TransportPrepareFailed)?;

        if let Err(e) = self.transport.enable_stream(handle) {
            log::warn!(
                "prepare: enable failed on {}: {}, rolling back",
                substream.endpoint,
                e
            );
            if let Err(rollback) = self.transport.deprepare_stream(handle) {
                log::warn!("prepare: deprepare after failed enable: {}", rollback);
            }
            return Err(StreamError::TransportEnableFailed(e));
        }

        prepared.0 = true;
        log::debug!("prepare: {} stream enabled", substream.endpoint);
        Ok(())
    }

    /// Disable and deprepare the shared stream
    ///
    /// Runs during teardown, so transport failures are logged and otherwise
    /// ignored. The flag is always cleared when a prepared stream is released.
    pub fn release(
        &self,
        substream: &Substream,
        handle: Option<&T::Handle>,
        prepared: &mut PreparedFlag,
    ) {
        if role_of(substream.endpoint) != StreamRole::Relevant {
            return;
        }

        let Some(handle) = handle else {
            return;
        };
        if !prepared.is_prepared() {
            return;
        }

        if let Err(e) = self.transport.disable_stream(handle) {
            log::warn!("release: disable failed on {}: {}", substream.endpoint, e);
        }
        if let Err(e) = self.transport.deprepare_stream(handle) {
            log::warn!("release: deprepare failed on {}: {}", substream.endpoint, e);
        }

        prepared.0 = false;
        log::debug!("release: {} stream released", substream.endpoint);
    }

    /// Program the TDM slot layout for a substream
    ///
    /// Returns `Ok(None)` without touching the DAI for non-TDM endpoints.
    ///
    /// # Errors
    /// - [`StreamError::UnsupportedSampleFormat`] before any DAI call
    /// - [`StreamError::SlotConfigurationRejected`] if the DAI refuses a setting
    pub fn configure_transport<D>(
        &self,
        dai: &D,
        substream: &Substream,
        params: &HwParams,
    ) -> StreamResult<Option<SlotAssignment>>
    where
        D: SlotConfigurator + ?Sized,
    {
        if !substream.endpoint.is_tdm() {
            return Ok(None);
        }

        let assignment =
            SlotAssignment::for_params(substream.direction, params).map_err(|e| {
                log::error!("configure_transport: {}: {}", substream.endpoint, e);
                e
            })?;
        assignment.apply(dai)?;
        Ok(Some(assignment))
    }

    /// hw_params entry point
    ///
    /// For codec DMA endpoints, stores the selected codec stream runtime in
    /// `stream_slot` (left untouched if no codec exposes one). For TDM
    /// endpoints, programs the slot layout; failures follow
    /// [`CoordinatorConfig::tdm_errors`].
    ///
    /// # Errors
    /// Only TDM configuration errors, and only with [`TdmErrorPolicy::Propagate`].
    pub fn hw_params<R, D>(
        &self,
        substream: &Substream,
        params: &HwParams,
        registry: &R,
        dai: &D,
        stream_slot: &mut Option<T::Handle>,
    ) -> StreamResult<()>
    where
        R: EndpointRegistry<T::Handle> + ?Sized,
        D: SlotConfigurator + ?Sized,
    {
        if substream.endpoint.selects_stream_handle() {
            if let Some(handle) = select_stream(registry.codec_streams(substream)) {
                *stream_slot = Some(handle);
            } else {
                log::debug!("hw_params: no codec stream on {}", substream.endpoint);
            }
            return Ok(());
        }

        if substream.endpoint.is_tdm() {
            if let Err(e) = self.configure_transport(dai, substream, params) {
                match self.config.tdm_errors {
                    TdmErrorPolicy::LogOnly => {
                        log::error!("hw_params: {} TDM setup failed: {}", substream.endpoint, e);
                    }
                    TdmErrorPolicy::Propagate => return Err(e),
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RecordingTransport, TransportCall, TransportOp};
    use crate::types::{Direction, EndpointId, SampleFormat};

    const STREAM: u32 = 7;

    fn coordinator() -> StreamCoordinator<RecordingTransport> {
        StreamCoordinator::new(RecordingTransport::new())
    }

    fn rx0() -> Substream {
        Substream::playback(EndpointId::RxCodecDmaRx0)
    }

    #[test]
    fn test_prepare_enables_stream() {
        let c = coordinator();
        let mut flag = PreparedFlag::default();

        c.prepare(&rx0(), Some(&STREAM), &mut flag).unwrap();

        assert!(flag.is_prepared());
        assert_eq!(
            c.transport().calls(),
            vec![TransportCall::Prepare(STREAM), TransportCall::Enable(STREAM)]
        );
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let c = coordinator();
        let mut flag = PreparedFlag::default();

        c.prepare(&rx0(), Some(&STREAM), &mut flag).unwrap();
        c.transport().clear_calls();
        c.prepare(&rx0(), Some(&STREAM), &mut flag).unwrap();

        assert!(flag.is_prepared());
        assert!(c.transport().calls().is_empty());
    }

    #[test]
    fn test_prepare_failure_leaves_nothing_to_undo() {
        let c = coordinator();
        c.transport().fail_next(TransportOp::Prepare, -16);
        let mut flag = PreparedFlag::default();

        let err = c.prepare(&rx0(), Some(&STREAM), &mut flag).unwrap_err();

        assert!(matches!(err, StreamError::TransportPrepareFailed(ref e) if e.code == -16));
        assert!(!flag.is_prepared());
        assert_eq!(c.transport().calls(), vec![TransportCall::Prepare(STREAM)]);
    }

    #[test]
    fn test_enable_failure_rolls_back() {
        let c = coordinator();
        c.transport().fail_next(TransportOp::Enable, -110);
        let mut flag = PreparedFlag::default();

        let err = c.prepare(&rx0(), Some(&STREAM), &mut flag).unwrap_err();

        assert!(matches!(err, StreamError::TransportEnableFailed(ref e) if e.code == -110));
        assert!(!flag.is_prepared());
        assert_eq!(c.transport().count(TransportOp::Deprepare), 1);
        assert!(!c.transport().is_prepared(STREAM));

        // Next attempt starts from scratch
        c.transport().clear_calls();
        c.prepare(&rx0(), Some(&STREAM), &mut flag).unwrap();
        assert!(flag.is_prepared());
        assert_eq!(
            c.transport().calls(),
            vec![TransportCall::Prepare(STREAM), TransportCall::Enable(STREAM)]
        );
    }

    #[test]
    fn test_rollback_error_is_not_surfaced() {
        let c = coordinator();
        c.transport().fail_next(TransportOp::Enable, -110);
        c.transport().fail_next(TransportOp::Deprepare, -5);
        let mut flag = PreparedFlag::default();

        let err = c.prepare(&rx0(), Some(&STREAM), &mut flag).unwrap_err();

        assert_eq!(err.errno(), -110);
        assert!(!flag.is_prepared());
    }

    #[test]
    fn test_irrelevant_endpoints_are_noops() {
        let c = coordinator();
        for id in EndpointId::ALL
            .iter()
            .copied()
            .filter(|id| role_of(*id) == StreamRole::Irrelevant)
        {
            let substream = Substream::playback(id);
            let mut flag = PreparedFlag::default();
            c.prepare(&substream, Some(&STREAM), &mut flag).unwrap();
            assert!(!flag.is_prepared());

            let mut prepared = PreparedFlag(true);
            c.release(&substream, Some(&STREAM), &mut prepared);
            assert!(prepared.is_prepared());
        }
        assert!(c.transport().calls().is_empty());
    }

    #[test]
    fn test_absent_handle_is_noop() {
        let c = coordinator();
        let mut flag = PreparedFlag::default();
        c.prepare(&rx0(), None, &mut flag).unwrap();
        assert!(!flag.is_prepared());

        let mut prepared = PreparedFlag(true);
        c.release(&rx0(), None, &mut prepared);
        assert!(prepared.is_prepared());

        assert!(c.transport().calls().is_empty());
    }

    #[test]
    fn test_release_unprepared_is_noop() {
        let c = coordinator();
        let mut flag = PreparedFlag::default();
        c.release(&rx0(), Some(&STREAM), &mut flag);
        assert!(c.transport().calls().is_empty());
    }

    #[test]
    fn test_release_disables_then_deprepares() {
        let c = coordinator();
        let mut flag = PreparedFlag::default();
        c.prepare(&rx0(), Some(&STREAM), &mut flag).unwrap();
        c.transport().clear_calls();

        c.release(&rx0(), Some(&STREAM), &mut flag);

        assert!(!flag.is_prepared());
        assert_eq!(
            c.transport().calls(),
            vec![TransportCall::Disable(STREAM), TransportCall::Deprepare(STREAM)]
        );
        assert!(!c.transport().is_prepared(STREAM));
    }

    #[test]
    fn test_release_clears_flag_when_disable_fails() {
        let c = coordinator();
        let mut flag = PreparedFlag::default();
        c.prepare(&rx0(), Some(&STREAM), &mut flag).unwrap();
        c.transport().fail_next(TransportOp::Disable, -5);

        c.release(&rx0(), Some(&STREAM), &mut flag);

        assert!(!flag.is_prepared());
        assert_eq!(c.transport().count(TransportOp::Deprepare), 1);
    }

    #[test]
    fn test_release_clears_flag_when_deprepare_fails() {
        let c = coordinator();
        let mut flag = PreparedFlag::default();
        c.prepare(&rx0(), Some(&STREAM), &mut flag).unwrap();
        c.transport().clear_calls();
        c.transport().fail_next(TransportOp::Deprepare, -5);

        c.release(&rx0(), Some(&STREAM), &mut flag);

        assert!(!flag.is_prepared());
        assert_eq!(
            c.transport().calls(),
            vec![TransportCall::Disable(STREAM), TransportCall::Deprepare(STREAM)]
        );

        // Released flag makes a second release a no-op
        c.transport().clear_calls();
        c.release(&rx0(), Some(&STREAM), &mut flag);
        assert!(c.transport().calls().is_empty());
    }

    #[test]
    fn test_configure_transport_rejects_oversized_channel_count() {
        let c = coordinator();
        let substream = Substream::capture(EndpointId::TertiaryTdmTx0);

        let err = c
            .configure_transport(c.transport(), &substream, &HwParams::new(SampleFormat::S16Le, 10))
            .unwrap_err();

        assert!(matches!(err, StreamError::SlotConfigurationRejected(_)));
        assert!(c.transport().calls().is_empty());
    }

    #[test]
    fn test_select_stream_last_wins() {
        let streams = vec![
            CodecStream::Supported(1),
            CodecStream::Unsupported,
            CodecStream::Supported(3),
            CodecStream::Unsupported,
        ];
        assert_eq!(select_stream(streams), Some(3));
        assert_eq!(select_stream(Vec::<CodecStream<u32>>::new()), None);
        assert_eq!(select_stream(vec![CodecStream::<u32>::Unsupported]), None);
    }

    #[test]
    fn test_hw_params_selects_codec_stream() {
        let c = coordinator();
        let registry = vec![CodecStream::Unsupported, CodecStream::Supported(STREAM)];
        let mut slot = None;

        c.hw_params(
            &rx0(),
            &HwParams::new(SampleFormat::S16Le, 2),
            &registry,
            c.transport(),
            &mut slot,
        )
        .unwrap();

        assert_eq!(slot, Some(STREAM));
        assert!(c.transport().calls().is_empty());
    }

    #[test]
    fn test_hw_params_keeps_slot_without_codec_stream() {
        let c = coordinator();
        let registry: Vec<CodecStream<u32>> = vec![CodecStream::Unsupported];
        let mut slot = Some(3);

        c.hw_params(
            &rx0(),
            &HwParams::new(SampleFormat::S16Le, 2),
            &registry,
            c.transport(),
            &mut slot,
        )
        .unwrap();

        assert_eq!(slot, Some(3));
    }

    #[test]
    fn test_hw_params_wsa_rx1_keeps_slot_empty() {
        let c = coordinator();
        let registry = vec![CodecStream::Supported(STREAM)];
        let mut slot = None;

        c.hw_params(
            &Substream::playback(EndpointId::WsaCodecDmaRx1),
            &HwParams::new(SampleFormat::S16Le, 2),
            &registry,
            c.transport(),
            &mut slot,
        )
        .unwrap();

        assert_eq!(slot, None);
    }

    #[test]
    fn test_configure_transport_playback() {
        let c = coordinator();
        let substream = Substream::playback(EndpointId::TertiaryTdmRx0);

        let assignment = c
            .configure_transport(c.transport(), &substream, &HwParams::new(SampleFormat::S16Le, 2))
            .unwrap()
            .unwrap();

        assert_eq!(assignment.direction, Direction::Playback);
        assert_eq!(
            c.transport().calls(),
            vec![
                TransportCall::SetTdmSlot {
                    device_mask: 0b11,
                    channel_mask: 0,
                    slots: 8,
                    slot_width: 32,
                },
                TransportCall::SetChannelMap {
                    device_channels: 0,
                    device_offsets: vec![],
                    channel_channels: 2,
                    channel_offsets: vec![0, 4, 8, 12, 16, 20, 24, 28],
                },
            ]
        );
    }

    #[test]
    fn test_configure_transport_capture() {
        let c = coordinator();
        let substream = Substream::capture(EndpointId::TertiaryTdmTx0);

        c.configure_transport(c.transport(), &substream, &HwParams::new(SampleFormat::S16Le, 8))
            .unwrap();

        assert_eq!(
            c.transport().calls(),
            vec![
                TransportCall::SetTdmSlot {
                    device_mask: 0xf,
                    channel_mask: 0b11,
                    slots: 8,
                    slot_width: 32,
                },
                TransportCall::SetChannelMap {
                    device_channels: 8,
                    device_offsets: vec![0, 4, 8, 12, 16, 20, 24, 28],
                    channel_channels: 0,
                    channel_offsets: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_configure_transport_rejects_format_without_dai_calls() {
        let c = coordinator();
        let substream = Substream::playback(EndpointId::TertiaryTdmRx0);

        let err = c
            .configure_transport(c.transport(), &substream, &HwParams::new(SampleFormat::S24Le, 2))
            .unwrap_err();

        assert_eq!(err, StreamError::UnsupportedSampleFormat(SampleFormat::S24Le));
        assert!(c.transport().calls().is_empty());
    }

    #[test]
    fn test_configure_transport_slot_rejection() {
        let c = coordinator();
        c.transport().fail_next(TransportOp::SetChannelMap, -22);
        let substream = Substream::playback(EndpointId::TertiaryTdmRx0);

        let err = c
            .configure_transport(c.transport(), &substream, &HwParams::new(SampleFormat::S16Le, 2))
            .unwrap_err();

        assert!(matches!(err, StreamError::SlotConfigurationRejected(ref e) if e.code == -22));
    }

    #[test]
    fn test_configure_transport_non_tdm_is_noop() {
        let c = coordinator();
        let result = c
            .configure_transport(c.transport(), &rx0(), &HwParams::new(SampleFormat::S32Le, 2))
            .unwrap();
        assert_eq!(result, None);
        assert!(c.transport().calls().is_empty());
    }

    #[test]
    fn test_hw_params_tdm_error_policy() {
        let substream = Substream::playback(EndpointId::TertiaryTdmRx0);
        let params = HwParams::new(SampleFormat::FloatLe, 2);
        let registry: Vec<CodecStream<u32>> = Vec::new();
        let mut slot = None;

        let lenient = coordinator();
        lenient
            .hw_params(&substream, &params, &registry, lenient.transport(), &mut slot)
            .unwrap();

        let strict = StreamCoordinator::with_config(
            RecordingTransport::new(),
            CoordinatorConfig::propagating(),
        );
        let err = strict
            .hw_params(&substream, &params, &registry, strict.transport(), &mut slot)
            .unwrap_err();
        assert_eq!(err, StreamError::UnsupportedSampleFormat(SampleFormat::FloatLe));
        assert_eq!(slot, None);
    }
}
