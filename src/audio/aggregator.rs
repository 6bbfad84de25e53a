//! Owned aggregation context: demultiplexes interleaved microphone blocks into
//! per-channel frames, runs the spectral pipeline and the direction estimator on
//! every completed frame, and exposes the buffers and metrics to readers.

use std::sync::Arc;

use super::channels::{BufferId, ChannelBuffers, CHANNEL_COUNT};
use super::direction::{AnalysisBand, DirectionEstimator};
use super::features::{ChannelIntensities, DirectionMetrics, FrameReport};
use super::signal::CompletionSignal;
use super::spectrum::SpectralPipeline;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

/// What a single [`DirectionContext::ingest`] call did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IngestOutcome {
    /// Sample groups written into the frame.
    pub groups_consumed: usize,
    /// Samples dropped because the frame filled up mid-block.
    pub samples_discarded: usize,
    /// Report of the frame completed by this call, if any.
    pub completed: Option<FrameReport>,
}

/// All state of one microphone array: buffers, fill counter and latest metrics.
///
/// Single writer. Slices returned by [`buffer`](Self::buffer) are overwritten in
/// place when the next frame completes.
pub struct DirectionContext {
    buffers: ChannelBuffers,
    pipeline: SpectralPipeline,
    estimator: DirectionEstimator,
    /// Interleaved re/im slots filled in the current frame, `0..=2N`.
    frame_counter: usize,
    frames_completed: u64,
    intensities: ChannelIntensities,
    metrics: DirectionMetrics,
    signal: Arc<CompletionSignal>,
}

impl DirectionContext {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let pipeline = SpectralPipeline::new(config.fft_size, config.parallel_channels)?;
        let band = AnalysisBand::new(config.min_freq, config.max_freq, config.fft_size)?;
        let estimator = DirectionEstimator::new(band)
            .with_divisor(config.band_divisor)
            .with_mode(config.mode)
            .with_peak_threshold(config.peak_threshold)
            .with_back_channel(config.use_back_channel);

        log::debug!(
            "Direction context: fft_size={}, band=[{}, {}], divisor={:?}, mode={:?}, back={}",
            config.fft_size,
            band.min(),
            band.max(),
            config.band_divisor,
            config.mode,
            config.use_back_channel
        );

        Ok(Self {
            buffers: ChannelBuffers::new(config.fft_size),
            pipeline,
            estimator,
            frame_counter: 0,
            frames_completed: 0,
            intensities: ChannelIntensities::default(),
            metrics: DirectionMetrics::default(),
            signal: Arc::new(CompletionSignal::new()),
        })
    }

    pub fn fft_size(&self) -> usize {
        self.buffers.fft_size()
    }

    /// Consumes one block of interleaved `[right, left, back, front]` samples.
    ///
    /// Groups are written until the frame is full; whatever remains of the block
    /// after that is discarded, not carried over. A full frame is transformed,
    /// estimated and signaled before this returns, and the counter restarts at 0.
    ///
    /// A block whose length is not a multiple of four is rejected without
    /// touching any state.
    pub fn ingest(&mut self, samples: &[i16]) -> Result<IngestOutcome> {
        if samples.len() % CHANNEL_COUNT != 0 {
            return Err(Error::InvalidFrameSize {
                count: samples.len(),
                group: CHANNEL_COUNT,
            });
        }

        let frame_len = self.buffers.complex_len();
        let mut groups_consumed = 0;
        for group in samples.chunks_exact(CHANNEL_COUNT) {
            self.buffers.write_group(self.frame_counter, group);
            self.frame_counter += 2;
            groups_consumed += 1;
            if self.frame_counter >= frame_len {
                break;
            }
        }

        let samples_discarded = samples.len() - groups_consumed * CHANNEL_COUNT;
        if samples_discarded > 0 {
            log::debug!(
                "Frame full, discarding {} trailing samples of a {}-sample block",
                samples_discarded,
                samples.len()
            );
        }
        log::trace!(
            "Ingested {} groups, frame counter {}/{}",
            groups_consumed,
            self.frame_counter,
            frame_len
        );

        let completed = if self.frame_counter >= frame_len {
            Some(self.complete_frame())
        } else {
            None
        };

        Ok(IngestOutcome {
            groups_consumed,
            samples_discarded,
            completed,
        })
    }

    fn complete_frame(&mut self) -> FrameReport {
        self.pipeline.run(&mut self.buffers);
        self.intensities = self.estimator.estimate(&self.buffers);
        self.metrics = self.intensities.metrics();
        self.frame_counter = 0;

        let report = FrameReport {
            frame: self.frames_completed,
            metrics: self.metrics,
            intensities: self.intensities,
        };
        self.frames_completed += 1;

        log::debug!(
            "Frame {}: front-left={:.3}, front-right={:.3}",
            report.frame,
            report.metrics.diff_front_left,
            report.metrics.diff_front_right
        );
        self.signal.post(report);
        report
    }

    pub fn frame_counter(&self) -> usize {
        self.frame_counter
    }

    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    pub fn metrics(&self) -> DirectionMetrics {
        self.metrics
    }

    pub fn intensities(&self) -> ChannelIntensities {
        self.intensities
    }

    pub fn diff_front_left(&self) -> f32 {
        self.metrics.diff_front_left
    }

    pub fn diff_front_right(&self) -> f32 {
        self.metrics.diff_front_right
    }

    /// Read view of a registry buffer: `2N` floats for complex inputs, `N` for
    /// magnitudes.
    pub fn buffer(&self, id: BufferId) -> &[f32] {
        self.buffers.get(id)
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn buffer_mut(&mut self, id: BufferId) -> &mut [f32] {
        self.buffers.get_mut(id)
    }

    /// Registry lookup by name (`front_output`, `left_cmplx_input`, ...) or by
    /// numeric code, returning the resolved identifier with its view.
    pub fn buffer_by_name(&self, name: &str) -> Result<(BufferId, &[f32])> {
        let id: BufferId = name.parse()?;
        Ok((id, self.buffer(id)))
    }

    /// Shared handle for consumers waiting on frame completion from other threads.
    pub fn completion_signal(&self) -> Arc<CompletionSignal> {
        Arc::clone(&self.signal)
    }

    /// Blocks until the next frame completes and returns its report.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn wait_frame_complete(&self) -> Option<FrameReport> {
        self.signal.wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::channels::Channel;
    use crate::audio::direction::{BandDivisor, EstimationMode};
    use crate::audio::tone::interleaved_tone;
    use proptest::prelude::*;
    use std::time::Duration;

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            fft_size: 64,
            min_freq: 2,
            max_freq: 12,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn new_rejects_bad_configuration() {
        let cfg = AnalysisConfig {
            fft_size: 100,
            ..AnalysisConfig::default()
        };
        assert!(matches!(DirectionContext::new(&cfg), Err(Error::InvalidFftSize(100))));

        let cfg = AnalysisConfig {
            fft_size: 32,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            DirectionContext::new(&cfg),
            Err(Error::InvalidBand { min: 10, max: 30, fft_size: 32 })
        ));
    }

    #[test]
    fn partial_block_advances_counter() {
        let mut ctx = DirectionContext::new(&small_config()).unwrap();
        let out = ctx.ingest(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(out.groups_consumed, 2);
        assert_eq!(out.samples_discarded, 0);
        assert!(out.completed.is_none());
        assert_eq!(ctx.frame_counter(), 4);
        assert_eq!(ctx.buffer(BufferId::ComplexInput(Channel::Right))[..4], [1.0, 0.0, 5.0, 0.0]);
        assert_eq!(ctx.buffer(BufferId::ComplexInput(Channel::Front))[..4], [4.0, 0.0, 8.0, 0.0]);
    }

    #[test]
    fn misaligned_block_is_rejected_without_side_effects() {
        let mut ctx = DirectionContext::new(&small_config()).unwrap();
        ctx.ingest(&[9; 8]).unwrap();
        let before = ctx.buffer(BufferId::ComplexInput(Channel::Left)).to_vec();

        let err = ctx.ingest(&[1, 2, 3, 4, 5, 6]).unwrap_err();
        assert_eq!(err, Error::InvalidFrameSize { count: 6, group: 4 });
        assert_eq!(ctx.frame_counter(), 4);
        assert_eq!(ctx.buffer(BufferId::ComplexInput(Channel::Left)), &before[..]);
        assert_eq!(ctx.frames_completed(), 0);
    }

    #[test]
    fn empty_block_is_a_no_op() {
        let mut ctx = DirectionContext::new(&small_config()).unwrap();
        let out = ctx.ingest(&[]).unwrap();
        assert_eq!(out.groups_consumed, 0);
        assert_eq!(ctx.frame_counter(), 0);
    }

    #[test]
    fn counter_resets_after_frame_across_many_calls() {
        let mut ctx = DirectionContext::new(&small_config()).unwrap();
        let block = vec![100i16; 10 * CHANNEL_COUNT];
        let mut completed = 0;
        // 64 groups per frame: six blocks of ten leave the frame four groups short.
        for _ in 0..6 {
            completed += ctx.ingest(&block).unwrap().completed.iter().count();
        }
        assert_eq!(completed, 0);
        assert_eq!(ctx.frame_counter(), 120);

        let out = ctx.ingest(&block).unwrap();
        assert_eq!(out.groups_consumed, 4);
        assert_eq!(out.samples_discarded, 6 * CHANNEL_COUNT);
        assert_eq!(out.completed.map(|r| r.frame), Some(0));
        assert_eq!(ctx.frame_counter(), 0);
        assert_eq!(ctx.frames_completed(), 1);
    }

    #[test]
    fn oversized_block_completes_one_frame_and_discards_rest() {
        let mut ctx = DirectionContext::new(&small_config()).unwrap();
        let block = vec![1i16; 100 * CHANNEL_COUNT];
        let out = ctx.ingest(&block).unwrap();
        assert_eq!(out.groups_consumed, 64);
        assert_eq!(out.samples_discarded, 36 * CHANNEL_COUNT);
        assert!(out.completed.is_some());
        assert_eq!(ctx.frame_counter(), 0);
        assert_eq!(ctx.frames_completed(), 1);
    }

    #[test]
    fn front_tone_points_forward() {
        let cfg = AnalysisConfig::default();
        let mut ctx = DirectionContext::new(&cfg).unwrap();
        let amplitude = 1000.0;
        let samples = interleaved_tone(Channel::Front, 20, amplitude, 1024, 1024);
        let mut last = None;
        for block in samples.chunks(160 * CHANNEL_COUNT) {
            if let Some(report) = ctx.ingest(block).unwrap().completed {
                last = Some(report);
            }
        }
        let report = last.expect("one frame should complete");
        assert_eq!(ctx.frame_counter(), 0);

        // All energy sits in bin 20: amplitude * N / 2, spread over the legacy divisor of 20.
        let expected = amplitude * 1024.0 / 2.0 / 20.0;
        assert!((report.intensities.front - expected).abs() < expected * 0.01);
        assert!(ctx.diff_front_left() > 0.0);
        assert!(ctx.diff_front_right() > 0.0);
        assert!((ctx.diff_front_left() - expected).abs() < expected * 0.01);
        assert_eq!(ctx.diff_front_left(), ctx.diff_front_right());
        assert_eq!(report.metrics, ctx.metrics());
    }

    #[test]
    fn side_tone_points_away_from_front() {
        let mut ctx = DirectionContext::new(&small_config()).unwrap();
        let samples = interleaved_tone(Channel::Left, 5, 2000.0, 64, 64);
        ctx.ingest(&samples).unwrap();
        assert!(ctx.diff_front_left() < 0.0);
        assert_eq!(ctx.diff_front_right(), 0.0);
    }

    #[test]
    fn back_channel_joins_estimate_when_enabled() {
        let cfg = AnalysisConfig {
            use_back_channel: true,
            band_divisor: BandDivisor::Corrected,
            ..small_config()
        };
        let mut ctx = DirectionContext::new(&cfg).unwrap();
        let samples = interleaved_tone(Channel::Back, 6, 2000.0, 64, 64);
        ctx.ingest(&samples).unwrap();
        let m = ctx.metrics();
        assert!(m.diff_front_back.unwrap() < 0.0);
        assert_eq!(m.diff_front_left, 0.0);
    }

    #[test]
    fn peak_mode_ignores_quiet_frames() {
        let cfg = AnalysisConfig {
            mode: EstimationMode::Peak,
            ..small_config()
        };
        let mut ctx = DirectionContext::new(&cfg).unwrap();
        // Peak of 100 * 64 / 2 = 3200 stays under the 10000 threshold.
        ctx.ingest(&interleaved_tone(Channel::Front, 4, 100.0, 64, 64)).unwrap();
        assert_eq!(ctx.diff_front_left(), 0.0);
        // 1000 * 64 / 2 = 32000 clears it.
        ctx.ingest(&interleaved_tone(Channel::Front, 4, 1000.0, 64, 64)).unwrap();
        assert!((ctx.diff_front_left() - 32_000.0).abs() < 32_000.0 * 0.01);
    }

    #[test]
    fn metrics_only_reflect_latest_frame() {
        let mut ctx = DirectionContext::new(&small_config()).unwrap();
        ctx.ingest(&interleaved_tone(Channel::Front, 5, 2000.0, 64, 64)).unwrap();
        assert!(ctx.diff_front_left() > 0.0);
        ctx.ingest(&vec![0i16; 64 * CHANNEL_COUNT]).unwrap();
        assert_eq!(ctx.metrics(), DirectionMetrics::default());
        assert_eq!(ctx.frames_completed(), 2);
    }

    #[test]
    fn completion_is_signaled_once_per_frame() {
        let mut ctx = DirectionContext::new(&small_config()).unwrap();
        let signal = ctx.completion_signal();
        assert!(!signal.is_signaled());

        ctx.ingest(&vec![0i16; 32 * CHANNEL_COUNT]).unwrap();
        assert!(!signal.is_signaled());

        ctx.ingest(&interleaved_tone(Channel::Right, 3, 500.0, 64, 32)).unwrap();
        let report = ctx.wait_frame_complete().unwrap();
        assert_eq!(report.frame, 0);
        assert_eq!(report.metrics, ctx.metrics());
        assert!(signal.wait_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn registry_lookup_by_name() {
        let ctx = DirectionContext::new(&small_config()).unwrap();
        let (id, view) = ctx.buffer_by_name("front_output").unwrap();
        assert_eq!(id, BufferId::Magnitude(Channel::Front));
        assert_eq!(view.len(), 64);
        assert_eq!(ctx.buffer_by_name("back_cmplx_input").unwrap().1.len(), 128);
        let (id, view) = ctx.buffer_by_name("5").unwrap();
        assert_eq!(id, BufferId::Magnitude(Channel::Right));
        assert_eq!(view.len(), 64);
        assert_eq!(
            ctx.buffer_by_name("ceiling_output"),
            Err(Error::UnknownBuffer("ceiling_output".into()))
        );
    }

    #[test]
    fn buffer_mut_writes_are_visible() {
        let mut ctx = DirectionContext::new(&small_config()).unwrap();
        ctx.buffer_mut(BufferId::Magnitude(Channel::Left))[3] = 7.5;
        assert_eq!(ctx.buffer(BufferId::Magnitude(Channel::Left))[3], 7.5);
    }

    proptest! {
        #[test]
        fn magnitudes_are_non_negative_after_a_frame(
            samples in prop::collection::vec(any::<i16>(), 64 * CHANNEL_COUNT),
        ) {
            let mut ctx = DirectionContext::new(&small_config()).unwrap();
            let out = ctx.ingest(&samples).unwrap();
            prop_assert!(out.completed.is_some());
            for ch in Channel::ALL {
                let mag = ctx.buffer(BufferId::Magnitude(ch));
                prop_assert_eq!(mag.len(), 64);
                prop_assert!(mag.iter().all(|&m| m >= 0.0));
            }
        }

        #[test]
        fn identical_streams_give_identical_metrics(
            samples in prop::collection::vec(any::<i16>(), 64 * CHANNEL_COUNT),
            split in 0usize..64,
        ) {
            let mut whole = DirectionContext::new(&small_config()).unwrap();
            let mut pieces = DirectionContext::new(&small_config()).unwrap();
            whole.ingest(&samples).unwrap();
            let (a, b) = samples.split_at(split * CHANNEL_COUNT);
            pieces.ingest(a).unwrap();
            pieces.ingest(b).unwrap();
            prop_assert_eq!(whole.metrics(), pieces.metrics());
            prop_assert_eq!(pieces.frame_counter(), 0);
        }
    }
}
