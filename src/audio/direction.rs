use serde::Deserialize;

use super::channels::{Channel, ChannelBuffers};
use super::features::ChannelIntensities;
use crate::error::{Error, Result};

/// First magnitude bin analysed; lower bins are skipped.
pub const DEFAULT_MIN_FREQ: usize = 10;
/// Last magnitude bin analysed (inclusive); higher bins are skipped.
pub const DEFAULT_MAX_FREQ: usize = 30;
/// Minimum magnitude for a band peak to count in peak mode.
pub const DEFAULT_PEAK_THRESHOLD: f32 = 10_000.0;

/// How the band sum is normalised in average mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BandDivisor {
    /// Sum over `[min, max]` inclusive, divided by `max - min`.
    #[default]
    Legacy,
    /// Sum over `[min, max]` inclusive, divided by `max - min + 1`.
    Corrected,
}

/// Per-channel intensity measure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMode {
    /// Band-limited average magnitude.
    #[default]
    Average,
    /// Highest magnitude in the band, zero when below the peak threshold.
    Peak,
}

/// Magnitude bins `min..=max` used for intensity estimation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisBand {
    min: usize,
    max: usize,
}

impl AnalysisBand {
    /// Validates `0 <= min < max <= fft_size / 2`, keeping the band inside the
    /// positive-frequency half of the spectrum.
    pub fn new(min: usize, max: usize, fft_size: usize) -> Result<Self> {
        if min >= max || max > fft_size / 2 {
            return Err(Error::InvalidBand { min, max, fft_size });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    fn bins<'a>(&self, buffer: &'a [f32]) -> &'a [f32] {
        &buffer[self.min..=self.max]
    }
}

/// Turns refreshed magnitude spectra into per-channel intensities.
#[derive(Clone, Debug)]
pub struct DirectionEstimator {
    band: AnalysisBand,
    divisor: BandDivisor,
    mode: EstimationMode,
    peak_threshold: f32,
    use_back_channel: bool,
}

impl DirectionEstimator {
    pub fn new(band: AnalysisBand) -> Self {
        Self {
            band,
            divisor: BandDivisor::default(),
            mode: EstimationMode::default(),
            peak_threshold: DEFAULT_PEAK_THRESHOLD,
            use_back_channel: false,
        }
    }

    pub fn with_divisor(mut self, divisor: BandDivisor) -> Self {
        self.divisor = divisor;
        self
    }

    pub fn with_mode(mut self, mode: EstimationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_peak_threshold(mut self, threshold: f32) -> Self {
        self.peak_threshold = threshold;
        self
    }

    pub fn with_back_channel(mut self, enabled: bool) -> Self {
        self.use_back_channel = enabled;
        self
    }

    /// Sum of `buffer[min..=max]` divided by the configured divisor.
    ///
    /// With [`BandDivisor::Legacy`] the divisor is `max - min`, one less than the
    /// number of summed bins, so a flat band reads slightly high.
    pub fn average_intensity(&self, buffer: &[f32]) -> f32 {
        let sum: f32 = self.band.bins(buffer).iter().sum();
        let width = self.band.max - self.band.min;
        let divisor = match self.divisor {
            BandDivisor::Legacy => width,
            BandDivisor::Corrected => width + 1,
        };
        sum / divisor as f32
    }

    pub fn peak_intensity(&self, buffer: &[f32]) -> f32 {
        let peak = self
            .band
            .bins(buffer)
            .iter()
            .copied()
            .fold(0.0f32, f32::max);
        if peak >= self.peak_threshold {
            peak
        } else {
            0.0
        }
    }

    pub fn intensity(&self, buffer: &[f32]) -> f32 {
        match self.mode {
            EstimationMode::Average => self.average_intensity(buffer),
            EstimationMode::Peak => self.peak_intensity(buffer),
        }
    }

    /// Reads the magnitude buffers; the back channel is only touched when enabled.
    pub fn estimate(&self, buffers: &ChannelBuffers) -> ChannelIntensities {
        let of = |ch: Channel| self.intensity(buffers.magnitude(ch));
        ChannelIntensities {
            front: of(Channel::Front),
            left: of(Channel::Left),
            right: of(Channel::Right),
            back: self.use_back_channel.then(|| of(Channel::Back)),
        }
    }
}
