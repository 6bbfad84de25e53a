use clap::Parser;
use std::path::PathBuf;

use crate::audio::channels::Channel;
use crate::audio::direction::{BandDivisor, EstimationMode};

#[derive(Parser, Debug)]
#[command(name = "quadear", about = "Sound direction estimation from a four-microphone array")]
pub struct Cli {
    /// Four-channel recording in [right, left, back, front] order (WAV, FLAC, OGG, ...)
    pub input: Option<PathBuf>,

    /// Config file (defaults to quadear.toml, then the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Transform size N (power of two)
    #[arg(long, default_value_t = 1024)]
    pub fft_size: usize,

    /// First magnitude bin of the analysis band
    #[arg(long, default_value_t = 10)]
    pub min_freq: usize,

    /// Last magnitude bin of the analysis band (inclusive)
    #[arg(long, default_value_t = 30)]
    pub max_freq: usize,

    /// Normalisation of the band sum
    #[arg(long, value_enum, default_value_t = BandDivisor::Legacy)]
    pub divisor: BandDivisor,

    /// Per-channel intensity measure
    #[arg(long, value_enum, default_value_t = EstimationMode::Average)]
    pub mode: EstimationMode,

    /// Minimum band peak counted in peak mode
    #[arg(long, default_value_t = 10_000.0)]
    pub peak_threshold: f32,

    /// Include the back microphone and report front-back difference
    #[arg(long)]
    pub back_channel: bool,

    /// Transform channels one after another instead of in parallel
    #[arg(long)]
    pub sequential: bool,

    /// Samples per microphone handed to each ingest call
    #[arg(long, default_value_t = 160)]
    pub block_size: usize,

    /// Emit one JSON object per frame on stdout instead of log lines
    #[arg(long)]
    pub json: bool,

    /// Print a registry buffer after the last frame (e.g. front_output)
    #[arg(long)]
    pub dump: Vec<String>,

    /// Feed a synthetic tone at this magnitude bin instead of reading INPUT
    #[arg(long)]
    pub tone: Option<usize>,

    /// Microphone carrying the synthetic tone
    #[arg(long, default_value = "front")]
    pub tone_channel: Channel,

    /// Peak amplitude of the synthetic tone
    #[arg(long, default_value_t = 8000.0)]
    pub tone_amplitude: f32,

    /// Frames of synthetic tone to feed
    #[arg(long, default_value_t = 10)]
    pub frames: usize,
}
