use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::direction::{
    BandDivisor, EstimationMode, DEFAULT_MAX_FREQ, DEFAULT_MIN_FREQ, DEFAULT_PEAK_THRESHOLD,
};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_min_freq")]
    pub min_freq: usize,
    #[serde(default = "default_max_freq")]
    pub max_freq: usize,
    #[serde(default)]
    pub band_divisor: BandDivisor,
    #[serde(default)]
    pub mode: EstimationMode,
    #[serde(default = "default_peak_threshold")]
    pub peak_threshold: f32,
    #[serde(default)]
    pub use_back_channel: bool,
    #[serde(default = "default_parallel_channels")]
    pub parallel_channels: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InputConfig {
    /// Samples per microphone delivered by each callback.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            min_freq: default_min_freq(),
            max_freq: default_max_freq(),
            band_divisor: BandDivisor::default(),
            mode: EstimationMode::default(),
            peak_threshold: default_peak_threshold(),
            use_back_channel: false,
            parallel_channels: default_parallel_channels(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            sample_rate: default_sample_rate(),
        }
    }
}

fn default_fft_size() -> usize { 1024 }
fn default_min_freq() -> usize { DEFAULT_MIN_FREQ }
fn default_max_freq() -> usize { DEFAULT_MAX_FREQ }
fn default_peak_threshold() -> f32 { DEFAULT_PEAK_THRESHOLD }
fn default_parallel_channels() -> bool { true }
fn default_block_size() -> usize { 160 }
fn default_sample_rate() -> u32 { 16_000 }

/// Explicit path first, then `quadear.toml` in the working directory, then the
/// per-user config locations.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("quadear.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("quadear").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("quadear").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}
