mod audio;
mod cli;
mod config;
mod error;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use audio::aggregator::DirectionContext;
use audio::channels::CHANNEL_COUNT;
use audio::direction::{BandDivisor, EstimationMode, DEFAULT_PEAK_THRESHOLD};
use cli::Cli;
use config::{AnalysisConfig, InputConfig};
use report::ReportFormat;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let (analysis, input) = resolve_settings(&cli);

    if input.block_size == 0 {
        return Err(error::Error::InvalidBlockSize(input.block_size).into());
    }

    let mut ctx = DirectionContext::new(&analysis).context("Invalid analysis settings")?;

    // 1. Gather samples: synthetic tone or decoded recording
    let (samples, sample_rate) = if let Some(bin) = cli.tone {
        log::info!(
            "Synthetic tone: bin {} on {} mic, amplitude {}, {} frames",
            bin, cli.tone_channel, cli.tone_amplitude, cli.frames
        );
        let samples = audio::tone::interleaved_tone(
            cli.tone_channel,
            bin,
            cli.tone_amplitude,
            analysis.fft_size,
            tone_samples_per_channel(analysis.fft_size, input.block_size, cli.frames),
        );
        (samples, input.sample_rate)
    } else {
        let path = cli.input.as_ref().context("Input recording is required (or use --tone)")?;
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
        log::info!("Input: {}", path.display());
        let recording = audio::decode::decode_recording(path)?;
        (recording.samples, recording.sample_rate)
    };

    log::info!(
        "Frame: {} samples/mic ({:.1} ms at {}Hz), band [{}, {}], mode {:?}",
        analysis.fft_size,
        analysis.fft_size as f32 * 1000.0 / sample_rate as f32,
        sample_rate,
        analysis.min_freq,
        analysis.max_freq,
        analysis.mode
    );

    // 2. Telemetry consumer
    let format = if cli.json { ReportFormat::JsonLines } else { ReportFormat::Log };
    let reporter = report::spawn_reporter(ctx.completion_signal(), format)?;

    // 3. Feed blocks as the acquisition callback would
    let blocks = (samples.len() / CHANNEL_COUNT).div_ceil(input.block_size);
    let pb = ProgressBar::new(blocks as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} blocks ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );
    let discarded = feed_blocks(&mut ctx, &samples, input.block_size, &pb)?;
    pb.finish_and_clear();

    let signal = ctx.completion_signal();
    signal.close();
    let published = reporter
        .join()
        .map_err(|_| anyhow::anyhow!("Report thread panicked"))??;

    // 4. Summary and buffer dumps
    log::info!(
        "Done: {} frames completed, {} published, {} samples discarded at frame boundaries",
        ctx.frames_completed(),
        published,
        discarded
    );
    if ctx.frames_completed() == 0 {
        log::warn!(
            "Input shorter than one frame ({} samples/mic needed)",
            ctx.fft_size()
        );
    } else {
        let i = ctx.intensities();
        log::info!(
            "Latest: front-left={:.3}, front-right={:.3} (front {:.3}, left {:.3}, right {:.3})",
            ctx.diff_front_left(),
            ctx.diff_front_right(),
            i.front,
            i.left,
            i.right
        );
        if let Some(diff) = ctx.metrics().diff_front_back {
            log::info!("Latest: front-back={:.3}", diff);
        }
    }
    if ctx.frame_counter() > 0 {
        log::info!(
            "Partial frame left unprocessed: {}/{} samples/mic",
            ctx.frame_counter() / 2,
            ctx.fft_size()
        );
    }

    for name in &cli.dump {
        let (id, values) = ctx
            .buffer_by_name(name)
            .with_context(|| format!("Cannot dump buffer '{}'", name))?;
        if cli.json {
            let line = serde_json::json!({ "buffer": id.name(), "code": id.code(), "values": values });
            println!("{}", line);
        } else {
            let text: Vec<String> = values.iter().map(|v| format!("{:.3}", v)).collect();
            println!("{} [{}] ({} values): {}", id, id.code(), values.len(), text.join(" "));
        }
    }

    Ok(())
}

/// Samples per microphone that complete exactly `frames` frames when fed in
/// blocks of `block_size` groups. The block that fills a frame has its tail
/// discarded, so each frame costs a whole number of blocks.
fn tone_samples_per_channel(fft_size: usize, block_size: usize, frames: usize) -> usize {
    frames * fft_size.div_ceil(block_size) * block_size
}

/// Hands `samples` to the context in blocks of `block_size` groups and returns
/// the number of samples discarded at frame boundaries. A trailing incomplete
/// group is dropped.
fn feed_blocks(
    ctx: &mut DirectionContext,
    samples: &[i16],
    block_size: usize,
    pb: &ProgressBar,
) -> Result<usize> {
    let usable = samples.len() - samples.len() % CHANNEL_COUNT;
    if usable != samples.len() {
        log::warn!("Dropping {} trailing samples of an incomplete group", samples.len() - usable);
    }

    let mut discarded = 0usize;
    for block in samples[..usable].chunks(block_size * CHANNEL_COUNT) {
        let outcome = ctx.ingest(block)?;
        discarded += outcome.samples_discarded;
        pb.inc(1);
    }
    Ok(discarded)
}

/// Merges the config file under the command line: config values apply only
/// where the flag is still at its default.
fn resolve_settings(cli: &Cli) -> (AnalysisConfig, InputConfig) {
    let mut analysis = AnalysisConfig::default();
    let mut input = InputConfig::default();

    if let Some(path) = config::find_config(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            analysis = cfg.analysis;
            input = cfg.input;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if cli.fft_size != 1024 { analysis.fft_size = cli.fft_size; }
    if cli.min_freq != 10 { analysis.min_freq = cli.min_freq; }
    if cli.max_freq != 30 { analysis.max_freq = cli.max_freq; }
    if cli.divisor != BandDivisor::Legacy { analysis.band_divisor = cli.divisor; }
    if cli.mode != EstimationMode::Average { analysis.mode = cli.mode; }
    if cli.peak_threshold != DEFAULT_PEAK_THRESHOLD { analysis.peak_threshold = cli.peak_threshold; }
    if cli.back_channel { analysis.use_back_channel = true; }
    if cli.sequential { analysis.parallel_channels = false; }
    if cli.block_size != 160 { input.block_size = cli.block_size; }

    (analysis, input)
}
