//! Telemetry consumer: waits on the frame-completion signal and publishes each
//! frame's direction metrics.

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::features::FrameReport;
use crate::audio::signal::CompletionSignal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// One `info` log line per frame.
    Log,
    /// One JSON object per line.
    JsonLines,
}

pub fn write_report<W: Write>(out: &mut W, report: &FrameReport, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Log => {
            let m = &report.metrics;
            match m.diff_front_back {
                Some(back) => log::info!(
                    "frame {:>5}  front-left {:>12.3}  front-right {:>12.3}  front-back {:>12.3}",
                    report.frame, m.diff_front_left, m.diff_front_right, back
                ),
                None => log::info!(
                    "frame {:>5}  front-left {:>12.3}  front-right {:>12.3}",
                    report.frame, m.diff_front_left, m.diff_front_right
                ),
            }
        }
        ReportFormat::JsonLines => {
            serde_json::to_writer(&mut *out, report).context("Failed to serialize frame report")?;
            writeln!(out).context("Failed to write frame report")?;
        }
    }
    Ok(())
}

/// Spawns the consumer thread. It runs until the signal is closed and returns
/// the number of reports it published.
pub fn spawn_reporter(
    signal: Arc<CompletionSignal>,
    format: ReportFormat,
) -> Result<JoinHandle<Result<u64>>> {
    thread::Builder::new()
        .name("quadear-report".into())
        .spawn(move || -> Result<u64> {
            let stdout = std::io::stdout();
            let mut published = 0u64;
            while let Some(report) = signal.wait() {
                let mut out = stdout.lock();
                write_report(&mut out, &report, format)?;
                out.flush().context("Failed to flush stdout")?;
                published += 1;
            }
            Ok(published)
        })
        .context("Failed to spawn report thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::{ChannelIntensities, DirectionMetrics};

    fn report() -> FrameReport {
        FrameReport {
            frame: 12,
            metrics: DirectionMetrics {
                diff_front_left: 4.0,
                diff_front_right: -2.0,
                diff_front_back: None,
            },
            intensities: ChannelIntensities {
                front: 5.0,
                left: 1.0,
                right: 7.0,
                back: None,
            },
        }
    }

    #[test]
    fn json_lines_are_newline_terminated_objects() {
        let mut buf = Vec::new();
        write_report(&mut buf, &report(), ReportFormat::JsonLines).unwrap();
        write_report(&mut buf, &report(), ReportFormat::JsonLines).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["frame"], 12);
        assert_eq!(value["metrics"]["diff_front_right"], -2.0);
        assert_eq!(value["intensities"]["right"], 7.0);
    }

    #[test]
    fn log_format_writes_nothing_to_output() {
        let mut buf = Vec::new();
        write_report(&mut buf, &report(), ReportFormat::Log).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn reporter_stops_when_signal_closes() {
        let signal = Arc::new(CompletionSignal::new());
        let handle = spawn_reporter(Arc::clone(&signal), ReportFormat::Log).unwrap();
        signal.post(report());
        signal.close();
        let published = handle.join().unwrap().unwrap();
        assert_eq!(published, 1);
    }
}
