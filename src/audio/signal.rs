//! Frame-completion gate between the aggregation core and telemetry consumers.
//!
//! The aggregation context is single-writer and holds no locks, so anything read
//! through the registry while `ingest` is running on another thread may be torn.
//! Consumers that need a consistent view either take the snapshot handed out by
//! [`CompletionSignal::wait`], which is copied after the frame's metrics were
//! written, or accept torn reads.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::features::FrameReport;

#[derive(Default)]
struct GateState {
    pending: Option<FrameReport>,
    closed: bool,
}

/// Binary gate posted once per completed frame. Starts out not signaled.
#[derive(Default)]
pub struct CompletionSignal {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gate. A gate that is already set stays set and keeps only the
    /// newer report.
    pub fn post(&self, report: FrameReport) {
        let mut state = self.state.lock();
        if state.pending.replace(report).is_some() {
            log::trace!("frame {} posted before previous report was taken", report.frame);
        }
        self.cond.notify_one();
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_signaled(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// Blocks until the gate is set, then clears it and returns the report.
    /// Returns `None` once the gate is closed and nothing is pending.
    pub fn wait(&self) -> Option<FrameReport> {
        let mut state = self.state.lock();
        loop {
            if let Some(report) = state.pending.take() {
                return Some(report);
            }
            if state.closed {
                return None;
            }
            self.cond.wait(&mut state);
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<FrameReport> {
        let mut state = self.state.lock();
        if state.pending.is_none() && !state.closed {
            self.cond.wait_for(&mut state, timeout);
        }
        state.pending.take()
    }

    /// Wakes every waiter; later waits return the pending report, if any, then `None`.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.cond.notify_all();
    }
}
