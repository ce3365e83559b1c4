//! Progress reporting and cooperative cancellation.

use std::ops::ControlFlow;

/// Receives progress from a running compile. Returning
/// [`ControlFlow::Break`] cancels it at the next safe point.
pub trait ProgressSink {
    fn report(&mut self, current: usize, total: usize, label: &str) -> ControlFlow<()>;
}

impl<F: FnMut(usize, usize, &str) -> ControlFlow<()>> ProgressSink for F {
    fn report(&mut self, current: usize, total: usize, label: &str) -> ControlFlow<()> {
        self(current, total, label)
    }
}

/// Ignores progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _current: usize, _total: usize, _label: &str) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Logs progress at debug level and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&mut self, current: usize, total: usize, label: &str) -> ControlFlow<()> {
        tracing::debug!(current, total, "{label}");
        ControlFlow::Continue(())
    }
}
