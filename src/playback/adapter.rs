use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::AdapterError;

/// How a lifecycle hook finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// The adapter does not implement this hook.
    Skipped,
    /// Finished best-effort; the target may not be in the commanded state.
    Degraded { reason: String },
}

impl StepOutcome {
    #[must_use]
    pub fn degraded(reason: impl Into<String>) -> Self {
        StepOutcome::Degraded {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed)
    }

    /// Keeps the first degradation when combining sub-steps.
    #[must_use]
    pub fn and(self, next: StepOutcome) -> StepOutcome {
        match (self, next) {
            (degraded @ StepOutcome::Degraded { .. }, _) => degraded,
            (_, next) => next,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Completed => f.write_str("completed"),
            StepOutcome::Skipped => f.write_str("skipped"),
            StepOutcome::Degraded { reason } => write!(f, "degraded ({})", reason),
        }
    }
}

pub type StepResult = Result<StepOutcome, AdapterError>;

/// Handle to one playback run. Aborting the run cancels the token, which
/// stops convergence polls and event waits still in flight.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSession {
    cancel: CancellationToken,
}

impl PlaybackSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// A render target the playback controller drives.
///
/// `seek`, `pause` and `resume` are required; the remaining hooks default to
/// [`StepOutcome::Skipped`]. `pause` and `resume` must be idempotent.
#[async_trait]
pub trait PlaybackAdapter: Send + Sync {
    /// Label used in logs and fan-out reports.
    fn name(&self) -> &str;

    /// Readiness probe. Adapters reporting `false` are left out of a run.
    async fn check_configuration(&self) -> bool {
        true
    }

    /// Loads `path` and parks it at `first_start_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error when the target rejected a command outright.
    async fn prepare(
        &self,
        _session: &PlaybackSession,
        _path: &str,
        _first_start_ms: u64,
    ) -> StepResult {
        Ok(StepOutcome::Skipped)
    }

    /// Transition and visibility choreography before playback is visible.
    ///
    /// # Errors
    ///
    /// Returns an error when the target rejected a command outright.
    async fn start(&self, _session: &PlaybackSession) -> StepResult {
        Ok(StepOutcome::Skipped)
    }

    /// # Errors
    ///
    /// Returns an error when the target rejected the seek.
    async fn seek(&self, session: &PlaybackSession, ms: u64) -> StepResult;

    /// # Errors
    ///
    /// Returns an error when the target rejected the pause.
    async fn pause(&self, session: &PlaybackSession) -> StepResult;

    /// # Errors
    ///
    /// Returns an error when the target rejected the play command.
    async fn resume(&self, session: &PlaybackSession) -> StepResult;

    /// Teardown and visibility restoration after the last segment.
    ///
    /// # Errors
    ///
    /// Returns an error when the target rejected a command outright.
    async fn end(&self, _session: &PlaybackSession) -> StepResult {
        Ok(StepOutcome::Skipped)
    }
}
