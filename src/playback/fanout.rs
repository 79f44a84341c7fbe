use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::AdapterError;

use super::adapter::{PlaybackAdapter, PlaybackSession, StepOutcome, StepResult};

/// Lifecycle call issued to every adapter of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Prepare { path: String, first_start_ms: u64 },
    Start,
    Seek { ms: u64 },
    Pause,
    Resume,
    End,
}

impl Step {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Step::Prepare { .. } => "prepare",
            Step::Start => "start",
            Step::Seek { .. } => "seek",
            Step::Pause => "pause",
            Step::Resume => "resume",
            Step::End => "end",
        }
    }

    async fn run(&self, adapter: &dyn PlaybackAdapter, session: &PlaybackSession) -> StepResult {
        match self {
            Step::Prepare {
                path,
                first_start_ms,
            } => adapter.prepare(session, path, *first_start_ms).await,
            Step::Start => adapter.start(session).await,
            Step::Seek { ms } => adapter.seek(session, *ms).await,
            Step::Pause => adapter.pause(session).await,
            Step::Resume => adapter.resume(session).await,
            Step::End => adapter.end(session).await,
        }
    }
}

#[derive(Debug)]
pub struct AdapterReport {
    pub adapter: String,
    pub result: Result<StepOutcome, AdapterError>,
}

/// Per-adapter outcomes of one fan-out step, in adapter order.
#[derive(Debug)]
pub struct FanOutReport {
    pub step: &'static str,
    pub reports: Vec<AdapterReport>,
}

impl FanOutReport {
    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.reports
            .iter()
            .all(|report| matches!(report.result, Ok(StepOutcome::Completed)))
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.result.is_err())
            .count()
    }

    #[must_use]
    pub fn degraded(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| matches!(report.result, Ok(StepOutcome::Degraded { .. })))
            .count()
    }

    #[must_use]
    pub fn outcome_of(&self, adapter: &str) -> Option<&Result<StepOutcome, AdapterError>> {
        self.reports
            .iter()
            .find(|report| report.adapter == adapter)
            .map(|report| &report.result)
    }
}

/// Issues `step` to every adapter concurrently and waits for all of them.
/// A failing adapter never cancels its siblings.
pub async fn fan_out(
    step: &Step,
    adapters: &[Arc<dyn PlaybackAdapter>],
    session: &PlaybackSession,
) -> FanOutReport {
    let reports = join_all(adapters.iter().map(|adapter| async move {
        let result = step.run(adapter.as_ref(), session).await;
        match &result {
            Ok(StepOutcome::Completed | StepOutcome::Skipped) => {
                debug!("{} {}: {:?}", adapter.name(), step.name(), result);
            }
            Ok(outcome @ StepOutcome::Degraded { .. }) => {
                warn!("{} {}: {}", adapter.name(), step.name(), outcome);
            }
            Err(err) => warn!("{} {} failed: {}", adapter.name(), step.name(), err),
        }
        AdapterReport {
            adapter: adapter.name().to_owned(),
            result,
        }
    }))
    .await;
    FanOutReport {
        step: step.name(),
        reports,
    }
}
