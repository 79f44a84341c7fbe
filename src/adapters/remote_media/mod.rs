//! Playback adapter driving a media input hosted on the mixer.
//!
//! The mixer acknowledges commands long before the input reflects them, so
//! every step that matters is confirmed by polling the input's status or by
//! waiting for transition events. Budgets are finite; when one runs out the
//! step reports [`StepOutcome::Degraded`] and playback carries on.
mod convergence;
mod locks;
mod transition;


use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, warn};

use crate::domain::{AdapterOptions, RemoteTargetSource};
use crate::error::{AdapterError, RemoteError};
use crate::playback::{PlaybackAdapter, PlaybackSession, StepOutcome, StepResult};
use crate::remote::{MediaAction, RemoteControl, RemoteControlExt, RemoteRequest};
use crate::sync::Convergence;

pub use convergence::ConvergenceSettings;
pub use locks::SourceLocks;

/// Static configuration of one remote media target.
#[derive(Debug, Clone)]
pub struct RemoteMediaConfig {
    pub source: RemoteTargetSource,
    pub options: AdapterOptions,
    /// Scene the program output returns to after the replay.
    pub fallback_scene: String,
    pub convergence: ConvergenceSettings,
}

pub struct RemoteMediaAdapter {
    name: String,
    remote: Arc<dyn RemoteControl>,
    config: RemoteMediaConfig,
    locks: SourceLocks,
}

fn cancelled(step: &str) -> StepOutcome {
    StepOutcome::degraded(format!("{} cancelled", step))
}

impl RemoteMediaAdapter {
    /// `locks` must be shared by every adapter talking to the same mixer.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        remote: Arc<dyn RemoteControl>,
        config: RemoteMediaConfig,
        locks: SourceLocks,
    ) -> Self {
        Self {
            name: name.into(),
            remote,
            config,
            locks,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &RemoteTargetSource {
        &self.config.source
    }

    /// Serializes against other operations on the same input. Gives up when
    /// the session is cancelled while waiting.
    async fn lock(&self, session: &PlaybackSession) -> Option<OwnedMutexGuard<()>> {
        tokio::select! {
            biased;
            () = session.cancellation().cancelled() => None,
            guard = self.locks.acquire(&self.config.source.item_name) => Some(guard),
        }
    }

    fn remote_error(&self, operation: &'static str) -> impl Fn(RemoteError) -> AdapterError + '_ {
        move |source| AdapterError::Remote {
            target: self.name.clone(),
            operation,
            source,
        }
    }

    async fn command(&self, operation: &'static str, request: RemoteRequest) -> Result<(), AdapterError> {
        self.remote
            .command(request)
            .await
            .map_err(self.remote_error(operation))
    }

    fn visibility(&self, enabled: bool) -> RemoteRequest {
        RemoteRequest::SetSceneItemEnabled {
            scene_name: self.config.source.scene_name.clone(),
            scene_item_id: self.config.source.scene_item_id,
            enabled,
        }
    }

    fn media_action(&self, action: MediaAction) -> RemoteRequest {
        RemoteRequest::TriggerMediaAction {
            input_name: self.config.source.item_name.clone(),
            action,
        }
    }

    /// Pause convergence without taking the source lock.
    async fn settle_pause(&self, session: &PlaybackSession) -> StepOutcome {
        let policy = self.config.convergence.pause;
        match convergence::converge_pause(
            self.remote.as_ref(),
            &self.config.source.item_name,
            policy,
            session.cancellation(),
        )
        .await
        {
            Convergence::Converged { value, attempts } => {
                debug!("{}: paused at {:?} after {} polls", self.name, value, attempts);
                StepOutcome::Completed
            }
            Convergence::Exhausted { attempts } => {
                warn!("{}: cursor still moving after {} polls", self.name, attempts);
                StepOutcome::degraded(format!("pause not confirmed after {} polls", attempts))
            }
            Convergence::Cancelled { .. } => cancelled("pause"),
        }
    }

    async fn load(&self, session: &PlaybackSession, path: &str) -> Result<StepOutcome, AdapterError> {
        let source = &self.config.source;
        let results = self
            .remote
            .call_batch(vec![
                self.visibility(false),
                RemoteRequest::SetInputPlaylist {
                    input_name: source.item_name.clone(),
                    path: path.to_owned(),
                },
                self.media_action(MediaAction::Play),
            ])
            .await
            .map_err(self.remote_error("prepare"))?;
        for result in results {
            result.map_err(self.remote_error("prepare"))?;
        }

        debug!("{}: waiting for {} to load", self.name, path);
        let outcome = match convergence::wait_until_loaded(
            self.remote.as_ref(),
            &source.item_name,
            self.config.convergence.load,
            session.cancellation(),
        )
        .await
        {
            Convergence::Converged { attempts, .. } => {
                debug!("{}: media loaded after {} polls", self.name, attempts);
                StepOutcome::Completed
            }
            Convergence::Exhausted { attempts } => {
                warn!(
                    "{}: no cursor/duration after {} polls, continuing",
                    self.name, attempts
                );
                StepOutcome::degraded(format!("media load not confirmed after {} polls", attempts))
            }
            Convergence::Cancelled { .. } => cancelled("prepare"),
        };
        Ok(outcome)
    }

    async fn park(&self, session: &PlaybackSession, first_start_ms: u64) -> Result<StepOutcome, AdapterError> {
        let source = &self.config.source;
        self.command(
            "prepare",
            RemoteRequest::SetMediaCursor {
                input_name: source.item_name.clone(),
                cursor_ms: first_start_ms,
            },
        )
        .await?;

        let (verified, last_seen) = convergence::verify_cursor(
            self.remote.as_ref(),
            &source.item_name,
            first_start_ms,
            self.config.convergence.seek_verify,
            session.cancellation(),
        )
        .await;
        Ok(match verified {
            Convergence::Converged { .. } => StepOutcome::Completed,
            Convergence::Exhausted { .. } => {
                error!(
                    "{}: preparation incomplete, cursor at {:?} instead of {}",
                    self.name, last_seen, first_start_ms
                );
                StepOutcome::degraded(format!(
                    "cursor at {:?} instead of {}",
                    last_seen, first_start_ms
                ))
            }
            Convergence::Cancelled { .. } => cancelled("prepare"),
        })
    }
}

#[async_trait]
impl PlaybackAdapter for RemoteMediaAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    /// Reports `false` while the mixer connection is down.
    async fn check_configuration(&self) -> bool {
        *self.remote.connection().borrow()
    }

    /// Hides the source, loads `path`, waits for the load, pauses and parks
    /// the cursor at `first_start_ms`.
    async fn prepare(
        &self,
        session: &PlaybackSession,
        path: &str,
        first_start_ms: u64,
    ) -> StepResult {
        let Some(_guard) = self.lock(session).await else {
            return Ok(cancelled("prepare"));
        };
        let mut outcome = self.load(session, path).await?;
        if session.is_cancelled() {
            return Ok(cancelled("prepare"));
        }
        outcome = outcome.and(self.settle_pause(session).await);
        if session.is_cancelled() {
            return Ok(cancelled("prepare"));
        }
        outcome = outcome.and(self.park(session, first_start_ms).await?);
        debug!("{}: prepared {} at {} ms", self.name, path, first_start_ms);
        Ok(outcome)
    }

    async fn start(&self, session: &PlaybackSession) -> StepResult {
        let Some(_guard) = self.lock(session).await else {
            return Ok(cancelled("start"));
        };
        self.enter(session).await
    }

    async fn seek(&self, session: &PlaybackSession, ms: u64) -> StepResult {
        let Some(_guard) = self.lock(session).await else {
            return Ok(cancelled("seek"));
        };
        self.command(
            "seek",
            RemoteRequest::SetMediaCursor {
                input_name: self.config.source.item_name.clone(),
                cursor_ms: ms,
            },
        )
        .await?;
        Ok(StepOutcome::Completed)
    }

    async fn pause(&self, session: &PlaybackSession) -> StepResult {
        let Some(_guard) = self.lock(session).await else {
            return Ok(cancelled("pause"));
        };
        Ok(self.settle_pause(session).await)
    }

    async fn resume(&self, session: &PlaybackSession) -> StepResult {
        let Some(_guard) = self.lock(session).await else {
            return Ok(cancelled("resume"));
        };
        self.command("resume", self.media_action(MediaAction::Play))
            .await?;
        Ok(StepOutcome::Completed)
    }

    async fn end(&self, session: &PlaybackSession) -> StepResult {
        let Some(_guard) = self.lock(session).await else {
            return Ok(cancelled("end"));
        };
        self.exit(session).await
    }
}
