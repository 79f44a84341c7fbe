//! Scene transition choreography around playback start and end.
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::playback::{PlaybackSession, StepOutcome, StepResult};
use crate::remote::wait::{WaitOutcome, wait_for_event};
use crate::remote::{MediaAction, RemoteControlExt, RemoteEvent, RemoteRequest};
use crate::sync::Convergence;

use super::{RemoteMediaAdapter, cancelled, convergence};

/// Sleeps for `duration` unless the session is cancelled first.
async fn sleep_unless_cancelled(session: &PlaybackSession, duration: Duration) -> bool {
    tokio::select! {
        () = session.cancellation().cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

fn wait_outcome(outcome: WaitOutcome<()>, what: &str) -> StepOutcome {
    match outcome {
        WaitOutcome::Matched(()) => StepOutcome::Completed,
        WaitOutcome::TimedOut => StepOutcome::degraded(format!("timed out waiting for {}", what)),
        WaitOutcome::Cancelled => StepOutcome::degraded(format!("cancelled waiting for {}", what)),
        WaitOutcome::Closed => {
            StepOutcome::degraded(format!("event stream closed waiting for {}", what))
        }
    }
}

impl RemoteMediaAdapter {
    /// Shows the source, brings the replay scene on air and starts playback
    /// at the configured point of the transition.
    pub(super) async fn enter(&self, session: &PlaybackSession) -> StepResult {
        let options = self.config.options.transition_in;
        let scene = &self.config.source.scene_name;

        self.command("start", self.visibility(true)).await?;
        // Subscribe before switching so the transition events cannot be missed.
        let mut events = self.remote.subscribe();
        if options.auto_transition {
            self.command(
                "start",
                RemoteRequest::SetProgramScene {
                    scene_name: scene.clone(),
                },
            )
            .await?;
        } else {
            info!("{}: auto transition is off, switch to '{}' manually", self.name, scene);
        }

        let waited = match (options.play_before_transition, options.transition_point_ms) {
            (true, Some(point_ms)) => {
                let mut outcome = StepOutcome::Completed;
                if !options.auto_transition {
                    outcome = self.await_transition_started(&mut events, session).await;
                }
                if session.is_cancelled()
                    || !sleep_unless_cancelled(session, Duration::from_millis(point_ms)).await
                {
                    return Ok(cancelled("start"));
                }
                outcome
            }
            (true, None) | (false, _) => self.await_transition_into_scene(&mut events, session).await,
        };
        if session.is_cancelled() {
            return Ok(cancelled("start"));
        }

        self.command("start", self.media_action(MediaAction::Play))
            .await?;
        debug!("{}: playing", self.name);
        Ok(waited)
    }

    /// Waits for a transition-started event after which the program scene is
    /// the replay scene. Transitions elsewhere are ignored.
    async fn await_transition_started(
        &self,
        events: &mut broadcast::Receiver<RemoteEvent>,
        session: &PlaybackSession,
    ) -> StepOutcome {
        let remote = self.remote.as_ref();
        let scene = self.config.source.scene_name.as_str();
        let policy = self.config.convergence.scene_check;
        let cancel = session.cancellation();
        let name = self.name.as_str();
        let outcome = wait_for_event(
            events,
            self.config.convergence.transition_timeout,
            cancel,
            move |event| async move {
                let RemoteEvent::TransitionStarted { .. } = event else {
                    return None;
                };
                match convergence::program_scene_is(remote, scene, policy, cancel).await {
                    Convergence::Converged { .. } => Some(()),
                    Convergence::Exhausted { .. } | Convergence::Cancelled { .. } => {
                        info!(
                            "{}: transition started but not into '{}', not playing yet",
                            name, scene
                        );
                        None
                    }
                }
            },
        )
        .await;
        wait_outcome(outcome, "transition start")
    }

    /// Waits for a transition-ended event that left the replay scene on air.
    async fn await_transition_into_scene(
        &self,
        events: &mut broadcast::Receiver<RemoteEvent>,
        session: &PlaybackSession,
    ) -> StepOutcome {
        let remote = self.remote.as_ref();
        let scene = self.config.source.scene_name.as_str();
        let name = self.name.as_str();
        let outcome = wait_for_event(
            events,
            self.config.convergence.transition_timeout,
            session.cancellation(),
            move |event| async move {
                let RemoteEvent::TransitionEnded { .. } = event else {
                    return None;
                };
                match remote.program_scene().await {
                    Ok(current) if current == scene => Some(()),
                    Ok(current) => {
                        info!(
                            "{}: transition ended on '{}' instead of '{}', not playing yet",
                            name, current, scene
                        );
                        None
                    }
                    Err(err) => {
                        warn!("{}: program scene check failed: {}", name, err);
                        None
                    }
                }
            },
        )
        .await;
        wait_outcome(outcome, "transition end")
    }

    /// Hands the program output back to the fallback scene and hides the
    /// source once the transition is over.
    pub(super) async fn exit(&self, session: &PlaybackSession) -> StepResult {
        let options = self.config.options.transition_out;
        let fallback = &self.config.fallback_scene;
        let scene = self.config.source.scene_name.as_str();

        if options.keep_playing_during_transition {
            self.command("end", self.media_action(MediaAction::Play))
                .await?;
        }
        let mut events = self.remote.subscribe();
        if options.auto_transition {
            self.command(
                "end",
                RemoteRequest::SetProgramScene {
                    scene_name: fallback.clone(),
                },
            )
            .await?;
        } else {
            info!("{}: auto transition is off, switch away from '{}' manually", self.name, scene);
        }

        let mut outcome = match options.transition_point_ms {
            Some(point_ms) => {
                if sleep_unless_cancelled(session, Duration::from_millis(point_ms)).await {
                    StepOutcome::Completed
                } else {
                    cancelled("end")
                }
            }
            None => {
                let remote = self.remote.as_ref();
                let manual = !options.auto_transition;
                let waited = wait_for_event(
                    &mut events,
                    self.config.convergence.transition_timeout,
                    session.cancellation(),
                    move |event| async move {
                        let RemoteEvent::TransitionEnded { .. } = event else {
                            return None;
                        };
                        if !manual {
                            return Some(());
                        }
                        // The operator may cut between other scenes first.
                        match remote.program_scene().await {
                            Ok(current) if current != scene => Some(()),
                            Ok(_) | Err(_) => None,
                        }
                    },
                )
                .await;
                wait_outcome(waited, "transition end")
            }
        };

        self.command("end", self.visibility(false)).await?;
        if options.keep_playing_during_transition {
            outcome = outcome.and(self.settle_pause(session).await);
        }
        debug!("{}: handed program back", self.name);
        Ok(outcome)
    }
}
