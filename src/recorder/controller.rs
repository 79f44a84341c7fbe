use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{LapMarker, Replay};
use crate::error::{RecorderError, RemoteError};
use crate::remote::{RemoteControl, RemoteControlExt, RemoteEvent, RemoteRequest};

use super::settings::RecorderSettings;
use super::status::BufferStatus;

/// Result of a save request.
#[derive(Debug)]
pub enum SaveOutcome {
    /// The save was issued; `laps` are waiting for the saved event.
    Requested { laps: usize },
    /// The save was issued, but an earlier stash had not been claimed by a
    /// saved event yet and was dropped.
    ReplacedPendingStash { discarded: Vec<LapMarker> },
    /// The mixer rejected the save. The laps stay stashed.
    CommandFailed { source: RemoteError },
}

/// Laps of the running buffer session and the stash awaiting a save.
#[derive(Default)]
struct Session {
    record_started_at: Option<Instant>,
    laps: Vec<LapMarker>,
    first_lap_at: Option<Instant>,
    deadline: Option<CancellationToken>,
    stash: Option<Vec<LapMarker>>,
}

impl Session {
    fn reset_deadline(&mut self) {
        self.first_lap_at = None;
        if let Some(deadline) = self.deadline.take() {
            deadline.cancel();
        }
    }
}

struct Inner {
    remote: Arc<dyn RemoteControl>,
    settings: RecorderSettings,
    status: watch::Sender<BufferStatus>,
    session: Mutex<Session>,
    replays: mpsc::UnboundedSender<Replay>,
    lifetime: CancellationToken,
}

/// Tracks the mixer's replay buffer, captures laps and turns saved buffers
/// into [`Replay`] records.
pub struct RecordingController {
    inner: Arc<Inner>,
    driver: JoinHandle<()>,
}

impl RecordingController {
    /// Starts following the buffer. Completed replays arrive on the returned
    /// receiver. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when `settings` are inconsistent.
    pub fn new(
        remote: Arc<dyn RemoteControl>,
        settings: RecorderSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Replay>), RecorderError> {
        settings.validate()?;
        let (status, _) = watch::channel(BufferStatus::NotConnected);
        let (replays, replay_rx) = mpsc::unbounded_channel();
        let events = remote.subscribe();
        let connection = remote.connection();
        let inner = Arc::new(Inner {
            remote,
            settings,
            status,
            session: Mutex::new(Session::default()),
            replays,
            lifetime: CancellationToken::new(),
        });
        let driver = tokio::spawn(drive(Arc::clone(&inner), connection, events));
        Ok((Self { inner, driver }, replay_rx))
    }

    #[must_use]
    pub fn status(&self) -> BufferStatus {
        *self.inner.status.borrow()
    }

    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<BufferStatus> {
        self.inner.status.subscribe()
    }

    /// Laps captured since the last save.
    #[must_use]
    pub fn laps(&self) -> Vec<LapMarker> {
        self.inner
            .with_session(|session| session.laps.clone())
            .unwrap_or_default()
    }

    /// Laps are waiting for a saved event.
    #[must_use]
    pub fn has_unsaved_stash(&self) -> bool {
        self.inner
            .with_session(|session| session.stash.is_some())
            .unwrap_or(false)
    }

    /// Signed time until the autosave deadline; `None` before the first lap.
    #[must_use]
    pub fn remaining_ms(&self) -> Option<i64> {
        let anchor = self
            .inner
            .with_session(|session| session.first_lap_at)
            .flatten()?;
        let budget = millis_i64(self.inner.settings.deadline_after_first_lap());
        Some(budget.saturating_sub(millis_i64(anchor.elapsed())))
    }

    /// Asks the mixer to start or stop the buffer. Status follows the
    /// mixer's events; a failed request is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::ShutDown`] after [`Self::shutdown`], or
    /// [`RecorderError::ToggleUnavailable`] while the buffer is unreachable or
    /// between states.
    pub async fn toggle_buffer(&self) -> Result<(), RecorderError> {
        self.inner.ensure_running()?;
        let status = self.status();
        if !status.can_toggle() {
            return Err(RecorderError::ToggleUnavailable {
                status: status.name(),
            });
        }
        if let Err(err) = self.inner.remote.command(RemoteRequest::ToggleReplayBuffer).await {
            error!("Failed to toggle replay buffer: {}", err);
        }
        Ok(())
    }

    /// Marks a lap at the current recording time. Returns `None` unless the
    /// buffer is recording with a known start.
    pub fn add_lap(&self) -> Option<LapMarker> {
        if self.inner.lifetime.is_cancelled() || self.status() != BufferStatus::Recording {
            debug!("Lap ignored while {}", self.status());
            return None;
        }
        let now = Instant::now();
        let (lap, arm) = self
            .inner
            .with_session(|session| {
                let started = session.record_started_at?;
                let lap = LapMarker {
                    time_ms: millis_u64(now.saturating_duration_since(started)),
                    duration_ms: self.inner.settings.lap_duration_ms,
                };
                let arm = session.laps.is_empty() && session.first_lap_at.is_none();
                if arm {
                    session.first_lap_at = Some(now);
                    let token = self.inner.lifetime.child_token();
                    session.deadline = Some(token.clone());
                    session.laps.push(lap);
                    return Some((lap, Some(token)));
                }
                session.laps.push(lap);
                Some((lap, None))
            })
            .flatten()?;
        if let Some(token) = arm {
            self.inner.arm_deadline(now, token);
        }
        info!("Lap at {} ms", lap.time_ms);
        Some(lap)
    }

    /// Stashes the current laps and asks the mixer to save its buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::ShutDown`] after [`Self::shutdown`].
    pub async fn save(&self) -> Result<SaveOutcome, RecorderError> {
        self.inner.ensure_running()?;
        Ok(self.inner.save().await)
    }

    /// Stops following the buffer and cancels the deadline check.
    pub fn shutdown(&self) {
        self.inner.lifetime.cancel();
        if let Ok(mut session) = self.inner.session.lock() {
            session.reset_deadline();
        }
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        self.shutdown();
        self.driver.abort();
    }
}

impl Inner {
    fn ensure_running(&self) -> Result<(), RecorderError> {
        if self.lifetime.is_cancelled() {
            return Err(RecorderError::ShutDown);
        }
        Ok(())
    }

    fn with_session<R>(&self, apply: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.session.lock().ok().map(|mut session| apply(&mut session))
    }

    fn set_status(&self, next: BufferStatus) {
        let previous = self.status.send_replace(next);
        if previous == next {
            return;
        }
        info!("Replay buffer {} -> {}", previous, next);
        let Ok(mut session) = self.session.lock() else {
            return;
        };
        if next == BufferStatus::Recording {
            session.record_started_at = Some(Instant::now());
            return;
        }
        session.record_started_at = None;
        if previous == BufferStatus::Recording {
            if !session.laps.is_empty() {
                debug!("Dropping {} unsaved lap(s)", session.laps.len());
            }
            session.laps.clear();
            session.reset_deadline();
        }
    }

    async fn fetch_status(&self) {
        self.set_status(BufferStatus::Fetching);
        match self.remote.replay_buffer_active().await {
            Ok(true) => self.set_status(BufferStatus::AlreadyStarted),
            Ok(false) => self.set_status(BufferStatus::NotRecording),
            Err(err) if err.is_unavailable_output() => {
                warn!("Replay buffer is not enabled on the mixer");
                self.set_status(BufferStatus::NotAvailable);
            }
            Err(err) => warn!("Failed to fetch replay buffer status: {}", err),
        }
    }

    async fn save(&self) -> SaveOutcome {
        let (laps, replaced) = self
            .with_session(|session| {
                let laps = std::mem::take(&mut session.laps);
                session.reset_deadline();
                let replaced = session.stash.replace(laps.clone());
                (laps, replaced)
            })
            .unwrap_or_default();
        if let Some(discarded) = replaced.as_ref() {
            warn!(
                "Replacing {} unsaved lap(s) still waiting for a saved replay",
                discarded.len()
            );
        }

        info!("Saving replay buffer with {} lap(s)", laps.len());
        if let Err(source) = self.remote.command(RemoteRequest::SaveReplayBuffer).await {
            error!("Failed to save replay buffer: {}", source);
            return SaveOutcome::CommandFailed { source };
        }
        match replaced {
            Some(discarded) => SaveOutcome::ReplacedPendingStash { discarded },
            None => SaveOutcome::Requested { laps: laps.len() },
        }
    }

    fn on_saved(&self, path: String) {
        let Some(laps) = self.with_session(|session| session.stash.take()).flatten() else {
            warn!("Replay saved to {} but no laps were waiting for it", path);
            return;
        };
        info!("Replay saved to {} with {} lap(s)", path, laps.len());
        if self.replays.send(Replay { path, laps }).is_err() {
            debug!("Nobody is listening for replays");
        }
    }

    fn on_event(&self, event: RemoteEvent) {
        match event {
            RemoteEvent::ReplayBufferStateChanged { state, .. } => {
                if let Some(status) = BufferStatus::from_output(state) {
                    self.set_status(status);
                }
            }
            RemoteEvent::ReplayBufferSaved { path } => self.on_saved(path),
            RemoteEvent::TransitionStarted { .. }
            | RemoteEvent::TransitionEnded { .. }
            | RemoteEvent::SceneListChanged { .. }
            | RemoteEvent::Other { .. } => {}
        }
    }

    /// Spawns the periodic check against `first_lap_at + max_buffer - margin`.
    fn arm_deadline(self: &Arc<Self>, first_lap_at: Instant, token: CancellationToken) {
        let deadline = first_lap_at
            .checked_add(self.settings.deadline_after_first_lap())
            .unwrap_or(first_lap_at);
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.settings.check_interval);
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                if Instant::now() < deadline {
                    continue;
                }
                if inner.settings.auto_save {
                    info!("Buffer limit near, forcing save");
                    let outcome = inner.save().await;
                    debug!("Forced save: {:?}", outcome);
                } else {
                    warn!("Buffer limit near and auto save is off; save now to keep the laps");
                }
                return;
            }
        });
    }
}

async fn drive(
    inner: Arc<Inner>,
    mut connection: watch::Receiver<bool>,
    mut events: broadcast::Receiver<RemoteEvent>,
) {
    let connected = *connection.borrow_and_update();
    if connected {
        inner.fetch_status().await;
    }
    let mut events_open = true;
    loop {
        tokio::select! {
            biased;
            () = inner.lifetime.cancelled() => break,
            changed = connection.changed() => {
                let connected = changed.is_ok() && *connection.borrow_and_update();
                if connected {
                    inner.fetch_status().await;
                } else {
                    inner.set_status(BufferStatus::NotConnected);
                    if changed.is_err() {
                        break;
                    }
                }
            }
            event = events.recv(), if events_open => match event {
                Ok(event) => inner.on_event(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Recorder missed {} mixer events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => events_open = false,
            },
        }
    }
    debug!("Recorder stopped");
}

fn millis_u64(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn millis_i64(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
