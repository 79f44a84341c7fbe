use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{PlayQueue, PlayQueueItem};
use crate::error::PlaybackError;

use super::adapter::{PlaybackAdapter, PlaybackSession};
use super::countdown::{Countdown, CountdownReached};
use super::fanout::{FanOutReport, Step, fan_out};
use super::state::PlaybackState;
use super::targets::PlaybackTargets;

/// Adapters and cancellation handle of one prepared run.
#[derive(Clone)]
struct Run {
    session: PlaybackSession,
    adapters: Vec<Arc<dyn PlaybackAdapter>>,
}

struct Inner {
    state: watch::Sender<PlaybackState>,
    queue: Mutex<PlayQueue>,
    targets: Mutex<PlaybackTargets>,
    run: Mutex<Option<Run>>,
    countdown: Countdown,
    lifetime: CancellationToken,
}

/// Drives a play queue across the active playback targets.
///
/// Every lifecycle call fans out to all adapters concurrently; segment
/// advance is driven by a countdown over each item's media span.
pub struct PlaybackController {
    inner: Arc<Inner>,
    driver: JoinHandle<()>,
}

impl PlaybackController {
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(targets: PlaybackTargets) -> Self {
        let (countdown, reached) = Countdown::new();
        let (state, _) = watch::channel(PlaybackState::NotReady);
        let inner = Arc::new(Inner {
            state,
            queue: Mutex::new(PlayQueue::default()),
            targets: Mutex::new(targets),
            run: Mutex::new(None),
            countdown,
            lifetime: CancellationToken::new(),
        });
        let driver = tokio::spawn(drive(Arc::clone(&inner), reached));
        Self { inner, driver }
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        *self.inner.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn queue(&self) -> PlayQueue {
        self.inner
            .queue
            .lock()
            .map(|queue| queue.clone())
            .unwrap_or_default()
    }

    /// Item currently playing, if any.
    #[must_use]
    pub fn current_item(&self) -> Option<PlayQueueItem> {
        match self.state() {
            PlaybackState::Playing(index) => self.inner.item(index).ok(),
            PlaybackState::NotReady
            | PlaybackState::Preparing
            | PlaybackState::Ready
            | PlaybackState::Starting
            | PlaybackState::Ending => None,
        }
    }

    /// Media position of the running segment.
    #[must_use]
    pub fn position_ms(&self) -> Option<u64> {
        self.inner.countdown.position_ms()
    }

    #[must_use]
    pub fn preview_only(&self) -> bool {
        self.inner
            .targets
            .lock()
            .map(|targets| targets.preview_only())
            .unwrap_or(false)
    }

    /// Replaces the play queue. A prepared run is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::SessionActive`] while a run is in progress.
    pub fn set_queue(&self, queue: PlayQueue) -> Result<(), PlaybackError> {
        self.inner.ensure_running()?;
        self.inner.invalidate_preparation("queue")?;
        if let Ok(mut slot) = self.inner.queue.lock() {
            *slot = queue;
        }
        Ok(())
    }

    /// Toggles preview-only mode. A prepared run is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::SessionActive`] while a run is in progress.
    pub fn set_preview_only(&self, enabled: bool) -> Result<(), PlaybackError> {
        self.inner.ensure_running()?;
        self.inner.invalidate_preparation("targets")?;
        if let Ok(mut targets) = self.inner.targets.lock() {
            targets.set_preview_only(enabled);
        }
        info!("Preview-only mode {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    /// Parks every target at the first item.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::EmptyQueue`] without changing state when the
    /// queue is empty, [`PlaybackError::InvalidTransition`] outside
    /// NOT_READY/READY, or [`PlaybackError::Aborted`] when the run was aborted
    /// or replaced while the targets were being prepared.
    pub async fn prepare(&self) -> Result<FanOutReport, PlaybackError> {
        self.inner.ensure_running()?;
        let first = self.inner.item(0).map_err(|_err| PlaybackError::EmptyQueue)?;
        self.inner.transition(PlaybackState::Preparing)?;

        let adapters = self.inner.configured_adapters().await;
        let session = PlaybackSession::new();
        self.inner.replace_run(Run {
            session: session.clone(),
            adapters: adapters.clone(),
        });
        info!("Preparing {} on {} target(s)", first.name, adapters.len());

        let report = fan_out(
            &Step::Prepare {
                path: first.path,
                first_start_ms: first.start_ms,
            },
            &adapters,
            &session,
        )
        .await;
        self.inner.transition_within(&session, PlaybackState::Ready)?;
        Ok(report)
    }

    /// Runs the start choreography and begins the first segment. Returns once
    /// the first segment is playing.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] unless READY.
    pub async fn start(&self) -> Result<FanOutReport, PlaybackError> {
        self.inner.ensure_running()?;
        self.inner.transition(PlaybackState::Starting)?;
        let run = self.inner.current_run();
        let report = fan_out(&Step::Start, &run.adapters, &run.session).await;
        self.inner.play_item(0).await?;
        Ok(report)
    }

    /// Plays queue item `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::IndexOutOfRange`] when `index` is past the
    /// end of the queue, or [`PlaybackError::InvalidTransition`] when the
    /// current state cannot move to `PLAYING(index)`. State is unchanged in
    /// both cases.
    pub async fn play_item(&self, index: usize) -> Result<(), PlaybackError> {
        self.inner.ensure_running()?;
        self.inner.play_item(index).await
    }

    /// Stops the run: cancels in-flight convergence work, stops the
    /// countdown and pauses every target.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] when there is nothing to
    /// abort.
    pub async fn abort(&self) -> Result<FanOutReport, PlaybackError> {
        self.inner.transition(PlaybackState::NotReady)?;
        self.inner.countdown.stop();
        let run = self.inner.take_run();
        run.session.cancel();
        info!("Playback aborted");
        Ok(fan_out(&Step::Pause, &run.adapters, &PlaybackSession::new()).await)
    }

    /// Stops the driver and any running countdown.
    pub fn shutdown(&self) {
        self.inner.lifetime.cancel();
        self.inner.countdown.stop();
        if let Ok(slot) = self.inner.run.lock()
            && let Some(run) = slot.as_ref()
        {
            run.session.cancel();
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.shutdown();
        self.driver.abort();
    }
}

impl Inner {
    fn ensure_running(&self) -> Result<(), PlaybackError> {
        if self.lifetime.is_cancelled() {
            return Err(PlaybackError::ShutDown);
        }
        Ok(())
    }

    fn item(&self, index: usize) -> Result<PlayQueueItem, PlaybackError> {
        let queue = self.queue.lock().map_err(|_err| PlaybackError::EmptyQueue)?;
        queue
            .get(index)
            .cloned()
            .ok_or(PlaybackError::IndexOutOfRange {
                index,
                len: queue.len(),
            })
    }

    fn queue_len(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    fn check(&self, next: PlaybackState) -> Result<(), PlaybackError> {
        let current = *self.state.borrow();
        if current.can_transition_to(next) {
            Ok(())
        } else {
            Err(PlaybackError::InvalidTransition {
                from: current.name(),
                to: next.name(),
            })
        }
    }

    /// Applies `next` if the table allows it from the current state.
    fn transition(&self, next: PlaybackState) -> Result<(), PlaybackError> {
        let mut outcome = Ok(PlaybackState::NotReady);
        self.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                outcome = Ok(*current);
                *current = next;
                true
            } else {
                outcome = Err(PlaybackError::InvalidTransition {
                    from: current.name(),
                    to: next.name(),
                });
                false
            }
        });
        let previous = outcome?;
        info!("Playback {} -> {}", previous, next);
        Ok(())
    }

    /// Like [`Self::transition`], but only while `session` is still live. A
    /// run cancelled by abort or replaced by a newer prepare never moves the
    /// state on behalf of its successor.
    fn transition_within(
        &self,
        session: &PlaybackSession,
        next: PlaybackState,
    ) -> Result<(), PlaybackError> {
        let mut outcome = Err(PlaybackError::Aborted);
        self.state.send_if_modified(|current| {
            if session.is_cancelled() {
                return false;
            }
            if current.can_transition_to(next) {
                outcome = Ok(*current);
                *current = next;
                true
            } else {
                outcome = Err(PlaybackError::InvalidTransition {
                    from: current.name(),
                    to: next.name(),
                });
                false
            }
        });
        let previous = outcome.inspect_err(|err| debug!("Dropping stale {}: {}", next, err))?;
        info!("Playback {} -> {}", previous, next);
        Ok(())
    }

    /// READY drops back to NOT_READY; an active run rejects the change.
    fn invalidate_preparation(&self, what: &'static str) -> Result<(), PlaybackError> {
        let mut outcome = Ok(false);
        self.state.send_if_modified(|current| match *current {
            PlaybackState::Ready => {
                *current = PlaybackState::NotReady;
                outcome = Ok(true);
                true
            }
            PlaybackState::NotReady => false,
            active @ (PlaybackState::Preparing
            | PlaybackState::Starting
            | PlaybackState::Playing(_)
            | PlaybackState::Ending) => {
                outcome = Err(PlaybackError::SessionActive {
                    what,
                    state: active.name(),
                });
                false
            }
        });
        if outcome? {
            info!("Playback READY -> NOT_READY ({} changed)", what);
            self.take_run().session.cancel();
        }
        Ok(())
    }

    async fn configured_adapters(&self) -> Vec<Arc<dyn PlaybackAdapter>> {
        let candidates = self
            .targets
            .lock()
            .map(|targets| targets.active())
            .unwrap_or_default();
        let checks = join_all(
            candidates
                .iter()
                .map(|adapter| async move { adapter.check_configuration().await }),
        )
        .await;
        candidates
            .into_iter()
            .zip(checks)
            .filter_map(|(adapter, ready)| {
                if ready {
                    Some(adapter)
                } else {
                    warn!("{} is not configured; leaving it out", adapter.name());
                    None
                }
            })
            .collect()
    }

    fn replace_run(&self, run: Run) {
        if let Ok(mut slot) = self.run.lock()
            && let Some(previous) = slot.replace(run)
        {
            previous.session.cancel();
        }
    }

    fn current_run(&self) -> Run {
        self.run
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .unwrap_or_else(|| Run {
                session: PlaybackSession::new(),
                adapters: Vec::new(),
            })
    }

    fn take_run(&self) -> Run {
        self.run
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .unwrap_or_else(|| Run {
                session: PlaybackSession::new(),
                adapters: Vec::new(),
            })
    }

    async fn play_item(&self, index: usize) -> Result<(), PlaybackError> {
        let item = self.item(index)?;
        let next = PlaybackState::Playing(index);
        self.check(next)?;

        let run = self.current_run();
        if index > 0 {
            debug!("[{}] Seek to {} ms", index, item.start_ms);
            fan_out(&Step::Seek { ms: item.start_ms }, &run.adapters, &run.session).await;
        }
        debug!("[{}] Play {}", index, item.name);
        fan_out(&Step::Resume, &run.adapters, &run.session).await;

        self.transition(next)?;
        self.countdown.start(item.start_ms, item.end_ms());
        Ok(())
    }

    /// Pauses every target, runs the end hooks and returns to NOT_READY.
    async fn finish(&self) -> Result<(), PlaybackError> {
        self.countdown.stop();
        let run = self.current_run();
        fan_out(&Step::Pause, &run.adapters, &run.session).await;
        self.transition(PlaybackState::Ending)?;
        fan_out(&Step::End, &run.adapters, &run.session).await;
        self.transition(PlaybackState::NotReady)?;
        self.take_run();
        info!("Replay finished");
        Ok(())
    }

    async fn advance(&self) -> Result<(), PlaybackError> {
        let state = *self.state.borrow();
        let PlaybackState::Playing(index) = state else {
            return Ok(());
        };
        match index.checked_add(1) {
            Some(next) if next < self.queue_len() => {
                debug!("[{}] Segment ended, next lap", index);
                self.play_item(next).await
            }
            Some(_) | None => self.finish().await,
        }
    }
}

async fn drive(inner: Arc<Inner>, mut reached: mpsc::UnboundedReceiver<CountdownReached>) {
    loop {
        let event = tokio::select! {
            () = inner.lifetime.cancelled() => break,
            event = reached.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        if inner.countdown.generation() != Some(event.generation) {
            debug!("Ignoring stale countdown {}", event.generation);
            continue;
        }
        if let Err(err) = inner.advance().await {
            warn!("Segment advance failed: {}", err);
        }
    }
    debug!("Playback driver stopped");
}
