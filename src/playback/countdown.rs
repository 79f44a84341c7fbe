use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Emitted when a countdown run reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownReached {
    pub generation: u64,
}

struct Run {
    generation: u64,
    start_ms: u64,
    end_ms: u64,
    started_at: Instant,
    cancel: CancellationToken,
}

/// Segment timer counting from `start_ms` up to `end_ms` in media time.
///
/// Restarting cancels the previous run; each run carries a generation so a
/// late notification from a replaced run can be told apart.
pub struct Countdown {
    reached: mpsc::UnboundedSender<CountdownReached>,
    run: Mutex<Option<Run>>,
    next_generation: Mutex<u64>,
}

impl Countdown {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CountdownReached>) {
        let (reached, rx) = mpsc::unbounded_channel();
        (
            Self {
                reached,
                run: Mutex::new(None),
                next_generation: Mutex::new(0),
            },
            rx,
        )
    }

    /// Starts a run over `[start_ms, end_ms]`, replacing any active run.
    /// Returns the generation of the new run.
    pub fn start(&self, start_ms: u64, end_ms: u64) -> u64 {
        let generation = match self.next_generation.lock() {
            Ok(mut next) => {
                *next = next.wrapping_add(1);
                *next
            }
            Err(_) => 0,
        };
        let span = Duration::from_millis(end_ms.saturating_sub(start_ms));
        let cancel = CancellationToken::new();
        let run = Run {
            generation,
            start_ms,
            end_ms,
            started_at: Instant::now(),
            cancel: cancel.clone(),
        };
        if let Ok(mut slot) = self.run.lock()
            && let Some(previous) = slot.replace(run)
        {
            previous.cancel.cancel();
        }

        let reached = self.reached.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(span) => {
                    debug!("Countdown {} reached", generation);
                    if reached.send(CountdownReached { generation }).is_err() {
                        debug!("Countdown listener went away");
                    }
                }
            }
        });
        generation
    }

    pub fn stop(&self) {
        if let Ok(mut slot) = self.run.lock()
            && let Some(run) = slot.take()
        {
            run.cancel.cancel();
        }
    }

    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        self.run
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|run| run.generation))
    }

    /// Current media position of the active run, clamped to its target.
    #[must_use]
    pub fn position_ms(&self) -> Option<u64> {
        let slot = self.run.lock().ok()?;
        let run = slot.as_ref()?;
        let elapsed = u64::try_from(run.started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        Some(run.start_ms.saturating_add(elapsed).min(run.end_ms))
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}
