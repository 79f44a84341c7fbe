use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::remote::{
    MediaAction, MediaState, MediaStatus, RemoteControl, RemoteControlExt, RemoteRequest,
};
use crate::sync::{Attempt, Convergence, RetryPolicy, retry_until};

/// Polling budgets for reconciling a media input with commanded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceSettings {
    /// Waiting for cursor and duration after the loading play command.
    pub load: RetryPolicy,
    /// Waiting for the cursor to stop moving after a pause.
    pub pause: RetryPolicy,
    /// Verifying the cursor landed exactly on the commanded position.
    pub seek_verify: RetryPolicy,
    /// Cross-checking the program scene after a transition-started event.
    pub scene_check: RetryPolicy,
    /// Upper bound on any single transition event wait.
    pub transition_timeout: Option<Duration>,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            load: RetryPolicy::from_millis(10, 200),
            pause: RetryPolicy::from_millis(20, 80),
            seek_verify: RetryPolicy::from_millis(10, 50),
            scene_check: RetryPolicy::from_millis(5, 20),
            transition_timeout: Some(Duration::from_secs(30)),
        }
    }
}

async fn poll_status(remote: &dyn RemoteControl, input_name: &str) -> Option<MediaStatus> {
    match remote.media_status(input_name).await {
        Ok(status) => {
            debug!("Checking {}: {:?}", input_name, status);
            Some(status)
        }
        Err(err) => {
            debug!("Status poll for {} failed: {}", input_name, err);
            None
        }
    }
}

/// Polls until the input reports a positive cursor and duration.
pub(super) async fn wait_until_loaded(
    remote: &dyn RemoteControl,
    input_name: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Convergence<MediaStatus> {
    retry_until(policy, cancel, move |_| async move {
        match poll_status(remote, input_name).await {
            Some(status) if status.is_loaded() => Attempt::Ready(status),
            Some(_) | None => Attempt::Pending,
        }
    })
    .await
}

/// Pause convergence.
///
/// While the input is not paused a pause command is sent and the cursor
/// sentinel is reset. Once paused, completion requires two consecutive polls
/// reporting the same cursor. A cursor that stalls without the input being
/// paused is indistinguishable from a settled pause here.
pub(super) async fn converge_pause(
    remote: &dyn RemoteControl,
    input_name: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Convergence<Option<u64>> {
    let previous: Mutex<Option<Option<u64>>> = Mutex::new(None);
    let previous = &previous;
    retry_until(policy, cancel, move |_| async move {
        let Some(status) = poll_status(remote, input_name).await else {
            return Attempt::Pending;
        };
        if status.state != MediaState::Paused {
            if let Err(err) = remote
                .command(RemoteRequest::TriggerMediaAction {
                    input_name: input_name.to_owned(),
                    action: MediaAction::Pause,
                })
                .await
            {
                debug!("Pause command for {} failed: {}", input_name, err);
            }
            if let Ok(mut previous) = previous.lock() {
                *previous = None;
            }
            return Attempt::Pending;
        }
        let last = previous
            .lock()
            .ok()
            .and_then(|mut previous| previous.replace(status.cursor_ms));
        match last {
            Some(last) if last == status.cursor_ms => Attempt::Ready(status.cursor_ms),
            Some(_) | None => Attempt::Pending,
        }
    })
    .await
}

/// Polls until the reported cursor equals `target_ms` exactly. Returns the
/// last cursor seen alongside the outcome.
pub(super) async fn verify_cursor(
    remote: &dyn RemoteControl,
    input_name: &str,
    target_ms: u64,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> (Convergence<()>, Option<u64>) {
    let last_seen: Mutex<Option<u64>> = Mutex::new(None);
    let last_seen_ref = &last_seen;
    let outcome = retry_until(policy, cancel, move |_| async move {
        let Some(status) = poll_status(remote, input_name).await else {
            return Attempt::Pending;
        };
        if let Ok(mut last_seen) = last_seen_ref.lock() {
            *last_seen = status.cursor_ms;
        }
        if status.cursor_ms == Some(target_ms) {
            Attempt::Ready(())
        } else {
            Attempt::Pending
        }
    })
    .await;
    let last = last_seen.lock().ok().and_then(|last_seen| *last_seen);
    (outcome, last)
}

/// Polls until the program scene is `scene_name`.
pub(super) async fn program_scene_is(
    remote: &dyn RemoteControl,
    scene_name: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Convergence<()> {
    retry_until(policy, cancel, move |_| async move {
        match remote.program_scene().await {
            Ok(current) if current == scene_name => Attempt::Ready(()),
            Ok(current) => {
                debug!("Program scene is {}, waiting for {}", current, scene_name);
                Attempt::Pending
            }
            Err(err) => {
                debug!("Program scene poll failed: {}", err);
                Attempt::Pending
            }
        }
    })
    .await
}
