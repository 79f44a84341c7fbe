//! Waiting for a mixer event that satisfies a condition.
use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::RemoteEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    Matched(T),
    TimedOut,
    Cancelled,
    /// The event bus was closed, which happens when the connection drops.
    Closed,
}

/// Receives events until `accept` yields a value, the optional timeout
/// elapses, or `cancel` fires.
///
/// Subscribe before issuing the command that triggers the awaited event,
/// otherwise the event can be missed. Events `accept` rejects are dropped.
pub async fn wait_for_event<T, F, Fut>(
    events: &mut broadcast::Receiver<RemoteEvent>,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
    mut accept: F,
) -> WaitOutcome<T>
where
    F: FnMut(RemoteEvent) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => return WaitOutcome::Cancelled,
            () = sleep_until_deadline(deadline) => return WaitOutcome::TimedOut,
            event = next_event(events) => event,
        };
        let Some(event) = event else {
            return WaitOutcome::Closed;
        };
        let accepted = tokio::select! {
            () = cancel.cancelled() => return WaitOutcome::Cancelled,
            () = sleep_until_deadline(deadline) => return WaitOutcome::TimedOut,
            accepted = accept(event) => accepted,
        };
        if let Some(value) = accepted {
            return WaitOutcome::Matched(value);
        }
    }
}

async fn next_event(events: &mut broadcast::Receiver<RemoteEvent>) -> Option<RemoteEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event subscriber lagged; skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
