use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Fixed-interval retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    #[must_use]
    pub const fn from_millis(max_attempts: u32, interval_ms: u64) -> Self {
        Self::new(max_attempts, Duration::from_millis(interval_ms))
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Ready(T),
    Pending,
}

/// Result of a whole polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence<T> {
    Converged { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl<T> Convergence<T> {
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Convergence::Converged { attempts, .. }
            | Convergence::Exhausted { attempts }
            | Convergence::Cancelled { attempts } => *attempts,
        }
    }
}

/// Polls `attempt` until it reports [`Attempt::Ready`], the budget runs out,
/// or `cancel` fires. The first poll runs immediately; later polls wait
/// `policy.interval` after the previous one finished.
///
/// `attempt` receives the 1-based attempt number.
pub async fn retry_until<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Convergence<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut attempts: u32 = 0;
    while attempts < policy.max_attempts {
        if attempts > 0 {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Convergence::Cancelled { attempts },
                () = tokio::time::sleep(policy.interval) => {}
            }
        }
        attempts = attempts.saturating_add(1);
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Convergence::Cancelled { attempts },
            outcome = attempt(attempts) => outcome,
        };
        if let Attempt::Ready(value) = outcome {
            return Convergence::Converged { value, attempts };
        }
    }
    Convergence::Exhausted { attempts }
}
