//! Bounded polling used wherever the mixer is only eventually consistent.
mod retry;

pub use retry::{Attempt, Convergence, RetryPolicy, retry_until};
