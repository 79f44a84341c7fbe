//! Playback state machine and the render-target contract it drives.
pub mod adapter;
mod controller;
pub mod countdown;
mod fanout;
mod state;
mod targets;

#[cfg(test)]
mod tests;

pub use adapter::{PlaybackAdapter, PlaybackSession, StepOutcome, StepResult};
pub use controller::PlaybackController;
pub use fanout::{AdapterReport, FanOutReport, Step, fan_out};
pub use state::PlaybackState;
pub use targets::PlaybackTargets;
