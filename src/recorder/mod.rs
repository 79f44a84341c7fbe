//! Replay buffer lifecycle, lap capture and autosave near the buffer limit.
//!
//! Status is driven by an initial fetch and the mixer's buffer events. Laps
//! are only taken while recording; a save moves them into a stash that the
//! next saved event turns into a [`crate::domain::Replay`].
mod controller;
mod settings;
mod status;


pub use controller::{RecordingController, SaveOutcome};
pub use settings::{
    DEFAULT_CHECK_INTERVAL, DEFAULT_LAP_DURATION_MS, DEFAULT_LIMIT_MARGIN_MS, DEFAULT_MAX_BUFFER,
    RecorderSettings,
};
pub use status::BufferStatus;
