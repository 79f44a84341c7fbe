use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error(
        "Autosave margin of {margin_ms} ms must be shorter than the buffer length of {max_buffer_ms} ms."
    )]
    MarginExceedsBuffer { max_buffer_ms: u64, margin_ms: u64 },
    #[error("Deadline check interval must be > 0.")]
    ZeroCheckInterval,
    #[error("Replay buffer cannot be toggled while {status}.")]
    ToggleUnavailable { status: &'static str },
    #[error("Recording controller has been shut down.")]
    ShutDown,
}
