use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Cannot go from {from} to {to}.")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("Play queue is empty.")]
    EmptyQueue,
    #[error("Queue index {index} is out of range (queue length {len}).")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Cannot change {what} while a replay session is active ({state}).")]
    SessionActive {
        what: &'static str,
        state: &'static str,
    },
    #[error("Playback run was aborted.")]
    Aborted,
    #[error("Playback controller has been shut down.")]
    ShutDown,
}
