use std::fmt;

use crate::remote::OutputState;

/// Replay buffer status as the operator sees it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BufferStatus {
    #[default]
    NotConnected,
    /// The replay buffer is disabled in the mixer's output settings.
    NotAvailable,
    Fetching,
    NotRecording,
    Starting,
    Recording,
    /// Found running on connect. Laps need a known start, so the buffer has
    /// to be restarted before it can be used.
    AlreadyStarted,
    Processing,
}

impl BufferStatus {
    /// Status implied by an output-state event; `None` for states the
    /// recorder does not track.
    #[must_use]
    pub const fn from_output(state: OutputState) -> Option<Self> {
        match state {
            OutputState::Starting => Some(BufferStatus::Starting),
            OutputState::Started => Some(BufferStatus::Recording),
            OutputState::Stopping => Some(BufferStatus::Processing),
            OutputState::Stopped => Some(BufferStatus::NotRecording),
            OutputState::Other => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            BufferStatus::NotConnected => "NOT_CONNECTED",
            BufferStatus::NotAvailable => "NOT_AVAILABLE",
            BufferStatus::Fetching => "FETCHING",
            BufferStatus::NotRecording => "NOT_RECORDING",
            BufferStatus::Starting => "STARTING",
            BufferStatus::Recording => "RECORDING",
            BufferStatus::AlreadyStarted => "ALREADY_STARTED",
            BufferStatus::Processing => "PROCESSING",
        }
    }

    /// The toggle command is meaningful in this status.
    #[must_use]
    pub const fn can_toggle(self) -> bool {
        matches!(
            self,
            BufferStatus::NotRecording | BufferStatus::Recording | BufferStatus::AlreadyStarted
        )
    }
}

impl fmt::Display for BufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
