use std::fmt;

/// Playback lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    NotReady,
    Preparing,
    Ready,
    Starting,
    Playing(usize),
    Ending,
}

impl PlaybackState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            PlaybackState::NotReady => "NOT_READY",
            PlaybackState::Preparing => "PREPARING",
            PlaybackState::Ready => "READY",
            PlaybackState::Starting => "STARTING",
            PlaybackState::Playing(_) => "PLAYING",
            PlaybackState::Ending => "ENDING",
        }
    }

    /// Transition table. Everything not listed here is rejected.
    #[must_use]
    pub const fn can_transition_to(self, next: PlaybackState) -> bool {
        match (self, next) {
            (PlaybackState::NotReady | PlaybackState::Ready, PlaybackState::Preparing)
            | (PlaybackState::Preparing, PlaybackState::Ready)
            | (PlaybackState::Ready, PlaybackState::Starting)
            | (PlaybackState::Starting, PlaybackState::Playing(0))
            | (PlaybackState::Playing(_), PlaybackState::Ending)
            | (PlaybackState::Ending, PlaybackState::NotReady)
            | (
                PlaybackState::Preparing
                | PlaybackState::Ready
                | PlaybackState::Starting
                | PlaybackState::Playing(_),
                PlaybackState::NotReady,
            ) => true,
            (PlaybackState::Playing(current), PlaybackState::Playing(next)) => {
                matches!(current.checked_add(1), Some(following) if following == next)
            }
            _ => false,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Playing(index) => write!(f, "PLAYING({})", index),
            PlaybackState::NotReady
            | PlaybackState::Preparing
            | PlaybackState::Ready
            | PlaybackState::Starting
            | PlaybackState::Ending => f.write_str(self.name()),
        }
    }
}
