use serde::Deserialize;

/// How a replay target takes over the program output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransitionInOptions {
    /// Switch the program scene to the replay scene automatically.
    pub auto_transition: bool,
    /// Start playback part-way through the transition instead of after it.
    pub play_before_transition: bool,
    /// Delay between transition start and playback start.
    pub transition_point_ms: Option<u64>,
}

impl Default for TransitionInOptions {
    fn default() -> Self {
        Self {
            auto_transition: true,
            play_before_transition: true,
            transition_point_ms: Some(2000),
        }
    }
}

/// How a replay target hands the program output back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransitionOutOptions {
    pub auto_transition: bool,
    /// Keep the media running while the outgoing transition animates.
    pub keep_playing_during_transition: bool,
    /// Hide the source after this delay instead of waiting for the
    /// transition-ended event.
    pub transition_point_ms: Option<u64>,
}

impl Default for TransitionOutOptions {
    fn default() -> Self {
        Self {
            auto_transition: true,
            keep_playing_during_transition: false,
            transition_point_ms: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    #[serde(rename = "in")]
    pub transition_in: TransitionInOptions,
    #[serde(rename = "out")]
    pub transition_out: TransitionOutOptions,
}
