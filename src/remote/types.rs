/// Commands the orchestration core issues against the mixer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRequest {
    ToggleReplayBuffer,
    SaveReplayBuffer,
    GetReplayBufferStatus,
    SetSceneItemEnabled {
        scene_name: String,
        scene_item_id: i64,
        enabled: bool,
    },
    /// Replaces the playlist of a media input with a single file.
    SetInputPlaylist {
        input_name: String,
        path: String,
    },
    TriggerMediaAction {
        input_name: String,
        action: MediaAction,
    },
    GetMediaStatus {
        input_name: String,
    },
    SetMediaCursor {
        input_name: String,
        cursor_ms: u64,
    },
    SetProgramScene {
        scene_name: String,
    },
    GetProgramScene,
    GetSceneList,
    GetSceneItemList {
        scene_name: String,
    },
}

impl RemoteRequest {
    /// Name of the request on the mixer's wire protocol.
    #[must_use]
    pub const fn request_type(&self) -> &'static str {
        match self {
            RemoteRequest::ToggleReplayBuffer => "ToggleReplayBuffer",
            RemoteRequest::SaveReplayBuffer => "SaveReplayBuffer",
            RemoteRequest::GetReplayBufferStatus => "GetReplayBufferStatus",
            RemoteRequest::SetSceneItemEnabled { .. } => "SetSceneItemEnabled",
            RemoteRequest::SetInputPlaylist { .. } => "SetInputSettings",
            RemoteRequest::TriggerMediaAction { .. } => "TriggerMediaInputAction",
            RemoteRequest::GetMediaStatus { .. } => "GetMediaInputStatus",
            RemoteRequest::SetMediaCursor { .. } => "SetMediaInputCursor",
            RemoteRequest::SetProgramScene { .. } => "SetCurrentProgramScene",
            RemoteRequest::GetProgramScene => "GetCurrentProgramScene",
            RemoteRequest::GetSceneList => "GetSceneList",
            RemoteRequest::GetSceneItemList { .. } => "GetSceneItemList",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResponse {
    Ack,
    ReplayBufferStatus { active: bool },
    MediaStatus(MediaStatus),
    ProgramScene { scene_name: String },
    SceneList { scenes: Vec<String> },
    SceneItems { items: Vec<SceneItem> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    Play,
    Pause,
}

impl MediaAction {
    #[must_use]
    pub const fn as_wire(self) -> &'static str {
        match self {
            MediaAction::Play => "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_PLAY",
            MediaAction::Pause => "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_PAUSE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    None,
    Playing,
    Opening,
    Buffering,
    Paused,
    Stopped,
    Ended,
    Error,
    Unknown,
}

impl MediaState {
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "OBS_MEDIA_STATE_NONE" => MediaState::None,
            "OBS_MEDIA_STATE_PLAYING" => MediaState::Playing,
            "OBS_MEDIA_STATE_OPENING" => MediaState::Opening,
            "OBS_MEDIA_STATE_BUFFERING" => MediaState::Buffering,
            "OBS_MEDIA_STATE_PAUSED" => MediaState::Paused,
            "OBS_MEDIA_STATE_STOPPED" => MediaState::Stopped,
            "OBS_MEDIA_STATE_ENDED" => MediaState::Ended,
            "OBS_MEDIA_STATE_ERROR" => MediaState::Error,
            _ => MediaState::Unknown,
        }
    }
}

/// Media input status as reported by the mixer. Cursor and duration are
/// absent until the input has loaded its media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaStatus {
    pub state: MediaState,
    pub cursor_ms: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl MediaStatus {
    /// Both cursor and duration are known and positive.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(
            (self.cursor_ms, self.duration_ms),
            (Some(cursor), Some(duration)) if cursor > 0 && duration > 0
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneItem {
    pub scene_item_id: i64,
    pub source_name: String,
    pub input_kind: Option<String>,
    pub is_group: bool,
}

/// Output lifecycle reported with buffer-state events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Starting,
    Started,
    Stopping,
    Stopped,
    Other,
}

impl OutputState {
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "OBS_WEBSOCKET_OUTPUT_STARTING" => OutputState::Starting,
            "OBS_WEBSOCKET_OUTPUT_STARTED" => OutputState::Started,
            "OBS_WEBSOCKET_OUTPUT_STOPPING" => OutputState::Stopping,
            "OBS_WEBSOCKET_OUTPUT_STOPPED" => OutputState::Stopped,
            _ => OutputState::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    ReplayBufferStateChanged { active: bool, state: OutputState },
    ReplayBufferSaved { path: String },
    TransitionStarted { transition_name: String },
    TransitionEnded { transition_name: String },
    SceneListChanged { scenes: Vec<String> },
    Other { event_type: String },
}
