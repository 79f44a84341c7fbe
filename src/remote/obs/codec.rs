use serde::Deserialize;
use serde_json::{Number, Value, json};

use crate::error::{RemoteError, RemoteResult};
use crate::remote::{
    MediaState, MediaStatus, OutputState, RemoteEvent, RemoteRequest, RemoteResponse, SceneItem,
};

use super::protocol::{EventMessage, ResponseMessage};

pub(super) fn request_data(request: &RemoteRequest) -> Value {
    match request {
        RemoteRequest::ToggleReplayBuffer
        | RemoteRequest::SaveReplayBuffer
        | RemoteRequest::GetReplayBufferStatus
        | RemoteRequest::GetProgramScene
        | RemoteRequest::GetSceneList => Value::Null,
        RemoteRequest::SetSceneItemEnabled {
            scene_name,
            scene_item_id,
            enabled,
        } => json!({
            "sceneName": scene_name,
            "sceneItemId": scene_item_id,
            "sceneItemEnabled": enabled,
        }),
        RemoteRequest::SetInputPlaylist { input_name, path } => json!({
            "inputName": input_name,
            "inputSettings": {
                "playlist": [
                    { "hidden": false, "selected": false, "value": path }
                ]
            },
        }),
        RemoteRequest::TriggerMediaAction { input_name, action } => json!({
            "inputName": input_name,
            "mediaAction": action.as_wire(),
        }),
        RemoteRequest::GetMediaStatus { input_name } => json!({ "inputName": input_name }),
        RemoteRequest::SetMediaCursor {
            input_name,
            cursor_ms,
        } => json!({
            "inputName": input_name,
            "mediaCursor": cursor_ms,
        }),
        RemoteRequest::SetProgramScene { scene_name } => json!({ "sceneName": scene_name }),
        RemoteRequest::GetSceneItemList { scene_name } => json!({ "sceneName": scene_name }),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayBufferStatusData {
    output_active: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaStatusData {
    media_state: String,
    #[serde(default)]
    media_cursor: Option<Number>,
    #[serde(default)]
    media_duration: Option<Number>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgramSceneData {
    #[serde(alias = "sceneName")]
    current_program_scene_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneEntry {
    scene_name: String,
}

#[derive(Deserialize)]
struct SceneListData {
    scenes: Vec<SceneEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneItemEntry {
    scene_item_id: i64,
    source_name: String,
    #[serde(default)]
    input_kind: Option<String>,
    #[serde(default)]
    is_group: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneItemListData {
    scene_items: Vec<SceneItemEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputStateData {
    output_active: bool,
    output_state: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaySavedData {
    saved_replay_path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransitionData {
    #[serde(default)]
    transition_name: String,
}

/// Turns a mixer response into the typed response for `request`.
pub(super) fn decode_response(
    request: &RemoteRequest,
    message: ResponseMessage,
) -> RemoteResult<RemoteResponse> {
    let request_type = request.request_type();
    if !message.request_status.result {
        return Err(RemoteError::Request {
            request_type,
            code: message.request_status.code,
            comment: message.request_status.comment.unwrap_or_default(),
        });
    }
    let data = message.response_data.unwrap_or(Value::Null);
    match request {
        RemoteRequest::GetReplayBufferStatus => {
            let data: ReplayBufferStatusData = parse(request_type, data)?;
            Ok(RemoteResponse::ReplayBufferStatus {
                active: data.output_active,
            })
        }
        RemoteRequest::GetMediaStatus { .. } => {
            let data: MediaStatusData = parse(request_type, data)?;
            Ok(RemoteResponse::MediaStatus(MediaStatus {
                state: MediaState::from_wire(&data.media_state),
                cursor_ms: data.media_cursor.as_ref().and_then(non_negative_ms),
                duration_ms: data.media_duration.as_ref().and_then(non_negative_ms),
            }))
        }
        RemoteRequest::GetProgramScene => {
            let data: ProgramSceneData = parse(request_type, data)?;
            Ok(RemoteResponse::ProgramScene {
                scene_name: data.current_program_scene_name,
            })
        }
        RemoteRequest::GetSceneList => {
            let data: SceneListData = parse(request_type, data)?;
            Ok(RemoteResponse::SceneList {
                scenes: data
                    .scenes
                    .into_iter()
                    .map(|scene| scene.scene_name)
                    .collect(),
            })
        }
        RemoteRequest::GetSceneItemList { .. } => {
            let data: SceneItemListData = parse(request_type, data)?;
            Ok(RemoteResponse::SceneItems {
                items: data
                    .scene_items
                    .into_iter()
                    .map(|item| SceneItem {
                        scene_item_id: item.scene_item_id,
                        source_name: item.source_name,
                        input_kind: item.input_kind,
                        is_group: item.is_group.unwrap_or(false),
                    })
                    .collect(),
            })
        }
        RemoteRequest::ToggleReplayBuffer
        | RemoteRequest::SaveReplayBuffer
        | RemoteRequest::SetSceneItemEnabled { .. }
        | RemoteRequest::SetInputPlaylist { .. }
        | RemoteRequest::TriggerMediaAction { .. }
        | RemoteRequest::SetMediaCursor { .. }
        | RemoteRequest::SetProgramScene { .. } => Ok(RemoteResponse::Ack),
    }
}

pub(super) fn decode_event(message: EventMessage) -> RemoteResult<RemoteEvent> {
    let data = message.event_data;
    match message.event_type.as_str() {
        "ReplayBufferStateChanged" => {
            let data: OutputStateData = parse("ReplayBufferStateChanged event", data)?;
            Ok(RemoteEvent::ReplayBufferStateChanged {
                active: data.output_active,
                state: OutputState::from_wire(&data.output_state),
            })
        }
        "ReplayBufferSaved" => {
            let data: ReplaySavedData = parse("ReplayBufferSaved event", data)?;
            Ok(RemoteEvent::ReplayBufferSaved {
                path: data.saved_replay_path,
            })
        }
        "SceneTransitionStarted" => {
            let data: TransitionData = parse("SceneTransitionStarted event", data)?;
            Ok(RemoteEvent::TransitionStarted {
                transition_name: data.transition_name,
            })
        }
        "SceneTransitionEnded" => {
            let data: TransitionData = parse("SceneTransitionEnded event", data)?;
            Ok(RemoteEvent::TransitionEnded {
                transition_name: data.transition_name,
            })
        }
        "SceneListChanged" => {
            let data: SceneListData = parse("SceneListChanged event", data)?;
            Ok(RemoteEvent::SceneListChanged {
                scenes: data
                    .scenes
                    .into_iter()
                    .map(|scene| scene.scene_name)
                    .collect(),
            })
        }
        _ => Ok(RemoteEvent::Other {
            event_type: message.event_type,
        }),
    }
}

fn parse<T>(context: &'static str, data: Value) -> RemoteResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(data).map_err(|err| RemoteError::Decode {
        context,
        source: err,
    })
}

/// Cursor values arrive as JSON numbers that may be fractional or negative
/// while media is unloaded.
fn non_negative_ms(value: &Number) -> Option<u64> {
    if let Some(ms) = value.as_u64() {
        return Some(ms);
    }
    value
        .as_f64()
        .filter(|ms| ms.is_finite() && ms.is_sign_positive())
        .map(|ms| ms.round() as u64)
}
