//! Name lookups against the mixer's scene graph.
use crate::domain::RemoteTargetSource;
use crate::error::{RemoteError, RemoteResult};

use super::{RemoteControl, RemoteRequest, RemoteResponse, SceneItem};

/// Lists scene names in the order the mixer reports them.
///
/// # Errors
///
/// Propagates the request failure or an unexpected response shape.
pub async fn list_scenes(remote: &dyn RemoteControl) -> RemoteResult<Vec<String>> {
    let request = RemoteRequest::GetSceneList;
    let request_type = request.request_type();
    match remote.call(request).await? {
        RemoteResponse::SceneList { scenes } => Ok(scenes),
        RemoteResponse::Ack
        | RemoteResponse::ReplayBufferStatus { .. }
        | RemoteResponse::MediaStatus(_)
        | RemoteResponse::ProgramScene { .. }
        | RemoteResponse::SceneItems { .. } => {
            Err(RemoteError::UnexpectedResponse { request_type })
        }
    }
}

/// Lists the items placed in `scene_name`.
///
/// # Errors
///
/// Propagates the request failure or an unexpected response shape.
pub async fn list_scene_items(
    remote: &dyn RemoteControl,
    scene_name: &str,
) -> RemoteResult<Vec<SceneItem>> {
    let request = RemoteRequest::GetSceneItemList {
        scene_name: scene_name.to_owned(),
    };
    let request_type = request.request_type();
    match remote.call(request).await? {
        RemoteResponse::SceneItems { items } => Ok(items),
        RemoteResponse::Ack
        | RemoteResponse::ReplayBufferStatus { .. }
        | RemoteResponse::MediaStatus(_)
        | RemoteResponse::ProgramScene { .. }
        | RemoteResponse::SceneList { .. } => {
            Err(RemoteError::UnexpectedResponse { request_type })
        }
    }
}

/// Resolves a configured scene/item pair to the identity the adapter drives.
///
/// # Errors
///
/// Returns `SourceNotFound` when `item_name` is not placed in `scene_name`,
/// or propagates the request failure.
pub async fn resolve_target(
    remote: &dyn RemoteControl,
    scene_name: &str,
    item_name: &str,
) -> RemoteResult<RemoteTargetSource> {
    let items = list_scene_items(remote, scene_name).await?;
    items
        .into_iter()
        .find(|item| item.source_name == item_name && !item.is_group)
        .map(|item| RemoteTargetSource {
            scene_name: scene_name.to_owned(),
            item_name: item.source_name,
            scene_item_id: item.scene_item_id,
        })
        .ok_or_else(|| RemoteError::SourceNotFound {
            scene: scene_name.to_owned(),
            item: item_name.to_owned(),
        })
}
