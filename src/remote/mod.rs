//! Capability the core uses to talk to the mixer.
//!
//! The orchestration code only sees [`RemoteControl`]; [`obs::ObsClient`] is
//! the production implementation over obs-websocket.
pub mod catalog;
pub mod obs;
mod types;
pub mod wait;

#[cfg(test)]
pub(crate) mod test_support;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::error::{RemoteError, RemoteResult};

pub use types::{
    MediaAction, MediaState, MediaStatus, OutputState, RemoteEvent, RemoteRequest,
    RemoteResponse, SceneItem,
};

/// Request/response channel to the mixer plus its event bus.
#[async_trait]
pub trait RemoteControl: Send + Sync {
    /// Issues one request and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport fails, the request times out, or
    /// the mixer rejects the request.
    async fn call(&self, request: RemoteRequest) -> RemoteResult<RemoteResponse>;

    /// Issues requests in order. Individual failures are reported per
    /// request; the outer error is reserved for transport failures.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch as a whole could not be delivered.
    async fn call_batch(
        &self,
        requests: Vec<RemoteRequest>,
    ) -> RemoteResult<Vec<RemoteResult<RemoteResponse>>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.call(request).await);
        }
        Ok(results)
    }

    /// Subscribes to mixer events. Only events published after this call are
    /// received.
    fn subscribe(&self) -> broadcast::Receiver<RemoteEvent>;

    /// Connection status; `true` while the session is identified.
    fn connection(&self) -> watch::Receiver<bool>;
}

/// Typed helpers over [`RemoteControl::call`].
#[async_trait]
pub trait RemoteControlExt: RemoteControl {
    /// Issues a request whose response carries no data.
    ///
    /// # Errors
    ///
    /// Propagates the request failure.
    async fn command(&self, request: RemoteRequest) -> RemoteResult<()> {
        self.call(request).await.map(drop)
    }

    /// # Errors
    ///
    /// Propagates the request failure or an unexpected response shape.
    async fn media_status(&self, input_name: &str) -> RemoteResult<MediaStatus> {
        let request = RemoteRequest::GetMediaStatus {
            input_name: input_name.to_owned(),
        };
        let request_type = request.request_type();
        match self.call(request).await? {
            RemoteResponse::MediaStatus(status) => Ok(status),
            RemoteResponse::Ack
            | RemoteResponse::ReplayBufferStatus { .. }
            | RemoteResponse::ProgramScene { .. }
            | RemoteResponse::SceneList { .. }
            | RemoteResponse::SceneItems { .. } => {
                Err(RemoteError::UnexpectedResponse { request_type })
            }
        }
    }

    /// # Errors
    ///
    /// Propagates the request failure or an unexpected response shape.
    async fn program_scene(&self) -> RemoteResult<String> {
        let request = RemoteRequest::GetProgramScene;
        let request_type = request.request_type();
        match self.call(request).await? {
            RemoteResponse::ProgramScene { scene_name } => Ok(scene_name),
            RemoteResponse::Ack
            | RemoteResponse::ReplayBufferStatus { .. }
            | RemoteResponse::MediaStatus(_)
            | RemoteResponse::SceneList { .. }
            | RemoteResponse::SceneItems { .. } => {
                Err(RemoteError::UnexpectedResponse { request_type })
            }
        }
    }

    /// # Errors
    ///
    /// Propagates the request failure or an unexpected response shape.
    async fn replay_buffer_active(&self) -> RemoteResult<bool> {
        let request = RemoteRequest::GetReplayBufferStatus;
        let request_type = request.request_type();
        match self.call(request).await? {
            RemoteResponse::ReplayBufferStatus { active } => Ok(active),
            RemoteResponse::Ack
            | RemoteResponse::MediaStatus(_)
            | RemoteResponse::ProgramScene { .. }
            | RemoteResponse::SceneList { .. }
            | RemoteResponse::SceneItems { .. } => {
                Err(RemoteError::UnexpectedResponse { request_type })
            }
        }
    }
}

impl<T: RemoteControl + ?Sized> RemoteControlExt for T {}
