//! Playback adapters for concrete render targets.
pub mod remote_media;

pub use remote_media::{ConvergenceSettings, RemoteMediaAdapter, RemoteMediaConfig, SourceLocks};
