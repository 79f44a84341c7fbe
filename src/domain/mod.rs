//! Plain data shared by the recorder, the playback controller and adapters.
mod options;
mod replay;
pub mod time;

pub use options::{AdapterOptions, TransitionInOptions, TransitionOutOptions};
pub use replay::{LapMarker, PlayQueue, PlayQueueItem, RemoteTargetSource, Replay};
