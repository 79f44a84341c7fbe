mod adapter;
mod app;
mod config;
mod playback;
mod recorder;
mod remote;
mod validation;

#[cfg(test)]
mod test_support;

pub use adapter::AdapterError;
pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use playback::PlaybackError;
pub use recorder::RecorderError;
pub use remote::{RemoteError, RemoteResult};
pub use validation::ValidationError;
