use thiserror::Error;

use super::{
    AdapterError, ConfigError, PlaybackError, RecorderError, RemoteError, ValidationError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("TOML error: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },
    #[error("Join error: {source}")]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),
    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<ValidationError>,
    {
        error.into().into()
    }

    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    pub fn remote<E>(error: E) -> Self
    where
        E: Into<RemoteError>,
    {
        error.into().into()
    }

    pub fn playback<E>(error: E) -> Self
    where
        E: Into<PlaybackError>,
    {
        error.into().into()
    }
}
