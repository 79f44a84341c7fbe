use thiserror::Error;

use super::RemoteError;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{operation} on '{target}' failed: {source}")]
    Remote {
        target: String,
        operation: &'static str,
        #[source]
        source: RemoteError,
    },
    #[error("{operation} on '{target}' failed: {message}")]
    Target {
        target: String,
        operation: &'static str,
        message: String,
    },
}
