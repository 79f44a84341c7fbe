use thiserror::Error;

/// Request status code the mixer returns when an output (such as the replay
/// buffer) is disabled in its settings.
pub const INVALID_RESOURCE_STATE: u16 = 604;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid mixer URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Connection error to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    #[error("WebSocket error during {context}: {source}")]
    Socket {
        context: &'static str,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    #[error("Handshake failed: expected {expected}.")]
    UnexpectedHandshake { expected: &'static str },
    #[error("Mixer requires authentication but no password was provided.")]
    AuthenticationRequired,
    #[error("Timed out waiting for {stage}.")]
    HandshakeTimeout { stage: &'static str },
    #[error("Connection closed.")]
    ConnectionClosed,
    #[error("Request {request_type} timed out.")]
    Timeout { request_type: &'static str },
    #[error("Request {request_type} failed with status {code}: {comment}")]
    Request {
        request_type: &'static str,
        code: u16,
        comment: String,
    },
    #[error("Failed to encode {context}: {source}")]
    Encode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unexpected response to {request_type}.")]
    UnexpectedResponse { request_type: &'static str },
    #[error("Batch returned {actual} results for {expected} requests.")]
    BatchLength { expected: usize, actual: usize },
    #[error("Source '{item}' not found in scene '{scene}'.")]
    SourceNotFound { scene: String, item: String },
}

pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    /// Request status code reported by the mixer, when the failure came from
    /// a rejected request rather than the transport.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            RemoteError::Request { code, .. } => Some(*code),
            RemoteError::InvalidUrl { .. }
            | RemoteError::Connect { .. }
            | RemoteError::Socket { .. }
            | RemoteError::UnexpectedHandshake { .. }
            | RemoteError::AuthenticationRequired
            | RemoteError::HandshakeTimeout { .. }
            | RemoteError::ConnectionClosed
            | RemoteError::Timeout { .. }
            | RemoteError::Encode { .. }
            | RemoteError::Decode { .. }
            | RemoteError::UnexpectedResponse { .. }
            | RemoteError::BatchLength { .. }
            | RemoteError::SourceNotFound { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_unavailable_output(&self) -> bool {
        matches!(self.status_code(), Some(INVALID_RESOURCE_STATE))
    }
}
