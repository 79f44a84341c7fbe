use std::time::Duration;

pub const DEFAULT_URL: &str = "ws://localhost:4455";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const DEFAULT_REQUEST_TIMEOUT_ARG: &str = "5s";
pub(crate) const DEFAULT_MAX_BUFFER_ARG: &str = "300s";
pub(crate) const DEFAULT_CHECK_INTERVAL_ARG: &str = "100ms";
