use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Variables consulted for a filter directive, in priority order.
const FILTER_VARS: [&str; 2] = ["LAPREPLAY_LOG", "RUST_LOG"];

/// Websocket internals are chatty at debug level.
const QUIET_TRANSPORT: &str = "tungstenite=warn,tokio_tungstenite=warn";

fn default_directive(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("{},{}", level, QUIET_TRANSPORT)
}

fn build_filter(configured: Option<String>, verbose: bool) -> EnvFilter {
    configured
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose)))
}

/// Installs the global subscriber on stderr, leaving stdout to the console.
/// The filter comes from `LAPREPLAY_LOG`, then `RUST_LOG`, then the
/// verbosity flag. Later calls are no-ops.
pub fn init_logging(verbose: bool, no_color: bool) {
    let configured = FILTER_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok());

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(build_filter(configured, verbose))
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}
