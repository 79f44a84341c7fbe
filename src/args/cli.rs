use clap::Parser;
use std::time::Duration;

use super::defaults::{
    DEFAULT_CHECK_INTERVAL_ARG, DEFAULT_MAX_BUFFER_ARG, DEFAULT_REQUEST_TIMEOUT_ARG, DEFAULT_URL,
};
use super::parsers::{parse_bool_env, parse_duration_arg};
use crate::recorder::{DEFAULT_LAP_DURATION_MS, DEFAULT_LIMIT_MARGIN_MS};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Lap-marked instant replay for OBS: mark laps on the replay buffer, then play the saved segments back through mixer media sources with coordinated scene transitions."
)]
pub struct ReplayArgs {
    /// Path to config file (TOML or JSON). Defaults to lapreplay.toml or lapreplay.json if present
    #[arg(long = "config", short = 'c')]
    pub config: Option<String>,

    /// obs-websocket URL
    #[arg(long = "url", short = 'u', default_value = DEFAULT_URL)]
    pub url: String,

    /// obs-websocket password
    #[arg(long = "password", env = "LAPREPLAY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Timeout for each mixer request (supports ms/s/m/h)
    #[arg(
        long = "request-timeout",
        default_value = DEFAULT_REQUEST_TIMEOUT_ARG,
        value_parser = parse_duration_arg
    )]
    pub request_timeout: Duration,

    /// Length of the mixer's replay buffer (supports ms/s/m/h)
    #[arg(
        long = "max-buffer",
        default_value = DEFAULT_MAX_BUFFER_ARG,
        value_parser = parse_duration_arg
    )]
    pub max_buffer: Duration,

    /// Look-back window of each lap in milliseconds
    #[arg(long = "lap-duration-ms", default_value_t = DEFAULT_LAP_DURATION_MS)]
    pub lap_duration_ms: u64,

    /// Force a save this many milliseconds before the buffer would overflow
    #[arg(long = "limit-margin-ms", default_value_t = DEFAULT_LIMIT_MARGIN_MS)]
    pub limit_margin_ms: u64,

    /// How often the autosave deadline is checked (supports ms/s/m/h)
    #[arg(
        long = "check-interval",
        default_value = DEFAULT_CHECK_INTERVAL_ARG,
        value_parser = parse_duration_arg
    )]
    pub check_interval: Duration,

    /// Save automatically when the buffer limit is near (true/false)
    #[arg(
        long = "auto-save",
        env = "LAPREPLAY_AUTO_SAVE",
        default_value = "true",
        action = clap::ArgAction::Set,
        value_parser = parse_bool_env
    )]
    pub auto_save: bool,

    /// Scene holding the program replay source
    #[arg(long = "scene")]
    pub scene: Option<String>,

    /// Media source used for program playback
    #[arg(long = "item")]
    pub item: Option<String>,

    /// Scene to return to after a replay (defaults to the program scene at startup)
    #[arg(long = "fallback-scene")]
    pub fallback_scene: Option<String>,

    /// Scene holding the preview replay source
    #[arg(long = "preview-scene", requires = "preview_item")]
    pub preview_scene: Option<String>,

    /// Media source used for preview playback
    #[arg(long = "preview-item", requires = "preview_scene")]
    pub preview_item: Option<String>,

    /// Start with playback limited to the preview target
    #[arg(long = "preview-only")]
    pub preview_only: bool,

    /// Enable debug logging
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,
}
