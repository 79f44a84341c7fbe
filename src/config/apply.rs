use std::time::Duration;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::ReplayArgs;
use crate::error::{AppError, AppResult, ConfigError};

use super::types::{ConfigFile, DurationValue, TargetConfig};

/// Values given on the command line or through the environment win over the
/// config file.
pub(super) fn is_explicit(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

pub(super) fn duration_field(value: &DurationValue, field: &'static str) -> AppResult<Duration> {
    value
        .to_duration()
        .map_err(|source| AppError::config(ConfigError::InvalidDuration { field, source }))
}

pub(super) fn positive_u32(value: u32, field: &'static str) -> AppResult<u32> {
    if value == 0 {
        return Err(AppError::config(ConfigError::FieldMustBePositive { field }));
    }
    Ok(value)
}

/// Applies configuration values to CLI arguments.
///
/// # Errors
///
/// Returns an error when a config value is invalid.
pub fn apply_config(
    args: &mut ReplayArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if let Some(connection) = config.connection.as_ref() {
        if !is_explicit(matches, "url")
            && let Some(url) = connection.url.clone()
        {
            args.url = url;
        }

        if !is_explicit(matches, "password")
            && let Some(password) = connection.password.clone()
        {
            args.password = Some(password);
        }

        if !is_explicit(matches, "request_timeout")
            && let Some(timeout) = connection.request_timeout.as_ref()
        {
            args.request_timeout = duration_field(timeout, "connection.request_timeout")?;
        }
    }

    if let Some(recorder) = config.recorder.as_ref() {
        if !is_explicit(matches, "max_buffer")
            && let Some(max_buffer) = recorder.max_buffer.as_ref()
        {
            args.max_buffer = duration_field(max_buffer, "recorder.max_buffer")?;
        }

        if !is_explicit(matches, "lap_duration_ms")
            && let Some(lap_duration_ms) = recorder.lap_duration_ms
        {
            if lap_duration_ms == 0 {
                return Err(AppError::config(ConfigError::FieldMustBePositive {
                    field: "recorder.lap_duration_ms",
                }));
            }
            args.lap_duration_ms = lap_duration_ms;
        }

        if !is_explicit(matches, "limit_margin_ms")
            && let Some(limit_margin_ms) = recorder.limit_margin_ms
        {
            args.limit_margin_ms = limit_margin_ms;
        }

        if !is_explicit(matches, "check_interval")
            && let Some(interval) = recorder.check_interval.as_ref()
        {
            args.check_interval = duration_field(interval, "recorder.check_interval")?;
        }

        if !is_explicit(matches, "auto_save")
            && let Some(auto_save) = recorder.auto_save
        {
            args.auto_save = auto_save;
        }
    }

    if let Some(program) = config.program.as_ref() {
        apply_target(
            matches,
            program,
            ("scene", &mut args.scene),
            ("item", &mut args.item),
        );
        if !is_explicit(matches, "fallback_scene")
            && let Some(fallback) = program.fallback_scene.clone()
        {
            args.fallback_scene = Some(fallback);
        }
    }

    if let Some(preview) = config.preview.as_ref() {
        apply_target(
            matches,
            preview,
            ("preview_scene", &mut args.preview_scene),
            ("preview_item", &mut args.preview_item),
        );
    }

    Ok(())
}

fn apply_target(
    matches: &ArgMatches,
    config: &TargetConfig,
    scene: (&str, &mut Option<String>),
    item: (&str, &mut Option<String>),
) {
    let (scene_arg, scene_slot) = scene;
    if !is_explicit(matches, scene_arg)
        && let Some(value) = config.scene.clone()
    {
        *scene_slot = Some(value);
    }
    let (item_arg, item_slot) = item;
    if !is_explicit(matches, item_arg)
        && let Some(value) = config.item.clone()
    {
        *item_slot = Some(value);
    }
}
