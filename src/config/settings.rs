use std::time::Duration;

use crate::adapters::ConvergenceSettings;
use crate::args::ReplayArgs;
use crate::domain::AdapterOptions;
use crate::error::{AppError, AppResult, ConfigError};
use crate::recorder::RecorderSettings;
use crate::sync::RetryPolicy;

use super::apply::{duration_field, positive_u32};
use super::types::{ConfigFile, ConvergenceConfig, DurationValue, TargetConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub url: String,
    pub password: Option<String>,
    pub request_timeout: Duration,
}

/// A configured replay target before its scene item is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSettings {
    pub role: &'static str,
    pub scene: String,
    pub item: String,
    /// `None` means the program scene found at startup.
    pub fallback_scene: Option<String>,
    pub options: AdapterOptions,
}

/// Everything the binary needs, merged from CLI, environment and config file.
#[derive(Debug, Clone)]
pub struct ReplaySettings {
    pub connection: ConnectionSettings,
    pub recorder: RecorderSettings,
    pub program: TargetSettings,
    pub preview: Option<TargetSettings>,
    pub preview_only: bool,
    pub convergence: ConvergenceSettings,
}

impl ReplaySettings {
    /// Builds the settings from arguments that already had the config file
    /// applied, plus the config sections that have no CLI equivalent.
    ///
    /// # Errors
    ///
    /// Returns an error when a target is missing or incomplete, or when a
    /// value is out of range.
    pub fn resolve(args: &ReplayArgs, config: Option<&ConfigFile>) -> AppResult<Self> {
        let program_config = config.and_then(|config| config.program.as_ref());
        let preview_config = config.and_then(|config| config.preview.as_ref());

        let program = match (args.scene.clone(), args.item.clone()) {
            (Some(scene), Some(item)) => TargetSettings {
                role: "program",
                scene,
                item,
                fallback_scene: args.fallback_scene.clone(),
                options: target_options(program_config),
            },
            (None, None) => return Err(AppError::config(ConfigError::MissingProgramTarget)),
            (Some(_), None) | (None, Some(_)) => {
                return Err(AppError::config(ConfigError::IncompleteTarget { role: "program" }));
            }
        };

        let preview = match (args.preview_scene.clone(), args.preview_item.clone()) {
            (Some(scene), Some(item)) => Some(TargetSettings {
                role: "preview",
                scene,
                item,
                fallback_scene: preview_config
                    .and_then(|preview| preview.fallback_scene.clone())
                    .or_else(|| program.fallback_scene.clone()),
                options: target_options(preview_config),
            }),
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => {
                return Err(AppError::config(ConfigError::IncompleteTarget { role: "preview" }));
            }
        };
        if args.preview_only && preview.is_none() {
            return Err(AppError::config(ConfigError::PreviewOnlyWithoutPreview));
        }

        let recorder = RecorderSettings {
            max_buffer: args.max_buffer,
            lap_duration_ms: args.lap_duration_ms,
            limit_margin_ms: args.limit_margin_ms,
            check_interval: args.check_interval,
            auto_save: args.auto_save,
        };
        recorder.validate()?;

        let convergence = match config.and_then(|config| config.convergence.as_ref()) {
            Some(convergence) => convergence_settings(convergence)?,
            None => ConvergenceSettings::default(),
        };

        Ok(Self {
            connection: ConnectionSettings {
                url: args.url.clone(),
                password: args.password.clone(),
                request_timeout: args.request_timeout,
            },
            recorder,
            program,
            preview,
            preview_only: args.preview_only,
            convergence,
        })
    }
}

fn target_options(config: Option<&TargetConfig>) -> AdapterOptions {
    let mut options = AdapterOptions::default();
    if let Some(config) = config {
        if let Some(transition_in) = config.transition_in {
            options.transition_in = transition_in;
        }
        if let Some(transition_out) = config.transition_out {
            options.transition_out = transition_out;
        }
    }
    options
}

fn policy(
    base: RetryPolicy,
    attempts: Option<u32>,
    interval: Option<&DurationValue>,
    fields: (&'static str, &'static str),
) -> AppResult<RetryPolicy> {
    let (attempts_field, interval_field) = fields;
    let max_attempts = match attempts {
        Some(attempts) => positive_u32(attempts, attempts_field)?,
        None => base.max_attempts,
    };
    let interval = match interval {
        Some(interval) => duration_field(interval, interval_field)?,
        None => base.interval,
    };
    Ok(RetryPolicy::new(max_attempts, interval))
}

fn convergence_settings(config: &ConvergenceConfig) -> AppResult<ConvergenceSettings> {
    let defaults = ConvergenceSettings::default();
    Ok(ConvergenceSettings {
        load: policy(
            defaults.load,
            config.load_attempts,
            config.load_interval.as_ref(),
            ("convergence.load_attempts", "convergence.load_interval"),
        )?,
        pause: policy(
            defaults.pause,
            config.pause_attempts,
            config.pause_interval.as_ref(),
            ("convergence.pause_attempts", "convergence.pause_interval"),
        )?,
        seek_verify: policy(
            defaults.seek_verify,
            config.seek_attempts,
            config.seek_interval.as_ref(),
            ("convergence.seek_attempts", "convergence.seek_interval"),
        )?,
        scene_check: policy(
            defaults.scene_check,
            config.scene_check_attempts,
            config.scene_check_interval.as_ref(),
            (
                "convergence.scene_check_attempts",
                "convergence.scene_check_interval",
            ),
        )?,
        transition_timeout: match config.transition_timeout.as_ref() {
            Some(timeout) => Some(duration_field(timeout, "convergence.transition_timeout")?),
            None => defaults.transition_timeout,
        },
    })
}
