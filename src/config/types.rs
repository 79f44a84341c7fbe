use std::time::Duration;

use serde::Deserialize;

use crate::args::parsers::parse_duration;
use crate::domain::{TransitionInOptions, TransitionOutOptions};
use crate::error::ValidationError;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub connection: Option<ConnectionConfig>,
    pub recorder: Option<RecorderConfig>,
    pub program: Option<TargetConfig>,
    pub preview: Option<TargetConfig>,
    pub convergence: Option<ConvergenceConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub url: Option<String>,
    pub password: Option<String>,
    pub request_timeout: Option<DurationValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecorderConfig {
    pub max_buffer: Option<DurationValue>,
    pub lap_duration_ms: Option<u64>,
    pub limit_margin_ms: Option<u64>,
    pub check_interval: Option<DurationValue>,
    pub auto_save: Option<bool>,
}

/// One replay target: the media source, where it lives and how it takes
/// over the program output.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub scene: Option<String>,
    pub item: Option<String>,
    pub fallback_scene: Option<String>,
    #[serde(rename = "in")]
    pub transition_in: Option<TransitionInOptions>,
    #[serde(rename = "out")]
    pub transition_out: Option<TransitionOutOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvergenceConfig {
    pub load_attempts: Option<u32>,
    pub load_interval: Option<DurationValue>,
    pub pause_attempts: Option<u32>,
    pub pause_interval: Option<DurationValue>,
    pub seek_attempts: Option<u32>,
    pub seek_interval: Option<DurationValue>,
    pub scene_check_attempts: Option<u32>,
    pub scene_check_interval: Option<DurationValue>,
    pub transition_timeout: Option<DurationValue>,
}

/// A duration given either as whole seconds or as `<number>[ms|s|m|h]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration(text),
        }
    }
}
