//! Monitor configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitor::SamplingController;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown monitor option `{0}`")]
    UnknownOption(String),
    #[error("option `{key}` expects {expected}, got `{value}`")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("malformed option `{0}`, expected key=value")]
    Malformed(String),
}

/// Settings pushed into a [`SamplingController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Master switch for the monitor
    pub stack_trace: bool,
    /// Sample one event in this many; zero or negative disables the monitor
    pub sample_rate: i32,
    /// Frames to capture per event, clamped to 128 when applied
    pub stack_depth: i32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stack_trace: true,
            sample_rate: 1,
            stack_depth: 0,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with a custom variable source. Unparsable
    /// values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup("LOCKWATCH_STACK_TRACE")
            && let Ok(enabled) = parse_bool("LOCKWATCH_STACK_TRACE", &value)
        {
            config.stack_trace = enabled;
        }

        if let Some(value) = lookup("LOCKWATCH_SAMPLE_RATE")
            && let Ok(rate) = value.trim().parse::<i32>()
        {
            config.sample_rate = rate;
        }

        if let Some(value) = lookup("LOCKWATCH_STACK_DEPTH")
            && let Ok(depth) = value.trim().parse::<i32>()
        {
            config.stack_depth = depth;
        }

        config
    }

    /// Parse an agent option string such as
    /// `monitorSampleRate=10,monitorStackTraceDepth=16`
    pub fn parse_options(options: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge_options(options)?;
        Ok(config)
    }

    /// Override fields from an agent option string
    pub fn merge_options(&mut self, options: &str) -> Result<(), ConfigError> {
        for option in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            let (key, value) = option
                .split_once('=')
                .ok_or_else(|| ConfigError::Malformed(option.to_string()))?;
            let (key, value) = (key.trim(), value.trim());
            match key {
                "monitorStackTrace" => self.stack_trace = parse_bool(key, value)?,
                "monitorSampleRate" => self.sample_rate = parse_int(key, value)?,
                "monitorStackTraceDepth" => self.stack_depth = parse_int(key, value)?,
                _ => return Err(ConfigError::UnknownOption(key.to_string())),
            }
        }
        Ok(())
    }

    /// Push the settings through the controller's setters. The rate goes
    /// after the switch so a non-positive rate always leaves it disabled.
    pub fn apply(&self, sampling: &SamplingController) {
        sampling.set_stack_trace_enabled(self.stack_trace);
        sampling.set_sample_rate(self.sample_rate);
        sampling.set_stack_trace_depth(self.stack_depth);
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a boolean",
        }),
    }
}

fn parse_int(key: &str, value: &str) -> Result<i32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: "an integer",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MAX_TRACE_DEPTH;
    use std::collections::HashMap;

    #[test]
    fn parses_agent_options() {
        let options = "monitorSampleRate=10, monitorStackTraceDepth=16";
        let config = MonitorConfig::parse_options(options).unwrap();
        assert_eq!(
            config,
            MonitorConfig {
                stack_trace: true,
                sample_rate: 10,
                stack_depth: 16,
            }
        );
    }

    #[test]
    fn rejects_bad_options() {
        assert_eq!(
            MonitorConfig::parse_options("monitorFoo=1"),
            Err(ConfigError::UnknownOption("monitorFoo".into()))
        );
        assert_eq!(
            MonitorConfig::parse_options("monitorSampleRate"),
            Err(ConfigError::Malformed("monitorSampleRate".into()))
        );
        assert!(matches!(
            MonitorConfig::parse_options("monitorStackTrace=maybe"),
            Err(ConfigError::InvalidValue {
                expected: "a boolean",
                ..
            })
        ));
    }

    #[test]
    fn env_lookup_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("LOCKWATCH_SAMPLE_RATE", "abc"),
            ("LOCKWATCH_STACK_DEPTH", " 12 "),
            ("LOCKWATCH_STACK_TRACE", "off"),
        ]
        .into_iter()
        .collect();

        let config = MonitorConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()));
        assert_eq!(config.sample_rate, 1);
        assert_eq!(config.stack_depth, 12);
        assert!(!config.stack_trace);
    }

    #[test]
    fn apply_normalizes_values() {
        let sampling = SamplingController::new();
        MonitorConfig {
            stack_trace: true,
            sample_rate: 0,
            stack_depth: 500,
        }
        .apply(&sampling);

        assert!(!sampling.is_enabled());
        assert_eq!(sampling.sample_rate(), 1);
        assert_eq!(sampling.stack_trace_depth(), MAX_TRACE_DEPTH);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: MonitorConfig = serde_json::from_str(r#"{"stack_depth": 4}"#).unwrap();
        assert_eq!(config.stack_depth, 4);
        assert_eq!(config.sample_rate, 1);
        assert!(config.stack_trace);
    }
}
