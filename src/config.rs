// src/config.rs

use crate::core::error::ConfigError;
use crate::core::narrative::{SummarizerSettings, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::core::orchestrator::DEFAULT_MAX_CONCURRENT_CHECKS;
use crate::core::target::PortRange;
use crate::logging::PROJECT_NAME;
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

lazy_static! {
    pub static ref ENV_PREFIX: String = format!("{}_", PROJECT_NAME.as_str());
}

/// Variable holding the summarizer credential. Not prefixed, so an existing
/// OpenAI setup is picked up as is.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Runtime settings, read from `VANGUARD_RECON_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ports: PortRange,
    pub probe_timeout: Duration,
    pub scan_timeout: Duration,
    pub summarizer_timeout: Duration,
    pub max_concurrent_checks: usize,
    pub nmap_path: PathBuf,
    pub os_detection: bool,
    pub summarizer_endpoint: String,
    pub summarizer_model: String,
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ports: PortRange::default(),
            probe_timeout: Duration::from_secs(5),
            scan_timeout: Duration::from_secs(300),
            summarizer_timeout: Duration::from_secs(30),
            max_concurrent_checks: DEFAULT_MAX_CONCURRENT_CHECKS,
            nmap_path: PathBuf::from("nmap"),
            os_detection: true,
            summarizer_endpoint: DEFAULT_ENDPOINT.to_string(),
            summarizer_model: DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`, which maps full variable names to values.
    /// Unset or blank variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            let key = format!("{}{name}", ENV_PREFIX.as_str());
            lookup(&key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).map(|v| (key, v))
        };
        let mut config = Config::default();

        if let Some((key, value)) = read("PORTS") {
            config.ports = PortRange::from_str(&value).map_err(|e| invalid(&key, &value, e))?;
        }
        if let Some((key, value)) = read("PROBE_TIMEOUT_SECS") {
            config.probe_timeout = seconds(&key, &value)?;
        }
        if let Some((key, value)) = read("SCAN_TIMEOUT_SECS") {
            config.scan_timeout = seconds(&key, &value)?;
        }
        if let Some((key, value)) = read("SUMMARIZER_TIMEOUT_SECS") {
            config.summarizer_timeout = seconds(&key, &value)?;
        }
        if let Some((key, value)) = read("MAX_CONCURRENT_CHECKS") {
            config.max_concurrent_checks = positive(&key, &value)?;
        }
        if let Some((_, value)) = read("NMAP_PATH") {
            config.nmap_path = PathBuf::from(value);
        }
        if let Some((key, value)) = read("OS_DETECTION") {
            config.os_detection = flag(&key, &value)?;
        }
        if let Some((key, value)) = read("SUMMARIZER_ENDPOINT") {
            url::Url::parse(&value).map_err(|e| invalid(&key, &value, e))?;
            config.summarizer_endpoint = value;
        }
        if let Some((_, value)) = read("SUMMARIZER_MODEL") {
            config.summarizer_model = value;
        }
        config.api_key = lookup(API_KEY_ENV).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(config)
    }

    pub fn summarizer_settings(&self) -> SummarizerSettings {
        SummarizerSettings {
            endpoint: self.summarizer_endpoint.clone(),
            model: self.summarizer_model.clone(),
            timeout: self.summarizer_timeout,
        }
    }
}

fn invalid(key: &str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError { key: key.to_string(), value: value.to_string(), reason: reason.to_string() }
}

fn positive(key: &str, value: &str) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(0) => Err(invalid(key, value, "must be greater than zero")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(key, value, e)),
    }
}

fn seconds(key: &str, value: &str) -> Result<Duration, ConfigError> {
    positive(key, value).map(|secs| Duration::from_secs(secs as u64))
}

fn flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}
