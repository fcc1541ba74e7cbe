//! Process configuration
//!
//! Configuration is read once, from a deserialized document or from the
//! environment, and applied with [`EffexConfig::install`].
//!
//! Environment variables:
//! - `EFFEX_LOG_LEVEL`: minimum log severity (`trace`, `info`, `warn`, `error`, `fatal`)
//! - `EFFEX_STORAGE_BASE_URL`: prefix of URLs handed out by in-memory storage

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Logger, Severity};

pub const LOG_LEVEL_ENV: &str = "EFFEX_LOG_LEVEL";
pub const STORAGE_BASE_URL_ENV: &str = "EFFEX_STORAGE_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffexConfig {
    /// Minimum severity written by the logger (default: INFO)
    #[serde(default = "default_log_level")]
    pub log_level: Severity,

    /// Base URL for in-memory storage URLs (default: "memory://storage")
    #[serde(default = "default_storage_base_url")]
    pub storage_base_url: String,
}

fn default_log_level() -> Severity {
    Severity::Info
}

fn default_storage_base_url() -> String {
    "memory://storage".to_string()
}

impl Default for EffexConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            storage_base_url: default_storage_base_url(),
        }
    }
}

impl EffexConfig {
    /// Reads overrides from the environment.
    ///
    /// Unset variables keep their defaults; an unparseable log level is an
    /// error rather than a silent fallback.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            config.log_level = level.parse()?;
        }
        if let Some(url) = lookup(STORAGE_BASE_URL_ENV) {
            config.storage_base_url = url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    /// Applies the configuration to process-wide state.
    pub fn install(&self) {
        Logger::set_min_severity(self.log_level);
        log_event_with_fields(
            Event::ConfigInstalled,
            &[
                ("log_level", self.log_level.as_str()),
                ("storage_base_url", &self.storage_base_url),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EffexConfig::default();
        assert_eq!(config.log_level, Severity::Info);
        assert_eq!(config.storage_base_url, "memory://storage");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: EffexConfig = serde_json::from_str(r#"{"log_level":"TRACE"}"#).unwrap();
        assert_eq!(config.log_level, Severity::Trace);
        assert_eq!(config.storage_base_url, "memory://storage");
    }

    #[test]
    fn test_env_overrides() {
        let config = EffexConfig::from_lookup(lookup(&[
            (LOG_LEVEL_ENV, "warn"),
            (STORAGE_BASE_URL_ENV, "https://files.example.com/"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, Severity::Warn);
        assert_eq!(config.storage_base_url, "https://files.example.com");
    }

    #[test]
    fn test_env_bad_level() {
        assert!(EffexConfig::from_lookup(lookup(&[(LOG_LEVEL_ENV, "loud")])).is_err());
    }
}
