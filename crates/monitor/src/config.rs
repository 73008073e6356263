//! Monitor configuration
//!
//! Layered settings: optional YAML file (path from MONITOR_CONFIG, default
//! config.yaml), overridden by MONITOR__* environment variables. The nested
//! `monitor` section is the library's own validated configuration.

use anyhow::{Context, Result};
use monitor_lib::config::MonitorConfig;
use serde::Deserialize;

/// Top-level settings for the monitor binary
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub jmx: JmxSettings,
    #[serde(default)]
    pub access_log: AccessLogSettings,
    #[serde(default)]
    pub webhook: WebhookSettings,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// HTTP API server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

/// JMX endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct JmxSettings {
    #[serde(default = "default_jmx_host")]
    pub host: String,
    #[serde(default = "default_jmx_port")]
    pub port: u16,
    #[serde(default = "default_jmx_timeout")]
    pub connection_timeout_secs: u64,
}

fn default_jmx_host() -> String {
    "localhost".to_string()
}

fn default_jmx_port() -> u16 {
    9010
}

fn default_jmx_timeout() -> u64 {
    10
}

impl Default for JmxSettings {
    fn default() -> Self {
        Self {
            host: default_jmx_host(),
            port: default_jmx_port(),
            connection_timeout_secs: default_jmx_timeout(),
        }
    }
}

/// Access log tailing settings
#[derive(Debug, Clone, Deserialize)]
pub struct AccessLogSettings {
    #[serde(default = "default_access_log_path")]
    pub path: String,
    #[serde(default = "default_slow_request_threshold")]
    pub slow_request_threshold_ms: u64,
}

fn default_access_log_path() -> String {
    "/var/log/tomcat/access.log".to_string()
}

fn default_slow_request_threshold() -> u64 {
    5000
}

impl Default for AccessLogSettings {
    fn default() -> Self {
        Self {
            path: default_access_log_path(),
            slow_request_threshold_ms: default_slow_request_threshold(),
        }
    }
}

/// Webhook alert channel settings
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_webhook_method")]
    pub method: String,
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

fn default_webhook_method() -> String {
    "POST".to_string()
}

fn default_webhook_timeout() -> u64 {
    10
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            method: default_webhook_method(),
            timeout_secs: default_webhook_timeout(),
            headers: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from the config file and environment, then validate.
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("MONITOR_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(config::Environment::with_prefix("MONITOR").separator("__"))
            .build()
            .context("failed to build configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        settings
            .monitor
            .validate()
            .context("invalid monitoring configuration")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.jmx.host, "localhost");
        assert_eq!(settings.jmx.port, 9010);
        assert_eq!(settings.access_log.slow_request_threshold_ms, 5000);
        assert!(!settings.webhook.enabled);
        assert!(settings.monitor.validate().is_ok());
    }
}
