//! Configuration management for the TrackBridge DIS-to-CoT bridge.
//!
//! This module provides a configuration system that supports:
//! - Loading from YAML files
//! - Environment variable overrides (`TRACKBRIDGE__COT__PORT=4343`)
//! - Validation of all settings
//!
//! Configuration is passed explicitly into each component at construction.
//! The only runtime mutations are the sender target and the heartbeat interval.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Main application configuration.
///
/// # Examples
///
/// ```no_run
/// use trackbridge_core::config::AppConfig;
///
/// let config = AppConfig::from_file("config.yaml").unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Inbound DIS listener settings
    #[serde(default)]
    pub dis: DisConfig,

    /// Outbound CoT settings
    #[serde(default)]
    pub cot: CotConfig,

    /// Heartbeat timer settings
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// CoT history journal settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Forwarding filter
    #[serde(default)]
    pub filter: FilterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration using the `config` crate: the YAML file, then
    /// environment variables prefixed with `TRACKBRIDGE`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or merged.
    pub fn from_config_builder<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            // TRACKBRIDGE__DIS__PORT=3001
            .add_source(
                config::Environment::with_prefix("TRACKBRIDGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.dis.validate()?;
        self.cot.validate()?;
        self.heartbeat.validate()?;
        self.logging.parse_level()?;
        Ok(())
    }
}

/// Inbound DIS listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisConfig {
    /// Address to listen on; a multicast address is joined as a group
    #[serde(default = "default_dis_ip")]
    pub bind_ip: String,

    /// UDP port for Entity State PDUs
    #[serde(default = "default_dis_port")]
    pub port: u16,

    /// Receive buffer size in bytes
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
}

fn default_dis_ip() -> String {
    "224.0.0.1".to_string()
}

fn default_dis_port() -> u16 {
    3000
}

fn default_recv_buffer_size() -> usize {
    65536
}

impl Default for DisConfig {
    fn default() -> Self {
        Self {
            bind_ip: default_dis_ip(),
            port: default_dis_port(),
            recv_buffer_size: default_recv_buffer_size(),
        }
    }
}

impl DisConfig {
    /// Parses the bind address.
    pub fn parse_ip(&self) -> Result<Ipv4Addr> {
        parse_ipv4("dis.bind_ip", &self.bind_ip)
    }

    fn validate(&self) -> Result<()> {
        self.parse_ip()?;
        if self.recv_buffer_size < 48 {
            return Err(ConfigError::invalid_value(
                "dis.recv_buffer_size",
                "must hold at least one Entity State PDU header (48 bytes)",
            )
            .into());
        }
        Ok(())
    }
}

/// Outbound CoT configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CotConfig {
    /// Destination address (unicast or multicast)
    #[serde(default = "default_cot_ip")]
    pub target_ip: String,

    /// Destination UDP port
    #[serde(default = "default_cot_port")]
    pub port: u16,

    /// Prefix of every generated event uid
    #[serde(default = "default_product_name")]
    pub uid_prefix: String,

    /// Callsign used by the heartbeat ping
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Seconds between `time` and `stale`
    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,

    /// TTL for multicast sends
    #[serde(default = "default_multicast_ttl")]
    pub multicast_ttl: u32,
}

fn default_cot_ip() -> String {
    "224.0.0.2".to_string()
}

fn default_cot_port() -> u16 {
    4242
}

fn default_product_name() -> String {
    "TrackBridge".to_string()
}

fn default_stale_secs() -> u64 {
    30
}

fn default_multicast_ttl() -> u32 {
    1
}

impl Default for CotConfig {
    fn default() -> Self {
        Self {
            target_ip: default_cot_ip(),
            port: default_cot_port(),
            uid_prefix: default_product_name(),
            product_name: default_product_name(),
            stale_secs: default_stale_secs(),
            multicast_ttl: default_multicast_ttl(),
        }
    }
}

impl CotConfig {
    /// Parses the target address. The sender socket is IPv4 only.
    pub fn parse_ip(&self) -> Result<Ipv4Addr> {
        parse_ipv4("cot.target_ip", &self.target_ip)
    }

    /// Stale window as a Duration.
    pub fn stale(&self) -> Duration {
        Duration::from_secs(self.stale_secs)
    }

    fn validate(&self) -> Result<()> {
        self.parse_ip()?;
        if self.port == 0 {
            return Err(ConfigError::invalid_value("cot.port", "must be non-zero").into());
        }
        if self.uid_prefix.trim().is_empty() {
            return Err(ConfigError::invalid_value("cot.uid_prefix", "must not be empty").into());
        }
        if self.stale_secs == 0 {
            return Err(ConfigError::invalid_value("cot.stale_secs", "must be positive").into());
        }
        Ok(())
    }
}

/// Heartbeat timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between pings
    #[serde(default = "default_heartbeat_secs")]
    pub interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_heartbeat_secs() -> u64 {
    30
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_heartbeat_secs(),
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(
                ConfigError::invalid_value("heartbeat.interval_secs", "must be positive").into(),
            );
        }
        Ok(())
    }
}

/// CoT history journal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Append-only journal file
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

fn default_history_path() -> PathBuf {
    PathBuf::from("cot_history.log")
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_history_path(),
        }
    }
}

/// Forwarding filter applied before a track is encoded.
///
/// Empty lists match everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Skip tracks whose publish flag is cleared
    #[serde(default = "default_true")]
    pub publish_only: bool,

    /// Raw DIS domain bytes to forward
    #[serde(default)]
    pub allowed_domains: Vec<u8>,

    /// Affiliations to forward ("Friendly", "Enemy", ...)
    #[serde(default)]
    pub allowed_track_types: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            publish_only: true,
            allowed_domains: Vec::new(),
            allowed_track_types: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Invalid log level: {}", self.level),
            }
            .into()
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}

fn parse_ipv4(field: &str, value: &str) -> Result<Ipv4Addr> {
    value.trim().parse().map_err(|_| {
        ConfigError::invalid_value(field, format!("not an IPv4 address: {}", value)).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.dis.bind_ip, "224.0.0.1");
        assert_eq!(config.dis.port, 3000);
        assert_eq!(config.cot.target_ip, "224.0.0.2");
        assert_eq!(config.cot.port, 4242);
        assert_eq!(config.heartbeat.interval(), Duration::from_secs(30));
        assert_eq!(config.history.path, PathBuf::from("cot_history.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
dis:
  bind_ip: 0.0.0.0
  port: 3001

cot:
  target_ip: 192.168.1.50
  port: 6969
  uid_prefix: Range7

heartbeat:
  interval_secs: 10

filter:
  allowed_domains: [1, 2]
  allowed_track_types: [Friendly]

logging:
  level: debug
  format: json
"#;

        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.dis.parse_ip().unwrap(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(config.dis.port, 3001);
        assert_eq!(config.cot.port, 6969);
        assert_eq!(config.cot.uid_prefix, "Range7");
        assert_eq!(config.cot.product_name, "TrackBridge");
        assert_eq!(config.heartbeat.interval_secs, 10);
        assert!(config.heartbeat.enabled);
        assert_eq!(config.filter.allowed_domains, vec![1, 2]);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.cot.target_ip = "tak-server".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cot.target_ip = "::1".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cot.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.heartbeat.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cot.uid_prefix = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cot:\n  port: 5000").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cot.port, 5000);
        assert_eq!(config.dis.port, 3000);
    }

    #[test]
    fn test_from_file_missing() {
        let err = AppConfig::from_file("/nonexistent/trackbridge.yaml").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
