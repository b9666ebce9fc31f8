//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;
use super::validation::{self, ValidationError};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Daemon configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Target list persistence.
    #[serde(default)]
    pub store: StoreConfig,
    /// Notification and acknowledgment behavior.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Bridge listener.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Prometheus endpoint.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        validation::validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

/// Where the target list lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Target list file (default: `data/targets.txt`).
    #[serde(default = "default_store_path")]
    pub path: String,
    /// Seconds between retries after a failed save (default: 30).
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            flush_interval_secs: default_flush_interval(),
        }
    }
}

impl StoreConfig {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

/// How notifications and command acknowledgments are sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Text posted ahead of the target mentions (default: "aaaayyyyy").
    #[serde(default = "default_ping_text")]
    pub ping_text: String,
    /// Seconds before a notification deletes itself; 0 or absent keeps it.
    #[serde(default = "default_ping_expire")]
    pub ping_expire_secs: Option<u64>,
    /// Seconds before a command acknowledgment deletes itself; 0 or absent keeps it.
    #[serde(default = "default_ack_expire")]
    pub ack_expire_secs: Option<u64>,
    /// Send the notification even when no live target remains (default: true).
    #[serde(default = "default_true")]
    pub ping_when_empty: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            ping_text: default_ping_text(),
            ping_expire_secs: default_ping_expire(),
            ack_expire_secs: default_ack_expire(),
            ping_when_empty: true,
        }
    }
}

impl NotifyConfig {
    pub fn ping_expire(&self) -> Option<Duration> {
        secs_to_delay(self.ping_expire_secs)
    }

    pub fn ack_expire(&self) -> Option<Duration> {
        secs_to_delay(self.ack_expire_secs)
    }
}

fn secs_to_delay(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|s| *s > 0).map(Duration::from_secs)
}

/// The listener the platform bridge connects to.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Listen address (default: 127.0.0.1:7878).
    #[serde(default = "default_bridge_listen")]
    pub listen: SocketAddr,
    /// Milliseconds to wait for the bridge to confirm a send (default: 10000).
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Maximum frame length in bytes (default: 65536).
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
    /// Milliseconds a new connection has to send `ready` (default: 10000).
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen: default_bridge_listen(),
            send_timeout_ms: default_send_timeout_ms(),
            max_frame_len: default_max_frame_len(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

impl BridgeConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Log output.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Console filter directive; `RUST_LOG` takes precedence (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Optional log file, written at DEBUG level without colors.
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

/// Prometheus endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Serve `/metrics` and `/health` on this port when set.
    #[serde(default)]
    pub port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.store.path, "data/targets.txt");
        assert_eq!(config.store.flush_interval(), Duration::from_secs(30));
        assert_eq!(config.notify.ping_text, "aaaayyyyy");
        assert_eq!(config.notify.ping_expire(), Some(Duration::from_secs(300)));
        assert_eq!(config.notify.ack_expire(), Some(Duration::from_secs(30)));
        assert!(config.notify.ping_when_empty);
        assert_eq!(config.bridge.listen, "127.0.0.1:7878".parse().unwrap());
        assert_eq!(config.bridge.send_timeout(), Duration::from_secs(10));
        assert_eq!(config.bridge.handshake_timeout(), Duration::from_secs(10));
        assert_eq!(config.logging.filter, "info");
        assert!(config.logging.file.is_none());
        assert!(config.metrics.port.is_none());
    }

    #[test]
    fn full_file_overrides_everything() {
        let config = Config::from_toml(
            r#"
[store]
path = "/var/lib/pingwire/targets.txt"
flush_interval_secs = 5

[notify]
ping_text = "ayy"
ping_expire_secs = 0
ack_expire_secs = 12
ping_when_empty = false

[bridge]
listen = "0.0.0.0:9000"
send_timeout_ms = 250
max_frame_len = 4096
handshake_timeout_ms = 1500

[logging]
filter = "pingwired=debug"
file = "pingwire.log"

[metrics]
port = 9100
"#,
        )
        .unwrap();

        assert_eq!(config.store.path(), PathBuf::from("/var/lib/pingwire/targets.txt"));
        assert_eq!(config.notify.ping_expire(), None);
        assert_eq!(config.notify.ack_expire(), Some(Duration::from_secs(12)));
        assert!(!config.notify.ping_when_empty);
        assert_eq!(config.bridge.listen.port(), 9000);
        assert_eq!(config.bridge.send_timeout(), Duration::from_millis(250));
        assert_eq!(config.bridge.max_frame_len, 4096);
        assert_eq!(config.bridge.handshake_timeout(), Duration::from_millis(1500));
        assert_eq!(config.logging.file.as_deref(), Some("pingwire.log"));
        assert_eq!(config.metrics.port, Some(9100));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml("[store]\npth = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validation_failures_surface() {
        let err = Config::from_toml("[bridge]\nsend_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref e) if e.len() == 1));
        assert!(err.to_string().contains("send_timeout_ms"));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[notify]\nping_text = \"hey\"\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().notify.ping_text, "hey");
        assert!(matches!(
            Config::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
