use std::path::Path;

use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILE: &str = "lure.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    FileRead(String, String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("configuration validation error: {0}")]
    Validation(String),
}

/// Top-level configuration, read from TOML.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Defaults for spoofing sessions, each overridable per request.
    #[serde(default)]
    pub session: SessionDefaults,

    /// Defaults for the DNS capture window.
    #[serde(default)]
    pub capture: CaptureDefaults,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionDefaults {
    /// Interface name, description or owned IPv4 address.
    #[serde(default = "default_interface")]
    pub interface: String,

    #[serde(default)]
    pub targets: String,

    /// Address whose binding is claimed while poisoning.
    #[serde(default)]
    pub host_ip: String,

    #[serde(default = "default_injection_interval_ms")]
    pub injection_interval_ms: u64,

    #[serde(default = "default_session_duration_sec")]
    pub session_duration_sec: u64,

    #[serde(default = "default_restore_interval_ms")]
    pub restore_interval_ms: u64,

    #[serde(default = "default_restore_duration_ms")]
    pub restore_duration_ms: u64,

    /// How long to wait for the host's real binding before giving up.
    #[serde(default = "default_host_resolve_timeout_ms")]
    pub host_resolve_timeout_ms: u64,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            targets: String::new(),
            host_ip: String::new(),
            injection_interval_ms: default_injection_interval_ms(),
            session_duration_sec: default_session_duration_sec(),
            restore_interval_ms: default_restore_interval_ms(),
            restore_duration_ms: default_restore_duration_ms(),
            host_resolve_timeout_ms: default_host_resolve_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureDefaults {
    /// Capture device; falls back to the session interface when unset.
    #[serde(default)]
    pub device: Option<String>,

    #[serde(default = "default_capture_duration_sec")]
    pub duration_sec: u64,

    #[serde(default = "default_max_exchanges")]
    pub max_exchanges: usize,
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            device: None,
            duration_sec: default_capture_duration_sec(),
            max_exchanges: default_max_exchanges(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub interface: Option<String>,
    pub targets: Option<String>,
    pub host_ip: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    /// Loads configuration from `path`, else `lure.toml` in the working
    /// directory, else defaults; then applies command-line overrides.
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(interface) = overrides.interface {
            self.session.interface = interface;
        }
        if let Some(targets) = overrides.targets {
            self.session.targets = targets;
        }
        if let Some(host_ip) = overrides.host_ip {
            self.session.host_ip = host_ip;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.injection_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "injection interval cannot be 0".to_string(),
            ));
        }
        if self.session.restore_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "restore interval cannot be 0".to_string(),
            ));
        }
        if self.capture.max_exchanges == 0 {
            return Err(ConfigError::Validation(
                "capture capacity cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Device used by the capture window.
    pub fn capture_device(&self) -> &str {
        self.capture
            .device
            .as_deref()
            .unwrap_or(&self.session.interface)
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_interface() -> String {
    "eth0".to_string()
}

fn default_injection_interval_ms() -> u64 {
    100
}

fn default_session_duration_sec() -> u64 {
    10
}

fn default_restore_interval_ms() -> u64 {
    500
}

fn default_restore_duration_ms() -> u64 {
    5_000
}

fn default_host_resolve_timeout_ms() -> u64 {
    2_000
}

fn default_capture_duration_sec() -> u64 {
    10
}

fn default_max_exchanges() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.session.injection_interval_ms, 100);
        assert_eq!(config.session.restore_duration_ms, 5_000);
        assert_eq!(config.capture.max_exchanges, 10_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::from_toml(
            r#"
            [session]
            interface = "Ethernet"
            targets = "192.168.1.128"
            host_ip = "192.168.1.1"

            [capture]
            device = "eth1"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.interface, "Ethernet");
        assert_eq!(config.session.session_duration_sec, 10);
        assert_eq!(config.capture_device(), "eth1");
    }

    #[test]
    fn capture_device_falls_back_to_interface() {
        let config = Config::default();
        assert_eq!(config.capture_device(), "eth0");
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let mut config = Config::default();
        config.apply_cli_overrides(CliOverrides {
            port: Some(9090),
            targets: Some("10.0.0.1-5".to_string()),
            ..Default::default()
        });
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.session.targets, "10.0.0.1-5");
    }

    #[test]
    fn zero_interval_fails_validation() {
        let mut config = Config::default();
        config.session.injection_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            Config::from_toml("[session\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
