//! Configuration management for the solo FTP server
//!
//! Values are read once at startup from an optional TOML file, then
//! overridden by `SOLO_FTP_` prefixed environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Default configuration file, looked up relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "SOLO_FTP_CONFIG";

/// Upper bound for `timeout_minutes` (one day).
pub const MAX_TIMEOUT_MINUTES: u64 = 24 * 60;

/// Upper bound for the login grace and data connection waits, in seconds.
pub const MAX_WAIT_SECS: u64 = 3600;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address the control and passive listeners bind to
    pub bind_address: String,

    /// Port for the FTP control connection
    pub control_port: u16,

    /// Fixed port of the passive data listener
    pub passive_port: u16,

    /// Address advertised in 227 replies; the control connection's local
    /// address when unset
    pub passive_address: Option<String>,

    // ═══ ACCOUNT ═══
    pub username: String,
    pub password: String,

    // ═══ TIMEOUTS ═══
    /// Inactivity deadline of a logged-in session
    pub timeout_minutes: u64,

    /// Time allowed between the greeting and USER
    pub login_grace_secs: u64,

    /// Bounded wait for the data connection
    pub data_connect_timeout_secs: u64,

    // ═══ STORAGE ═══
    /// Root directory for FTP operations
    pub server_root: String,

    // ═══ INTERNAL BEHAVIOR ═══
    /// Chunk size moved per tick by a transfer
    pub buffer_size: usize,

    /// Capacity of the command line buffer
    pub max_command_length: usize,

    /// Capacity of a resolved path
    pub max_path_length: usize,

    /// Period of the poll tick driving the server
    pub tick_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            control_port: 2121,
            passive_port: 50009,
            passive_address: None,
            username: "ftp".to_string(),
            password: "ftp".to_string(),
            timeout_minutes: 5,
            login_grace_secs: 10,
            data_connect_timeout_secs: 10,
            server_root: "./server_root".to_string(),
            buffer_size: 1024,
            max_command_length: 263,
            max_path_length: 263,
            tick_interval_ms: 1,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the default path, or the one named by
    /// `SOLO_FTP_CONFIG`, with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from `path` (which may be missing) with
    /// environment overrides
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SOLO_FTP").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.control_port == 0 || self.passive_port == 0 {
            return Err(config::ConfigError::Message(
                "control_port and passive_port cannot be 0".into(),
            ));
        }

        if self.control_port == self.passive_port {
            return Err(config::ConfigError::Message(
                "control_port and passive_port must differ".into(),
            ));
        }

        if self.username.is_empty() {
            return Err(config::ConfigError::Message(
                "username cannot be empty".into(),
            ));
        }

        if self.server_root.is_empty() {
            return Err(config::ConfigError::Message(
                "server_root cannot be empty".into(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(config::ConfigError::Message(
                "buffer_size must be greater than 0".into(),
            ));
        }

        if self.timeout_minutes == 0 {
            return Err(config::ConfigError::Message(
                "timeout_minutes must be greater than 0".into(),
            ));
        }

        if self.timeout_minutes > MAX_TIMEOUT_MINUTES {
            return Err(config::ConfigError::Message(format!(
                "timeout_minutes cannot exceed {MAX_TIMEOUT_MINUTES}"
            )));
        }

        if self.login_grace_secs > MAX_WAIT_SECS || self.data_connect_timeout_secs > MAX_WAIT_SECS {
            return Err(config::ConfigError::Message(format!(
                "login_grace_secs and data_connect_timeout_secs cannot exceed {MAX_WAIT_SECS}"
            )));
        }

        if self.max_command_length < 4 {
            return Err(config::ConfigError::Message(
                "max_command_length must be at least 4".into(),
            ));
        }

        if self.max_path_length == 0 {
            return Err(config::ConfigError::Message(
                "max_path_length must be greater than 0".into(),
            ));
        }

        if let Some(address) = &self.passive_address {
            address.parse::<Ipv4Addr>().map_err(|_| {
                config::ConfigError::Message(format!("passive_address {address} is not an IPv4 address"))
            })?;
        }

        Ok(())
    }

    /// Address advertised to passive-mode clients, if configured
    pub fn passive_ip(&self) -> Option<Ipv4Addr> {
        self.passive_address.as_deref().and_then(|a| a.parse().ok())
    }

    /// Get server root as PathBuf
    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes.saturating_mul(60))
    }

    pub fn login_grace(&self) -> Duration {
        Duration::from_secs(self.login_grace_secs)
    }

    pub fn data_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.data_connect_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.inactivity_timeout(), Duration::from_secs(300));
        assert_eq!(config.passive_ip(), None);
    }

    #[test]
    fn test_load_from_file_keeps_defaults_for_missing_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.toml");
        fs::write(
            &path,
            "username = \"bob\"\npassword = \"secret\"\npassive_address = \"10.0.0.5\"\n",
        )
        .unwrap();

        let config = ServerConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.username, "bob");
        assert_eq!(config.password, "secret");
        assert_eq!(config.passive_ip(), Some(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(config.control_port, 2121);
        assert_eq!(config.max_path_length, 263);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let config = ServerConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.passive_port, 50009);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServerConfig {
            passive_port: 2121,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        config.passive_port = 50009;
        config.passive_address = Some("not-an-ip".into());
        assert!(config.validate().is_err());

        config.passive_address = None;
        config.max_command_length = 3;
        assert!(config.validate().is_err());

        config.max_command_length = 263;
        config.username = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_timeouts() {
        let mut config = ServerConfig {
            timeout_minutes: u64::MAX,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.inactivity_timeout(), Duration::from_secs(u64::MAX));

        config.timeout_minutes = MAX_TIMEOUT_MINUTES;
        assert!(config.validate().is_ok());

        config.login_grace_secs = MAX_WAIT_SECS + 1;
        assert!(config.validate().is_err());

        config.login_grace_secs = 10;
        config.data_connect_timeout_secs = u64::MAX;
        assert!(config.validate().is_err());
    }
}
