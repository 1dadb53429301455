//! Configuration for cairisd

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cairis")
}

/// Daemon verbosity, as named in CAIRIS config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogLevel {
    Verbose,
    Debug,
    #[default]
    Warning,
}

impl From<String> for LogLevel {
    fn from(level: String) -> Self {
        Self::parse(&level)
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
            LogLevel::Warning => "warning",
        }
        .to_string()
    }
}

impl LogLevel {
    /// `verbose` and `debug` are recognised, anything else means warnings only
    pub fn parse(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "verbose" => Self::Verbose,
            "debug" => Self::Debug,
            _ => Self::Warning,
        }
    }

    /// Level name as understood by `tracing_subscriber::EnvFilter`
    pub fn filter_level(self) -> &'static str {
        match self {
            Self::Verbose => "info",
            Self::Debug => "debug",
            Self::Warning => "warn",
        }
    }

    /// Default filter directive for this crate's targets
    pub fn directive(self) -> String {
        format!("cairis={}", self.filter_level())
    }
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the database and config file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Database file name inside `storage_dir`
    #[serde(default = "default_db_file")]
    pub db_file: String,

    /// Give every session a private in-memory database
    #[serde(default)]
    pub in_memory: bool,

    /// Address the HTTP API binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_db_file() -> String {
    "cairis.db".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    7071
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            db_file: default_db_file(),
            in_memory: false,
            bind_address: default_bind_address(),
            http_port: default_http_port(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Config for tests and demos: nothing touches disk
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get database path
    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(&self.db_file)
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }

    /// Override the port unless `port` is 0
    pub fn set_port(&mut self, port: u16) {
        if port != 0 {
            self.http_port = port;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.http_port)
    }

    /// Log the effective settings
    pub fn log_params(&self) {
        info!(
            storage_dir = %self.storage_dir.display(),
            database = if self.in_memory { "in-memory".to_string() } else { self.db_path().display().to_string() },
            bind = %self.bind_addr(),
            log_level = self.log_level.filter_level(),
            "Effective configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.http_port, 7071);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.log_level, LogLevel::Warning);
        assert!(config.db_path().ends_with("cairis/cairis.db"));
        assert!(!config.in_memory);
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(LogLevel::parse("verbose").filter_level(), "info");
        assert_eq!(LogLevel::parse("DEBUG").filter_level(), "debug");
        assert_eq!(LogLevel::parse("chatty").filter_level(), "warn");
        assert_eq!(LogLevel::Debug.directive(), "cairis=debug");
    }

    #[test]
    fn test_port_zero_keeps_configured() {
        let mut config = Config::default();
        config.set_port(0);
        assert_eq!(config.http_port, 7071);
        config.set_port(8000);
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("http_port = 9000\nlog_level = \"verbose\"\n").unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.log_level, LogLevel::Verbose);
        assert_eq!(config.db_file, "cairis.db");

        let odd: Config = toml::from_str("log_level = \"loud\"\n").unwrap();
        assert_eq!(odd.log_level, LogLevel::Warning);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::in_memory();
        config.http_port = 7777;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.http_port, 7777);
        assert!(loaded.in_memory);
    }
}
