use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error_handling::types::ConfigError;

/// Runtime configuration.
///
/// Loaded from a TOML file when one is given on the command line; every field
/// has a default so the server can start with no configuration at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IP address the server listens on.
    pub bind_address: String,
    /// TCP port for the HTTP API and the dashboard WebSocket.
    pub port: u16,
    /// SQLite database file, created if missing.
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            database_path: PathBuf::from("vigia.sqlite3"),
        }
    }
}

impl Config {
    /// Reads and parses a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| ConfigError::TomlError(e.to_string()))
    }

    /// The socket address to bind, validating `bind_address`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|_| ConfigError::BadBindAddress(self.bind_address.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_bind_everywhere_on_3000() {
        let config = Config::default();
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
        assert_eq!(config.database_path, PathBuf::from("vigia.sqlite3"));
    }

    #[test]
    fn from_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bind_address = \"127.0.0.1\"\nport = 8088").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 8088);
        // unspecified fields keep their defaults
        assert_eq!(config.database_path, PathBuf::from("vigia.sqlite3"));
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        let config = Config {
            bind_address: "not-an-ip".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ConfigError::BadBindAddress(_))
        ));
    }
}
