// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Naming server configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use yoko::config::{
    DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_NAMING_PORT, GIOP_HEADER_SIZE, GIOP_MAX_MINOR,
};
use yoko::OrbConfig;

/// Naming server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// IIOP port to listen on (0 = ephemeral).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host written into published references (defaults to `host`).
    #[serde(default)]
    pub publish_host: Option<String>,

    /// GIOP minor version used for outgoing requests.
    #[serde(default = "default_giop_minor")]
    pub giop_minor: u8,

    /// Largest accepted GIOP message body in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Reply timeout for calls to federated contexts (milliseconds).
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,

    /// File receiving the stringified root context IOR.
    #[serde(default)]
    pub ior_file: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_NAMING_PORT
}

fn default_giop_minor() -> u8 {
    GIOP_MAX_MINOR
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            publish_host: None,
            giop_minor: default_giop_minor(),
            max_message_size: default_max_message_size(),
            read_timeout_ms: None,
            ior_file: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue("host cannot be empty".into()));
        }
        if self.read_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "read_timeout_ms must be > 0".into(),
            ));
        }
        if self.giop_minor > GIOP_MAX_MINOR {
            return Err(ConfigError::InvalidValue(format!(
                "unsupported GIOP version 1.{}",
                self.giop_minor
            )));
        }
        if self.max_message_size < GIOP_HEADER_SIZE {
            return Err(ConfigError::InvalidValue(format!(
                "max_message_size must be at least {}",
                GIOP_HEADER_SIZE
            )));
        }
        if self.publish_host.as_deref() == Some("") {
            return Err(ConfigError::InvalidValue(
                "publish_host cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Host placed into references; a wildcard bind publishes loopback.
    pub fn published_host(&self) -> String {
        match &self.publish_host {
            Some(host) => host.clone(),
            None if self.host == "0.0.0.0" => "127.0.0.1".to_string(),
            None if self.host == "::" => "::1".to_string(),
            None => self.host.clone(),
        }
    }

    /// ORB settings for the hosting ORB.
    pub fn orb_config(&self) -> OrbConfig {
        let mut config = OrbConfig::default()
            .with_host(self.host.clone())
            .with_port(self.port)
            .with_giop_minor(self.giop_minor);
        config.publish_host = Some(self.published_host());
        config.max_message_size = self.max_message_size;
        config.read_timeout_ms = self.read_timeout_ms;
        config
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 2809);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.giop_minor, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ServerConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        assert!(config.ior_file.is_none());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("naming.json");

        let config = ServerConfig {
            port: 12809,
            publish_host: Some("names.example.org".into()),
            read_timeout_ms: Some(2_000),
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        let loaded = ServerConfig::from_file(&path).unwrap();
        assert_eq!(loaded.port, 12809);
        assert_eq!(loaded.publish_host.as_deref(), Some("names.example.org"));
        assert_eq!(loaded.read_timeout_ms, Some(2_000));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ port: ").unwrap();
        let err = ServerConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig {
            read_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.read_timeout_ms = None;
        config.giop_minor = 3;
        assert!(config.validate().is_err());

        config.giop_minor = 0;
        config.publish_host = Some(String::new());
        assert!(config.validate().is_err());

        config.publish_host = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_orb_config() {
        let config = ServerConfig {
            giop_minor: 1,
            read_timeout_ms: Some(500),
            ..Default::default()
        };
        let orb = config.orb_config();
        assert_eq!(orb.host, "0.0.0.0");
        assert_eq!(orb.port, 2809);
        assert_eq!(orb.giop_minor, 1);
        assert_eq!(orb.published_host(), "127.0.0.1");
        assert_eq!(orb.read_timeout_ms, Some(500));
        assert!(orb.validate().is_ok());
    }
}
