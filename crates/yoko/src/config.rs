// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ORB configuration.
//!
//! Protocol constants live at module level; runtime settings are carried by
//! [`OrbConfig`], which can be built in code, deserialized (feature `serde`)
//! or patched from `-ORB*` command line arguments.

use std::collections::HashMap;
use std::time::Duration;

use crate::cdr::ByteOrder;
use crate::exception::{minor, SystemException};

/// GIOP message magic.
pub const GIOP_MAGIC: [u8; 4] = *b"GIOP";

/// Size of the fixed GIOP message header.
pub const GIOP_HEADER_SIZE: usize = 12;

/// GIOP major version spoken by this ORB.
pub const GIOP_MAJOR: u8 = 1;

/// Highest GIOP minor version supported.
pub const GIOP_MAX_MINOR: u8 = 2;

/// IIOP port registered for the naming service.
pub const DEFAULT_NAMING_PORT: u16 = 2809;

/// Well-known object key of the naming service boot binding.
pub const NAME_SERVICE_KEY: &[u8] = b"NameService";

/// Initial reference name of the naming service.
pub const NAME_SERVICE_ID: &str = "NameService";

/// OMG vendor minor code id (standard minor codes are `OMG_VMCID | n`).
pub const OMG_VMCID: u32 = 0x4f4d_0000;

/// Vendor minor code id used for ORB-specific minor codes.
pub const YOKO_VMCID: u32 = 0x4f4f_0000;

/// Default upper bound on a single GIOP message body.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Deepest nesting of TypeCodes and values accepted from the wire.
pub const MAX_NESTING: usize = 256;

/// Default number of transparent re-invocations per call.
pub const DEFAULT_MAX_REMARSHAL: u32 = 32;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default number of idle connections kept per endpoint.
pub const DEFAULT_POOL_IDLE_PER_ENDPOINT: usize = 4;

/// Runtime configuration of an [`Orb`](crate::Orb).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrbConfig {
    /// Byte order used for outgoing messages and encapsulations.
    pub byte_order: ByteOrder,
    /// GIOP minor version used for outgoing requests (0..=2).
    pub giop_minor: u8,
    /// Re-invocation cap for LOCATION_FORWARD and failover (`None` = unbounded).
    pub max_remarshal: Option<u32>,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Reply read timeout in milliseconds (`None` = block).
    pub read_timeout_ms: Option<u64>,
    /// Largest accepted message body.
    pub max_message_size: usize,
    /// Host the server binds to and publishes in object references.
    pub host: String,
    /// Server port (0 = ephemeral).
    pub port: u16,
    /// Host written into IORs when different from `host` (e.g. `0.0.0.0` binds).
    pub publish_host: Option<String>,
    /// Initial references as `name -> stringified object` (IOR or corbaloc).
    pub initial_references: HashMap<String, String>,
    /// Idle client connections retained per endpoint.
    pub pool_idle_per_endpoint: usize,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::BigEndian,
            giop_minor: GIOP_MAX_MINOR,
            max_remarshal: Some(DEFAULT_MAX_REMARSHAL),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            host: "127.0.0.1".to_string(),
            port: 0,
            publish_host: None,
            initial_references: HashMap::new(),
            pool_idle_per_endpoint: DEFAULT_POOL_IDLE_PER_ENDPOINT,
        }
    }
}

impl OrbConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_giop_minor(mut self, minor: u8) -> Self {
        self.giop_minor = minor;
        self
    }

    pub fn with_max_remarshal(mut self, limit: Option<u32>) -> Self {
        self.max_remarshal = limit;
        self
    }

    pub fn with_initial_reference(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.initial_references.insert(name.into(), url.into());
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Host placed in object references created by this ORB.
    pub fn published_host(&self) -> &str {
        self.publish_host.as_deref().unwrap_or(&self.host)
    }

    /// Check the configuration before an ORB is built from it.
    pub fn validate(&self) -> Result<(), SystemException> {
        if self.giop_minor > GIOP_MAX_MINOR {
            return Err(SystemException::initialize(
                minor::BAD_CONFIG,
                format!("unsupported GIOP version 1.{}", self.giop_minor),
            ));
        }
        if self.max_message_size < GIOP_HEADER_SIZE {
            return Err(SystemException::initialize(
                minor::BAD_CONFIG,
                "max_message_size too small",
            ));
        }
        if self.host.is_empty() {
            return Err(SystemException::initialize(minor::BAD_CONFIG, "empty host"));
        }
        if self.initial_references.keys().any(|name| name.is_empty()) {
            return Err(SystemException::initialize(
                minor::BAD_CONFIG,
                "empty initial reference name",
            ));
        }
        Ok(())
    }

    /// Consume recognized `-ORB*` options and return the remaining arguments.
    ///
    /// Recognized: `-ORBInitRef name=url`, `-ORBServerHost host`,
    /// `-ORBServerPort port`, `-ORBGIOPVersion 1.x`.
    pub fn apply_args<I>(&mut self, args: I) -> Result<Vec<String>, SystemException>
    where
        I: IntoIterator<Item = String>,
    {
        let mut rest = Vec::new();
        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            if !arg.starts_with("-ORB") {
                rest.push(arg);
                continue;
            }
            let value = iter.next().ok_or_else(|| {
                SystemException::bad_param(minor::BAD_CONFIG, format!("{} requires a value", arg))
            })?;
            match arg.as_str() {
                "-ORBInitRef" => {
                    let (name, url) = value.split_once('=').ok_or_else(|| {
                        SystemException::bad_param(
                            minor::BAD_CONFIG,
                            format!("malformed -ORBInitRef '{}'", value),
                        )
                    })?;
                    self.initial_references
                        .insert(name.to_string(), url.to_string());
                }
                "-ORBServerHost" => self.host = value,
                "-ORBServerPort" => {
                    self.port = value.parse().map_err(|_| {
                        SystemException::bad_param(
                            minor::BAD_CONFIG,
                            format!("invalid port '{}'", value),
                        )
                    })?;
                }
                "-ORBGIOPVersion" => {
                    self.giop_minor = match value.as_str() {
                        "1.0" => 0,
                        "1.1" => 1,
                        "1.2" => 2,
                        _ => {
                            return Err(SystemException::bad_param(
                                minor::BAD_CONFIG,
                                format!("unsupported GIOP version '{}'", value),
                            ))
                        }
                    };
                }
                _ => {
                    log::warn!("[config] ignoring unknown option {}", arg);
                }
            }
        }
        Ok(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = OrbConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.byte_order, ByteOrder::BigEndian);
        assert_eq!(config.max_remarshal, Some(DEFAULT_MAX_REMARSHAL));
    }

    #[test]
    fn test_validate_rejects_giop_minor() {
        let config = OrbConfig::default().with_giop_minor(3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_args() {
        let mut config = OrbConfig::default();
        let rest = config
            .apply_args(args(&[
                "prog",
                "-ORBInitRef",
                "NameService=corbaloc::host:2809/NameService",
                "-ORBServerPort",
                "4000",
                "-ORBGIOPVersion",
                "1.0",
                "--verbose",
            ]))
            .unwrap();

        assert_eq!(rest, args(&["prog", "--verbose"]));
        assert_eq!(config.port, 4000);
        assert_eq!(config.giop_minor, 0);
        assert_eq!(
            config.initial_references.get("NameService").map(String::as_str),
            Some("corbaloc::host:2809/NameService")
        );
    }

    #[test]
    fn test_apply_args_missing_value() {
        let mut config = OrbConfig::default();
        assert!(config.apply_args(args(&["-ORBServerPort"])).is_err());
        assert!(config.apply_args(args(&["-ORBInitRef", "broken"])).is_err());
    }

    #[test]
    fn test_published_host() {
        let mut config = OrbConfig::default().with_host("0.0.0.0");
        assert_eq!(config.published_host(), "0.0.0.0");
        config.publish_host = Some("naming.local".into());
        assert_eq!(config.published_host(), "naming.local");
    }
}
