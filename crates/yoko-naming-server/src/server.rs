// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Naming server: the hosting ORB plus a transient name service.

use std::sync::Arc;
use tracing::{error, info};

use yoko::naming::{NameServiceConfig, TransientNameService};
use yoko::{Endpoint, ObjectRef, Orb, SystemException};

use crate::config::ServerConfig;

/// Standalone naming server.
pub struct NamingServer {
    config: ServerConfig,
    orb: Orb,
    service: Arc<TransientNameService>,
    root: ObjectRef,
}

impl NamingServer {
    /// Validate the configuration, bind the listener and create the root
    /// context.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let orb = Orb::init(config.orb_config()).map_err(ServerError::Orb)?;
        if let Err(e) = orb.listen() {
            orb.destroy();
            return Err(ServerError::Bind(e.to_string()));
        }

        let service = Arc::new(TransientNameService::with_orb(
            orb.clone(),
            NameServiceConfig {
                host: config.host.clone(),
                port: config.port,
                publish_host: config.publish_host.clone(),
            },
        ));
        let root = match service.initialize() {
            Ok(root) => root,
            Err(e) => {
                orb.destroy();
                return Err(ServerError::Orb(e));
            }
        };

        Ok(Self {
            config,
            orb,
            service,
            root,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address the listener is bound to.
    pub fn bound_endpoint(&self) -> Option<Endpoint> {
        self.orb.endpoint()
    }

    pub fn root_context(&self) -> &ObjectRef {
        &self.root
    }

    /// Stringified root context reference.
    pub fn root_ior(&self) -> Result<String, ServerError> {
        self.orb
            .object_to_string(&self.root)
            .map_err(ServerError::Orb)
    }

    /// `corbaloc::host:port/NameService`.
    pub fn corbaloc(&self) -> Option<String> {
        self.service.corbaloc()
    }

    /// Write the root IOR to the configured file, if any.
    pub fn write_ior_file(&self) -> Result<(), ServerError> {
        let Some(path) = &self.config.ior_file else {
            return Ok(());
        };
        let ior = self.root_ior()?;
        std::fs::write(path, format!("{}\n", ior))
            .map_err(|e| ServerError::Io(format!("{}: {}", path.display(), e)))?;
        info!("IOR written to {:?}", path);
        Ok(())
    }

    /// Handle that stops [`run`](Self::run) from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            service: Arc::clone(&self.service),
        }
    }

    /// Serve requests until shut down.
    pub fn run(&self) -> Result<(), ServerError> {
        self.service.run().map_err(|e| {
            error!("Name service failed: {}", e);
            ServerError::Orb(e)
        })
    }

    /// Release the naming contexts and the ORB.
    pub fn destroy(self) {
        self.service.destroy();
        self.orb.destroy();
        info!("Naming server stopped");
    }
}

/// Stops a running [`NamingServer`].
#[derive(Clone)]
pub struct ShutdownHandle {
    service: Arc<TransientNameService>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.service.shutdown();
    }
}

/// Server errors.
#[derive(Debug)]
pub enum ServerError {
    Config(String),
    Bind(String),
    Io(String),
    Orb(SystemException),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "Configuration error: {}", e),
            ServerError::Bind(e) => write!(f, "Bind error: {}", e),
            ServerError::Io(e) => write!(f, "IO error: {}", e),
            ServerError::Orb(e) => write!(f, "ORB error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

#[cfg(test)]
mod tests {
    use super::*;
    use yoko::naming::{NameComponent, NamingContextStub};
    use yoko::OrbConfig;

    fn local_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            read_timeout_ms: Some(5_000),
            ..Default::default()
        }
    }

    #[test]
    fn test_server_serves_root_context() {
        let server = NamingServer::new(local_config()).unwrap();
        let endpoint = server.bound_endpoint().unwrap();
        assert_ne!(endpoint.port, 0);

        let corbaloc = server.corbaloc().unwrap();
        assert_eq!(corbaloc, format!("corbaloc::127.0.0.1:{}/NameService", endpoint.port));

        let client = Orb::init(OrbConfig::default()).unwrap();
        let obj = client.string_to_object(&server.root_ior().unwrap()).unwrap();
        let root = NamingContextStub::narrow(&client, obj).unwrap();
        let name = vec![NameComponent::new("svc", "")];
        root.bind(&name, server.root_context()).unwrap();
        assert!(root.resolve(&name).unwrap().is_equivalent(server.root_context()));

        client.destroy();
        server.destroy();
    }

    #[test]
    fn test_ior_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ns.ior");
        let server = NamingServer::new(ServerConfig {
            ior_file: Some(path.clone()),
            ..local_config()
        })
        .unwrap();

        server.write_ior_file().unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.trim(), server.root_ior().unwrap());
        assert!(written.starts_with("IOR:"));
        server.destroy();
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let server = NamingServer::new(local_config()).unwrap();
        let handle = server.shutdown_handle();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            handle.shutdown();
        });
        server.run().unwrap();
        stopper.join().unwrap();
        server.destroy();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = NamingServer::new(ServerConfig {
            giop_minor: 9,
            ..local_config()
        })
        .err()
        .unwrap();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
