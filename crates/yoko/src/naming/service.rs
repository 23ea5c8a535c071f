// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transient name service: an ORB, a root context and its boot binding.

use std::sync::Arc;

use parking_lot::Mutex;

use super::servant::NamingStore;
use crate::config::{OrbConfig, DEFAULT_NAMING_PORT, NAME_SERVICE_ID, NAME_SERVICE_KEY};
use crate::exception::SystemException;
use crate::ior::{escape_key, ObjectRef};
use crate::orb::Orb;

/// Where a self-created name service ORB listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameServiceConfig {
    pub host: String,
    pub port: u16,
    /// Host written into references when different from `host`.
    pub publish_host: Option<String>,
}

impl Default for NameServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_NAMING_PORT,
            publish_host: None,
        }
    }
}

impl NameServiceConfig {
    fn orb_config(&self) -> OrbConfig {
        let mut config = OrbConfig::default()
            .with_host(self.host.clone())
            .with_port(self.port);
        config.publish_host = self.publish_host.clone();
        config
    }
}

struct Running {
    orb: Orb,
    owned: bool,
    store: Arc<NamingStore>,
    root: ObjectRef,
}

/// CosNaming service with in-memory contexts.
///
/// The root context is reachable as `corbaloc::<host>:<port>/NameService`
/// through the ORB's boot manager, and as the `NameService` initial
/// reference of the hosting ORB.
pub struct TransientNameService {
    config: NameServiceConfig,
    external: Option<Orb>,
    running: Mutex<Option<Running>>,
}

impl TransientNameService {
    /// Service that creates (and later destroys) its own ORB.
    pub fn new(config: NameServiceConfig) -> Self {
        Self {
            config,
            external: None,
            running: Mutex::new(None),
        }
    }

    /// Service hosted by an existing ORB, which `destroy` leaves running.
    pub fn with_orb(orb: Orb, config: NameServiceConfig) -> Self {
        Self {
            config,
            external: Some(orb),
            running: Mutex::new(None),
        }
    }

    /// Create the ORB (if needed) and the root context. Idempotent.
    pub fn initialize(&self) -> Result<ObjectRef, SystemException> {
        let mut running = self.running.lock();
        if let Some(state) = running.as_ref() {
            return Ok(state.root.clone());
        }

        let (orb, owned) = match &self.external {
            Some(orb) => (orb.clone(), false),
            None => (Orb::init(self.config.orb_config())?, true),
        };
        match Self::start(&orb, owned) {
            Ok((store, root)) => {
                log::info!(
                    "[naming] name service ready at {}",
                    root.endpoint().map(|e| e.to_string()).unwrap_or_default()
                );
                *running = Some(Running {
                    orb,
                    owned,
                    store,
                    root: root.clone(),
                });
                Ok(root)
            }
            Err(e) => {
                log::error!("[naming] failed to start name service: {}", e);
                if owned {
                    orb.destroy();
                }
                Err(e)
            }
        }
    }

    fn start(orb: &Orb, owned: bool) -> Result<(Arc<NamingStore>, ObjectRef), SystemException> {
        if owned || orb.published_endpoint().is_none() {
            orb.listen()?;
        }
        let store = NamingStore::new(orb);
        let (_, root) = store.create_context(true)?;
        orb.boot_manager().add_binding(NAME_SERVICE_KEY, root.clone());
        orb.register_initial_reference(NAME_SERVICE_ID, root.clone())?;
        Ok((store, root))
    }

    /// Initialize, then block until [`shutdown`](Self::shutdown).
    pub fn run(&self) -> Result<(), SystemException> {
        self.initialize()?;
        match self.orb() {
            Some(orb) => orb.run(),
            None => Ok(()),
        }
    }

    /// Release a thread blocked in [`run`](Self::run).
    pub fn shutdown(&self) {
        if let Some(orb) = self.orb() {
            orb.shutdown();
        }
    }

    /// Remove every context and binding of this service, and destroy the
    /// ORB if the service created it. Idempotent.
    pub fn destroy(&self) {
        let Some(state) = self.running.lock().take() else {
            return;
        };
        state.store.destroy_all();
        state.orb.boot_manager().remove_binding(NAME_SERVICE_KEY);
        state.orb.unregister_initial_reference(NAME_SERVICE_ID);
        if state.owned {
            state.orb.destroy();
        }
        log::info!("[naming] name service destroyed");
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn root_context(&self) -> Option<ObjectRef> {
        self.running.lock().as_ref().map(|state| state.root.clone())
    }

    pub fn orb(&self) -> Option<Orb> {
        self.running.lock().as_ref().map(|state| state.orb.clone())
    }

    /// Number of live naming contexts, root included.
    pub fn context_count(&self) -> usize {
        self.running
            .lock()
            .as_ref()
            .map_or(0, |state| state.store.context_count())
    }

    /// `corbaloc::host:port/NameService` for the published endpoint.
    pub fn corbaloc(&self) -> Option<String> {
        let endpoint = self.orb()?.published_endpoint()?;
        Some(format!("corbaloc::{}/{}", endpoint, escape_key(NAME_SERVICE_KEY)))
    }
}

impl Drop for TransientNameService {
    fn drop(&mut self) {
        self.destroy();
    }
}
