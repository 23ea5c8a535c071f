// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The ORB: configuration, client connections, the object adapter and the
//! optional listening server, shared behind a cheap cloneable handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex, RwLock};

use crate::adapter::{BootManager, ObjectAdapter, OrbServer, RequestDispatcher, Servant};
use crate::config::{OrbConfig, NAME_SERVICE_ID};
use crate::exception::{minor, SystemException};
use crate::ior::{Corbaloc, CorbalocAddress, Endpoint, Ior, ObjectRef, OBJECT_ID};
use crate::transport::{ConnectionGuard, ConnectionPool, Connector, TcpConnector};
use crate::typecode::TypeCodeRegistry;

struct OrbInner {
    config: OrbConfig,
    pool: ConnectionPool,
    adapter: Arc<ObjectAdapter>,
    boot: Arc<BootManager>,
    dispatcher: Arc<RequestDispatcher>,
    server: Mutex<Option<OrbServer>>,
    initial_refs: RwLock<HashMap<String, ObjectRef>>,
    request_id: AtomicU32,
    destroyed: AtomicBool,
    stopped: Mutex<bool>,
    stopped_cv: Condvar,
}

/// Handle to an ORB instance. Clones share the same ORB.
#[derive(Clone)]
pub struct Orb {
    inner: Arc<OrbInner>,
}

/// Non-owning ORB handle, held by servants to avoid reference cycles.
#[derive(Clone)]
pub struct WeakOrb {
    inner: Weak<OrbInner>,
}

impl WeakOrb {
    pub fn upgrade(&self) -> Option<Orb> {
        self.inner.upgrade().map(|inner| Orb { inner })
    }
}

impl Orb {
    /// Create an ORB using TCP connections.
    pub fn init(config: OrbConfig) -> Result<Orb, SystemException> {
        let connector = TcpConnector::new(
            config.connect_timeout(),
            config.read_timeout(),
            config.max_message_size,
        );
        Self::with_connector(config, Arc::new(connector))
    }

    /// Create an ORB with a custom client transport.
    pub fn with_connector(config: OrbConfig, connector: Arc<dyn Connector>) -> Result<Orb, SystemException> {
        config.validate()?;
        let adapter = Arc::new(ObjectAdapter::new("RootPOA"));
        let boot = Arc::new(BootManager::new());
        let dispatcher = Arc::new(RequestDispatcher::new(
            Arc::clone(&adapter),
            Arc::clone(&boot),
            config.byte_order,
        ));
        let pool = ConnectionPool::new(connector, config.pool_idle_per_endpoint);

        log::debug!(
            "[orb] initialized (GIOP 1.{}, {:?}, remarshal limit {:?})",
            config.giop_minor,
            config.byte_order,
            config.max_remarshal
        );
        Ok(Orb {
            inner: Arc::new(OrbInner {
                config,
                pool,
                adapter,
                boot,
                dispatcher,
                server: Mutex::new(None),
                initial_refs: RwLock::new(HashMap::new()),
                request_id: AtomicU32::new(1),
                destroyed: AtomicBool::new(false),
                stopped: Mutex::new(false),
                stopped_cv: Condvar::new(),
            }),
        })
    }

    pub fn downgrade(&self) -> WeakOrb {
        WeakOrb {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> &OrbConfig {
        &self.inner.config
    }

    pub fn adapter(&self) -> &Arc<ObjectAdapter> {
        &self.inner.adapter
    }

    pub fn boot_manager(&self) -> &Arc<BootManager> {
        &self.inner.boot
    }

    pub fn dispatcher(&self) -> &Arc<RequestDispatcher> {
        &self.inner.dispatcher
    }

    pub fn type_registry(&self) -> &'static TypeCodeRegistry {
        TypeCodeRegistry::global()
    }

    /// Start the server if needed and return its published endpoint.
    pub fn listen(&self) -> Result<Endpoint, SystemException> {
        self.check_alive()?;
        let mut server = self.inner.server.lock();
        if server.is_none() {
            let config = &self.inner.config;
            *server = Some(OrbServer::bind(
                &config.host,
                config.port,
                Arc::clone(&self.inner.dispatcher),
                config.max_message_size,
            )?);
            *self.inner.stopped.lock() = false;
        }
        drop(server);
        self.published_endpoint().ok_or_else(|| {
            SystemException::internal(minor::NOT_LISTENING, "server endpoint unavailable")
        })
    }

    /// Address the server is bound to, if listening.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.inner.server.lock().as_ref().map(|server| {
            let addr = server.local_addr();
            Endpoint::new(addr.ip().to_string(), addr.port())
        })
    }

    /// Endpoint written into references: the server's port when listening,
    /// otherwise the configured fixed port.
    pub fn published_endpoint(&self) -> Option<Endpoint> {
        let config = &self.inner.config;
        let port = match self.inner.server.lock().as_ref() {
            Some(server) => server.local_addr().port(),
            None if config.port != 0 => config.port,
            None => return None,
        };
        Some(Endpoint::new(config.published_host(), port))
    }

    /// Reference to the object with `key` on this ORB.
    pub fn create_reference(&self, key: &[u8], type_id: &str) -> Result<ObjectRef, SystemException> {
        let endpoint = self.published_endpoint().ok_or_else(|| {
            SystemException::bad_inv_order(
                minor::NOT_LISTENING,
                "ORB has no published endpoint; call listen() first",
            )
        })?;
        Ok(Ior::iiop(type_id, &endpoint, key.to_vec(), self.inner.config.giop_minor)?.into())
    }

    /// Activate `servant` under a generated key and return its reference.
    pub fn activate(&self, servant: Arc<dyn Servant>) -> Result<ObjectRef, SystemException> {
        self.check_alive()?;
        let type_id = servant.repository_ids().first().copied().unwrap_or(OBJECT_ID);
        let key = self.inner.adapter.activate_object(servant)?;
        self.create_reference(&key, type_id)
    }

    /// Parse `IOR:...`, `corbaloc:...` or `corbaloc:rir:/<name>`.
    pub fn string_to_object(&self, text: &str) -> Result<ObjectRef, SystemException> {
        let text = text.trim();
        if text.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("IOR:")) {
            return Ok(Ior::from_ior_string(text)?.into());
        }
        if text.get(..9).is_some_and(|p| p.eq_ignore_ascii_case("corbaloc:")) {
            let loc = Corbaloc::parse(text)?;
            if loc.addresses == [CorbalocAddress::Rir] {
                let name = if loc.key.is_empty() {
                    NAME_SERVICE_ID.to_string()
                } else {
                    String::from_utf8_lossy(&loc.key).into_owned()
                };
                return self.resolve_initial_references(&name);
            }
            return Ok(loc.to_ior(OBJECT_ID)?.into());
        }
        Err(SystemException::bad_param(
            minor::BAD_URL,
            format!("unsupported object URL '{}'", text),
        ))
    }

    pub fn object_to_string(&self, obj: &ObjectRef) -> Result<String, SystemException> {
        obj.ior().to_ior_string(self.inner.config.byte_order)
    }

    pub fn register_initial_reference(&self, name: &str, obj: ObjectRef) -> Result<(), SystemException> {
        if name.is_empty() {
            return Err(SystemException::bad_param(
                minor::INVALID_NAME,
                "empty initial reference name",
            ));
        }
        self.inner.initial_refs.write().insert(name.to_string(), obj);
        Ok(())
    }

    pub fn unregister_initial_reference(&self, name: &str) -> Option<ObjectRef> {
        self.inner.initial_refs.write().remove(name)
    }

    /// Registered reference, else the configured URL for `name`.
    pub fn resolve_initial_references(&self, name: &str) -> Result<ObjectRef, SystemException> {
        self.check_alive()?;
        if let Some(obj) = self.inner.initial_refs.read().get(name) {
            return Ok(obj.clone());
        }
        let url = self.inner.config.initial_references.get(name).ok_or_else(|| {
            SystemException::bad_param(
                minor::INVALID_INIT_REF,
                format!("no initial reference '{}'", name),
            )
        })?;
        if url.trim_start().to_ascii_lowercase().starts_with("corbaloc:rir:") {
            return Err(SystemException::bad_param(
                minor::INVALID_INIT_REF,
                format!("initial reference '{}' refers to itself", name),
            ));
        }
        self.string_to_object(url)
    }

    pub fn list_initial_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.initial_refs.read().keys().cloned().collect();
        for name in self.inner.config.initial_references.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort();
        names
    }

    /// Exclusive connection to `endpoint` for one invocation.
    pub fn checkout(&self, endpoint: &Endpoint) -> Result<ConnectionGuard, SystemException> {
        self.check_alive()?;
        self.inner.pool.checkout(endpoint)
    }

    pub fn next_request_id(&self) -> u32 {
        self.inner.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Block the calling thread until [`shutdown`](Self::shutdown).
    pub fn run(&self) -> Result<(), SystemException> {
        self.check_alive()?;
        let mut stopped = self.inner.stopped.lock();
        while !*stopped {
            self.inner.stopped_cv.wait(&mut stopped);
        }
        Ok(())
    }

    /// Stop the server and release threads blocked in [`run`](Self::run).
    /// Client invocations keep working.
    pub fn shutdown(&self) {
        if let Some(server) = self.inner.server.lock().take() {
            server.shutdown();
        }
        *self.inner.stopped.lock() = true;
        self.inner.stopped_cv.notify_all();
    }

    /// Shut down and release every resource. Idempotent; afterwards all
    /// operations fail with BAD_INV_ORDER.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown();
        self.inner.adapter.deactivate_all();
        self.inner.pool.clear();
        self.inner.initial_refs.write().clear();
        log::debug!("[orb] destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    pub fn check_alive(&self) -> Result<(), SystemException> {
        if self.is_destroyed() {
            return Err(SystemException::bad_inv_order(
                minor::ORB_DESTROYED,
                "ORB has been destroyed",
            ));
        }
        Ok(())
    }

    /// Both handles refer to the same ORB.
    pub fn same_orb(&self, other: &Orb) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
