// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Idle connection pool with scoped checkout.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Connection, Connector};
use crate::exception::SystemException;
use crate::ior::Endpoint;

struct PoolInner {
    connector: Arc<dyn Connector>,
    idle: Mutex<HashMap<Endpoint, Vec<Box<dyn Connection>>>>,
    max_idle_per_endpoint: usize,
}

/// Per-endpoint idle connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub fn new(connector: Arc<dyn Connector>, max_idle_per_endpoint: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                connector,
                idle: Mutex::new(HashMap::new()),
                max_idle_per_endpoint,
            }),
        }
    }

    /// Reuse an idle connection to `endpoint` or open a new one.
    pub fn checkout(&self, endpoint: &Endpoint) -> Result<ConnectionGuard, SystemException> {
        let reused = self
            .inner
            .idle
            .lock()
            .get_mut(endpoint)
            .and_then(|conns| conns.pop());

        let (conn, reused) = match reused {
            Some(conn) => (conn, true),
            None => (self.inner.connector.connect(endpoint)?, false),
        };
        Ok(ConnectionGuard {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            healthy: true,
            reused,
        })
    }

    /// Number of idle connections held for `endpoint`.
    pub fn idle_count(&self, endpoint: &Endpoint) -> usize {
        self.inner.idle.lock().get(endpoint).map_or(0, Vec::len)
    }

    /// Drop every idle connection.
    pub fn clear(&self) {
        self.inner.idle.lock().clear();
    }
}

/// Exclusive use of a pooled connection.
///
/// Dropping the guard returns a healthy connection to the pool and closes
/// one marked broken.
pub struct ConnectionGuard {
    conn: Option<Box<dyn Connection>>,
    pool: Arc<PoolInner>,
    healthy: bool,
    reused: bool,
}

impl ConnectionGuard {
    /// Taken from the idle list rather than freshly connected; the peer may
    /// have closed it meanwhile.
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    /// The connection's state is unknown: close it on release.
    pub fn mark_broken(&mut self) {
        self.healthy = false;
    }
}

impl Deref for ConnectionGuard {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        // Only `drop` takes the connection out
        match &self.conn {
            Some(conn) => conn.as_ref(),
            None => unreachable!("connection taken before drop"),
        }
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.conn {
            Some(conn) => conn.as_mut(),
            None => unreachable!("connection taken before drop"),
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if !self.healthy {
            log::debug!("[transport] discarding broken connection to {}", conn.endpoint());
            return;
        }
        let mut idle = self.pool.idle.lock();
        let conns = idle.entry(conn.endpoint().clone()).or_default();
        if conns.len() < self.pool.max_idle_per_endpoint {
            conns.push(conn);
        }
    }
}
