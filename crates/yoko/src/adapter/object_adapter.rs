// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Active object map.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::Servant;
use crate::exception::{minor, SystemException};
use crate::ior::ObjectRef;
use crate::policy::{find_policy, LifespanPolicy, LifespanPolicyValue, Policy};

/// Result of looking up an object key.
pub enum Lookup {
    Active(Arc<dyn Servant>),
    Forward(ObjectRef),
    Unknown,
}

/// Maps object keys to servants.
///
/// Transient adapters prefix generated keys with a random instance id, so a
/// key issued by a previous process never reaches a new servant. Persistent
/// adapters issue stable keys.
pub struct ObjectAdapter {
    name: String,
    lifespan: LifespanPolicyValue,
    instance: u64,
    servants: DashMap<Vec<u8>, Arc<dyn Servant>>,
    forwards: DashMap<Vec<u8>, ObjectRef>,
    next_id: AtomicU64,
}

impl ObjectAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_policies(name, &[])
    }

    pub fn with_policies(name: impl Into<String>, policies: &[Arc<dyn Policy>]) -> Self {
        let lifespan = find_policy::<LifespanPolicy>(policies)
            .map(LifespanPolicy::value)
            .unwrap_or_default();
        Self {
            name: name.into(),
            lifespan,
            instance: fastrand::u64(..),
            servants: DashMap::new(),
            forwards: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifespan(&self) -> LifespanPolicyValue {
        self.lifespan
    }

    /// Object key for a user-chosen object id.
    pub fn key_for_id(&self, object_id: &[u8]) -> Vec<u8> {
        let mut key = match self.lifespan {
            LifespanPolicyValue::Transient => format!("{}/{:016x}/", self.name, self.instance),
            LifespanPolicyValue::Persistent => format!("{}/", self.name),
        }
        .into_bytes();
        key.extend_from_slice(object_id);
        key
    }

    /// Activate under the key derived from `object_id`; returns the key.
    pub fn activate_object_with_id(
        &self,
        object_id: &[u8],
        servant: Arc<dyn Servant>,
    ) -> Result<Vec<u8>, SystemException> {
        let key = self.key_for_id(object_id);
        self.activate_object_with_key(&key, servant)?;
        Ok(key)
    }

    /// Activate under a generated object id; returns the key.
    pub fn activate_object(&self, servant: Arc<dyn Servant>) -> Result<Vec<u8>, SystemException> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.activate_object_with_id(id.to_string().as_bytes(), servant)
    }

    /// Activate under an exact object key.
    pub fn activate_object_with_key(
        &self,
        key: &[u8],
        servant: Arc<dyn Servant>,
    ) -> Result<(), SystemException> {
        match self.servants.entry(key.to_vec()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(SystemException::obj_adapter(
                minor::ALREADY_ACTIVE,
                format!("object key '{}' already active", String::from_utf8_lossy(key)),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                log::debug!(
                    "[adapter] {} activated '{}' ({})",
                    self.name,
                    String::from_utf8_lossy(key),
                    servant.repository_ids().first().copied().unwrap_or("")
                );
                slot.insert(servant);
                Ok(())
            }
        }
    }

    pub fn deactivate_object(&self, key: &[u8]) -> Result<Arc<dyn Servant>, SystemException> {
        let (_, servant) = self.servants.remove(key).ok_or_else(|| {
            SystemException::obj_adapter(
                minor::NOT_ACTIVE,
                format!("object key '{}' not active", String::from_utf8_lossy(key)),
            )
        })?;
        log::debug!("[adapter] {} deactivated '{}'", self.name, String::from_utf8_lossy(key));
        Ok(servant)
    }

    /// Drop every servant and forward.
    pub fn deactivate_all(&self) {
        self.servants.clear();
        self.forwards.clear();
    }

    pub fn servant(&self, key: &[u8]) -> Option<Arc<dyn Servant>> {
        self.servants.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn is_active(&self, key: &[u8]) -> bool {
        self.servants.contains_key(key)
    }

    pub fn active_count(&self) -> usize {
        self.servants.len()
    }

    /// Answer requests for `key` with a location forward to `target`.
    pub fn set_forward(&self, key: &[u8], target: ObjectRef) {
        self.forwards.insert(key.to_vec(), target);
    }

    pub fn clear_forward(&self, key: &[u8]) {
        self.forwards.remove(key);
    }

    pub fn lookup(&self, key: &[u8]) -> Lookup {
        if let Some(target) = self.forwards.get(key) {
            return Lookup::Forward(target.value().clone());
        }
        match self.servant(key) {
            Some(servant) => Lookup::Active(servant),
            None => Lookup::Unknown,
        }
    }
}
