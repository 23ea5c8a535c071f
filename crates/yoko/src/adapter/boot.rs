// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Boot manager: well-known object keys resolved by forwarding.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::ior::ObjectRef;

/// Maps well-known keys (e.g. `NameService`) to the objects they stand for.
///
/// A request for a key with no active servant is answered with a location
/// forward to the bound reference, which is what makes
/// `corbaloc::host:port/NameService` work.
#[derive(Default)]
pub struct BootManager {
    bindings: RwLock<HashMap<Vec<u8>, ObjectRef>>,
}

impl BootManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key`, replacing any previous binding.
    pub fn add_binding(&self, key: &[u8], obj: ObjectRef) {
        log::debug!(
            "[boot] binding '{}' -> {}",
            String::from_utf8_lossy(key),
            obj.type_id()
        );
        self.bindings.write().insert(key.to_vec(), obj);
    }

    pub fn remove_binding(&self, key: &[u8]) -> Option<ObjectRef> {
        self.bindings.write().remove(key)
    }

    pub fn resolve(&self, key: &[u8]) -> Option<ObjectRef> {
        let found = self.bindings.read().get(key).cloned();
        log::trace!(
            "[boot] lookup '{}': {}",
            String::from_utf8_lossy(key),
            if found.is_some() { "found" } else { "none" }
        );
        found
    }

    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.bindings.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ior::{Endpoint, Ior};

    #[test]
    fn test_bind_resolve_remove() {
        let boot = BootManager::new();
        let obj: ObjectRef = Ior::iiop("IDL:x:1.0", &Endpoint::new("h", 2809), b"k".to_vec(), 2)
            .unwrap()
            .into();
        assert!(boot.resolve(b"NameService").is_none());

        boot.add_binding(b"NameService", obj.clone());
        assert_eq!(boot.resolve(b"NameService"), Some(obj.clone()));
        assert_eq!(boot.keys(), vec![b"NameService".to_vec()]);

        assert_eq!(boot.remove_binding(b"NameService"), Some(obj));
        assert!(boot.resolve(b"NameService").is_none());
    }
}
