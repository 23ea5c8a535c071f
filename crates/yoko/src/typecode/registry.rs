// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TypeCode registry: lazily built, cached TypeCodes keyed by repository id.
//!
//! Lookups hit a concurrent map without locking. On a miss the caller takes
//! a reentrant construction lock, re-checks the cache, and builds. A type
//! whose construction is already in progress on this thread (a struct that
//! contains itself through a sequence) resolves to a recursive placeholder
//! instead of recursing forever. Each id is built at most once.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;

use super::TypeCode;

/// Concurrent TypeCode cache.
pub struct TypeCodeRegistry {
    cache: DashMap<String, TypeCode>,
    /// Ids under construction; only touched while holding the lock.
    building: ReentrantMutex<RefCell<HashSet<String>>>,
    builds: AtomicU64,
}

impl Default for TypeCodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: OnceLock<TypeCodeRegistry> = OnceLock::new();

/// Removes an id from the in-progress set when construction ends or unwinds.
struct BuildingGuard<'a> {
    set: &'a RefCell<HashSet<String>>,
    id: &'a str,
}

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(self.id);
    }
}

impl TypeCodeRegistry {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
            building: ReentrantMutex::new(RefCell::new(HashSet::new())),
            builds: AtomicU64::new(0),
        }
    }

    /// Process-wide registry used by [`Helper::type_code`](crate::Helper::type_code).
    pub fn global() -> &'static TypeCodeRegistry {
        GLOBAL.get_or_init(TypeCodeRegistry::new)
    }

    /// Cached TypeCode for `id`, building it with `build` on first use.
    ///
    /// `build` receives the registry so member types resolve through the same
    /// cache. Returns a recursive placeholder when `id` is already being
    /// built further up this thread's stack.
    pub fn get_or_build<F>(&self, id: &str, build: F) -> TypeCode
    where
        F: FnOnce(&TypeCodeRegistry) -> TypeCode,
    {
        if let Some(tc) = self.lookup(id) {
            return tc;
        }

        let building = self.building.lock();
        if let Some(tc) = self.lookup(id) {
            return tc;
        }
        if building.borrow().contains(id) {
            log::trace!("[typecode] recursive reference to {}", id);
            return TypeCode::recursive(id);
        }

        building.borrow_mut().insert(id.to_string());
        let guard = BuildingGuard { set: &building, id };
        let tc = build(self);
        drop(guard);

        self.cache.insert(id.to_string(), tc.clone());
        self.builds.fetch_add(1, Ordering::Relaxed);
        log::debug!("[typecode] built {}", id);
        tc
    }

    pub fn lookup(&self, id: &str) -> Option<TypeCode> {
        self.cache.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cache.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Number of constructions performed (one per cached id).
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}
