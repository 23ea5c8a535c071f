// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory naming contexts and binding iterators.
//!
//! Compound names are resolved one component at a time. Contexts hosted by
//! the same store are entered directly; any other context is reached
//! through a [`NamingContextStub`], and a system failure on the way turns
//! into `CannotProceed`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::names;
use super::stub::NamingContextStub;
use super::types::{
    AlreadyBound, Binding, BindingType, CannotProceed, InvalidAddress, InvalidName, Name,
    NameComponent, NamingError, NotEmpty, NotFound, NotFoundReason,
};
use super::{BINDING_ITERATOR_ID, NAMING_CONTEXT_EXT_ID, NAMING_CONTEXT_ID};
use crate::adapter::{unknown_operation, ResponseHandler, Servant};
use crate::cdr::{InputStream, OutputStream};
use crate::exception::{minor, CompletionStatus, SystemException, SystemExceptionKind};
use crate::helper::Helper;
use crate::ior::ObjectRef;
use crate::orb::{Orb, WeakOrb};
use crate::stub::CallError;

type NamingResult<T> = Result<T, CallError<NamingError>>;

fn user<T>(error: NamingError) -> NamingResult<T> {
    Err(CallError::User(error))
}

/// Contexts and iterators created by one naming service.
pub(crate) struct NamingStore {
    orb: WeakOrb,
    contexts: DashMap<Vec<u8>, Weak<TransientNamingContext>>,
    iterators: DashMap<Vec<u8>, ()>,
    next_id: AtomicU64,
}

impl NamingStore {
    pub(crate) fn new(orb: &Orb) -> Arc<Self> {
        Arc::new(Self {
            orb: orb.downgrade(),
            contexts: DashMap::new(),
            iterators: DashMap::new(),
            next_id: AtomicU64::new(1),
        })
    }

    fn orb(&self) -> Result<Orb, SystemException> {
        self.orb.upgrade().ok_or_else(|| {
            SystemException::bad_inv_order(minor::ORB_DESTROYED, "naming service ORB is gone")
        })
    }

    fn next_key(&self, orb: &Orb, prefix: &str) -> Vec<u8> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        orb.adapter().key_for_id(format!("{}{}", prefix, id).as_bytes())
    }

    /// Activate a new empty context.
    pub(crate) fn create_context(
        self: &Arc<Self>,
        root: bool,
    ) -> Result<(Arc<TransientNamingContext>, ObjectRef), SystemException> {
        let orb = self.orb()?;
        let key = self.next_key(&orb, "NC");
        let reference = orb.create_reference(&key, NAMING_CONTEXT_EXT_ID)?;
        let context = Arc::new(TransientNamingContext {
            key: key.clone(),
            reference: reference.clone(),
            root,
            store: Arc::clone(self),
            bindings: Mutex::new(BTreeMap::new()),
            destroyed: AtomicBool::new(false),
        });
        orb.adapter().activate_object_with_key(&key, context.clone())?;
        self.contexts.insert(key, Arc::downgrade(&context));
        Ok((context, reference))
    }

    fn create_iterator(self: &Arc<Self>, bindings: Vec<Binding>) -> Result<ObjectRef, SystemException> {
        let orb = self.orb()?;
        let key = self.next_key(&orb, "BI");
        let reference = orb.create_reference(&key, BINDING_ITERATOR_ID)?;
        let iterator = TransientBindingIterator {
            key: key.clone(),
            store: Arc::clone(self),
            remaining: Mutex::new(bindings.into()),
        };
        orb.adapter().activate_object_with_key(&key, Arc::new(iterator))?;
        self.iterators.insert(key, ());
        Ok(reference)
    }

    /// Context behind `obj` when it lives in this store.
    fn local_context(&self, obj: &ObjectRef) -> Option<Arc<TransientNamingContext>> {
        let key = obj.object_key()?;
        let context = self.contexts.get(&key)?.upgrade()?;
        obj.is_equivalent(&context.reference).then_some(context)
    }

    fn deactivate(&self, key: &[u8]) -> Result<(), SystemException> {
        self.contexts.remove(key);
        self.iterators.remove(key);
        self.orb()?.adapter().deactivate_object(key).map(drop)
    }

    /// Deactivate every context and iterator still alive.
    pub(crate) fn destroy_all(&self) {
        let keys: Vec<Vec<u8>> = self
            .contexts
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.iterators.iter().map(|entry| entry.key().clone()))
            .collect();
        let orb = self.orb.upgrade();
        for key in keys {
            self.contexts.remove(&key);
            self.iterators.remove(&key);
            if let Some(orb) = &orb {
                // already gone when a client destroyed it
                let _ = orb.adapter().deactivate_object(&key);
            }
        }
    }

    pub(crate) fn context_count(&self) -> usize {
        self.contexts.len()
    }
}

enum Step {
    /// Last component: operate on this context.
    Here(NameComponent),
    Local(Arc<TransientNamingContext>, Name),
    Remote(ObjectRef, Name),
}

/// `CosNaming::NamingContextExt` servant.
pub struct TransientNamingContext {
    key: Vec<u8>,
    reference: ObjectRef,
    root: bool,
    store: Arc<NamingStore>,
    bindings: Mutex<BTreeMap<NameComponent, (ObjectRef, BindingType)>>,
    /// Set and read only while `bindings` is locked.
    destroyed: AtomicBool,
}

impl TransientNamingContext {
    pub fn reference(&self) -> &ObjectRef {
        &self.reference
    }

    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.lock().is_empty()
    }

    fn step(&self, name: &[NameComponent]) -> NamingResult<Step> {
        let Some((first, rest)) = name.split_first() else {
            return user(NamingError::InvalidName(InvalidName));
        };
        if rest.is_empty() {
            return Ok(Step::Here(first.clone()));
        }

        let next = self.bindings.lock().get(first).cloned();
        match next {
            None => user(NamingError::not_found(NotFoundReason::MissingNode, name)),
            Some((_, BindingType::Object)) => {
                user(NamingError::not_found(NotFoundReason::NotContext, name))
            }
            Some((obj, BindingType::Context)) => Ok(match self.store.local_context(&obj) {
                Some(context) => Step::Local(context, rest.to_vec()),
                None => Step::Remote(obj, rest.to_vec()),
            }),
        }
    }

    /// Continue on a context served elsewhere.
    fn remote<T>(
        &self,
        cxt: ObjectRef,
        rest: &[NameComponent],
        call: impl FnOnce(&NamingContextStub) -> NamingResult<T>,
    ) -> NamingResult<T> {
        let orb = self.store.orb()?;
        let stub = NamingContextStub::new(&orb, cxt.clone());
        match call(&stub) {
            Err(CallError::System(e)) => {
                log::debug!("[naming] cannot proceed through remote context: {}", e);
                user(NamingError::cannot_proceed(cxt, rest))
            }
            other => other,
        }
    }

    fn bind(
        &self,
        name: &[NameComponent],
        obj: &ObjectRef,
        kind: BindingType,
        rebind: bool,
    ) -> NamingResult<()> {
        match self.step(name)? {
            Step::Here(component) => self.bind_here(component, obj, kind, rebind),
            Step::Local(context, rest) => context.bind(&rest, obj, kind, rebind),
            Step::Remote(cxt, rest) => self.remote(cxt, &rest, |stub| match (kind, rebind) {
                (BindingType::Object, false) => stub.bind(&rest, obj),
                (BindingType::Object, true) => stub.rebind(&rest, obj),
                (BindingType::Context, false) => stub.bind_context(&rest, obj),
                (BindingType::Context, true) => stub.rebind_context(&rest, obj),
            }),
        }
    }

    fn bind_here(
        &self,
        component: NameComponent,
        obj: &ObjectRef,
        kind: BindingType,
        rebind: bool,
    ) -> NamingResult<()> {
        let mut bindings = self.bindings.lock();
        if self.destroyed.load(Ordering::Relaxed) {
            return Err(CallError::System(SystemException::object_not_exist(
                minor::NOT_ACTIVE,
                "naming context has been destroyed",
            )));
        }
        let existing = bindings.get(&component).map(|(_, existing)| *existing);
        match existing {
            Some(_) if !rebind => return user(NamingError::AlreadyBound(AlreadyBound)),
            Some(existing) if existing != kind => {
                let why = match kind {
                    BindingType::Object => NotFoundReason::NotObject,
                    BindingType::Context => NotFoundReason::NotContext,
                };
                return user(NamingError::not_found(why, &[component]));
            }
            _ => {}
        }
        log::debug!("[naming] bound '{}.{}' ({:?})", component.id, component.kind, kind);
        bindings.insert(component, (obj.clone(), kind));
        Ok(())
    }

    fn resolve(&self, name: &[NameComponent]) -> NamingResult<ObjectRef> {
        match self.step(name)? {
            Step::Here(component) => match self.bindings.lock().get(&component) {
                Some((obj, _)) => Ok(obj.clone()),
                None => user(NamingError::not_found(NotFoundReason::MissingNode, &[component])),
            },
            Step::Local(context, rest) => context.resolve(&rest),
            Step::Remote(cxt, rest) => self.remote(cxt, &rest, |stub| stub.resolve(&rest)),
        }
    }

    fn unbind(&self, name: &[NameComponent]) -> NamingResult<()> {
        match self.step(name)? {
            Step::Here(component) => match self.bindings.lock().remove(&component) {
                Some(_) => Ok(()),
                None => user(NamingError::not_found(NotFoundReason::MissingNode, &[component])),
            },
            Step::Local(context, rest) => context.unbind(&rest),
            Step::Remote(cxt, rest) => self.remote(cxt, &rest, |stub| stub.unbind(&rest)),
        }
    }

    fn bind_new_context(&self, name: &[NameComponent]) -> NamingResult<ObjectRef> {
        let (_, reference) = self.store.create_context(false)?;
        if let Err(e) = self.bind(name, &reference, BindingType::Context, false) {
            if let Some(key) = reference.object_key() {
                let _ = self.store.deactivate(&key);
            }
            return Err(e);
        }
        Ok(reference)
    }

    fn destroy(&self) -> NamingResult<()> {
        let bindings = self.bindings.lock();
        if !bindings.is_empty() {
            return user(NamingError::NotEmpty(NotEmpty));
        }
        if self.root {
            return Err(CallError::System(
                SystemException::new(
                    SystemExceptionKind::NoPermission,
                    minor::ROOT_CONTEXT,
                    CompletionStatus::No,
                )
                .with_message("the root context cannot be destroyed"),
            ));
        }
        self.store.deactivate(&self.key)?;
        self.destroyed.store(true, Ordering::Relaxed);
        drop(bindings);
        Ok(())
    }

    fn list(&self, how_many: u32) -> Result<(Vec<Binding>, ObjectRef), SystemException> {
        let mut all: Vec<Binding> = self
            .bindings
            .lock()
            .iter()
            .map(|(component, (_, kind))| Binding {
                binding_name: vec![component.clone()],
                binding_type: *kind,
            })
            .collect();
        let first = usize::try_from(how_many).unwrap_or(usize::MAX).min(all.len());
        let rest = all.split_off(first);
        let iterator = if rest.is_empty() {
            ObjectRef::nil()
        } else {
            self.store.create_iterator(rest)?
        };
        Ok((all, iterator))
    }
}

fn write_naming_error(out: &mut OutputStream, error: &NamingError) -> Result<(), SystemException> {
    match error {
        NamingError::NotFound(e) => NotFound::write(out, e),
        NamingError::CannotProceed(e) => CannotProceed::write(out, e),
        NamingError::InvalidName(e) => InvalidName::write(out, e),
        NamingError::AlreadyBound(e) => AlreadyBound::write(out, e),
        NamingError::NotEmpty(e) => NotEmpty::write(out, e),
        NamingError::InvalidAddress(e) => InvalidAddress::write(out, e),
    }
}

/// Send `result` as a normal or user exception reply.
fn reply<T>(
    handler: &mut ResponseHandler,
    result: NamingResult<T>,
    write: impl FnOnce(&mut OutputStream, T) -> Result<(), SystemException>,
) -> Result<(), SystemException> {
    match result {
        Ok(value) => write(handler.create_reply()?, value),
        Err(CallError::User(e)) => {
            log::debug!("[naming] {}", e);
            write_naming_error(handler.create_exception_reply()?, &e)
        }
        Err(CallError::System(e)) => Err(e),
    }
}

impl Servant for TransientNamingContext {
    fn repository_ids(&self) -> &[&'static str] {
        &[NAMING_CONTEXT_EXT_ID, NAMING_CONTEXT_ID]
    }

    fn dispatch(
        &self,
        operation: &str,
        input: &mut InputStream,
        handler: &mut ResponseHandler,
    ) -> Result<(), SystemException> {
        match operation {
            "bind" | "rebind" | "bind_context" | "rebind_context" => {
                let name = Name::read(input)?;
                let obj = ObjectRef::read(input)?;
                let kind = if operation.ends_with("context") {
                    BindingType::Context
                } else {
                    BindingType::Object
                };
                let result = self.bind(&name, &obj, kind, operation.starts_with("rebind"));
                reply(handler, result, |_, ()| Ok(()))
            }
            "resolve" => {
                let name = Name::read(input)?;
                reply(handler, self.resolve(&name), |out, obj| ObjectRef::write(out, &obj))
            }
            "unbind" => {
                let name = Name::read(input)?;
                reply(handler, self.unbind(&name), |_, ()| Ok(()))
            }
            "new_context" => {
                let result = self.store.create_context(false).map(|(_, reference)| reference);
                reply(handler, result.map_err(CallError::System), |out, obj| {
                    ObjectRef::write(out, &obj)
                })
            }
            "bind_new_context" => {
                let name = Name::read(input)?;
                reply(handler, self.bind_new_context(&name), |out, obj| {
                    ObjectRef::write(out, &obj)
                })
            }
            "destroy" => reply(handler, self.destroy(), |_, ()| Ok(())),
            "list" => {
                let how_many = input.read_ulong()?;
                let result = self.list(how_many).map_err(CallError::System);
                reply(handler, result, |out, (bindings, iterator)| {
                    Vec::<Binding>::write(out, &bindings)?;
                    ObjectRef::write(out, &iterator)
                })
            }
            "to_string" => {
                let name = Name::read(input)?;
                reply(handler, names::to_string(&name).map_err(CallError::User), |out, text| {
                    out.write_string(&text)
                })
            }
            "to_name" => {
                let text = input.read_string()?;
                reply(handler, names::to_name(&text).map_err(CallError::User), |out, name| {
                    Name::write(out, &name)
                })
            }
            "to_url" => {
                let address = input.read_string()?;
                let text = input.read_string()?;
                let result = names::to_url(&address, &text).map_err(CallError::User);
                reply(handler, result, |out, url| out.write_string(&url))
            }
            "resolve_str" => {
                let text = input.read_string()?;
                let result = names::to_name(&text)
                    .map_err(CallError::User)
                    .and_then(|name| self.resolve(&name));
                reply(handler, result, |out, obj| ObjectRef::write(out, &obj))
            }
            other => Err(unknown_operation(other)),
        }
    }
}

/// `CosNaming::BindingIterator` servant over a snapshot of bindings.
pub struct TransientBindingIterator {
    key: Vec<u8>,
    store: Arc<NamingStore>,
    remaining: Mutex<VecDeque<Binding>>,
}

impl Servant for TransientBindingIterator {
    fn repository_ids(&self) -> &[&'static str] {
        &[BINDING_ITERATOR_ID]
    }

    fn dispatch(
        &self,
        operation: &str,
        input: &mut InputStream,
        handler: &mut ResponseHandler,
    ) -> Result<(), SystemException> {
        match operation {
            "next_one" => {
                let next = self.remaining.lock().pop_front();
                let out = handler.create_reply()?;
                out.write_boolean(next.is_some());
                Binding::write(out, &next.unwrap_or_default())
            }
            "next_n" => {
                let how_many = input.read_ulong()?;
                if how_many == 0 {
                    return Err(SystemException::bad_param(
                        minor::ZERO_COUNT,
                        "next_n requires a non-zero count",
                    ));
                }
                let batch: Vec<Binding> = {
                    let mut remaining = self.remaining.lock();
                    let take = usize::try_from(how_many).unwrap_or(usize::MAX).min(remaining.len());
                    remaining.drain(..take).collect()
                };
                let out = handler.create_reply()?;
                out.write_boolean(!batch.is_empty());
                Vec::<Binding>::write(out, &batch)
            }
            "destroy" => self.store.deactivate(&self.key),
            other => Err(unknown_operation(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackConnector;
    use crate::OrbConfig;

    fn store() -> (Orb, Arc<NamingStore>) {
        let orb = Orb::with_connector(OrbConfig::default().with_port(2809), Arc::new(LoopbackConnector::new()))
            .unwrap();
        let store = NamingStore::new(&orb);
        (orb, store)
    }

    fn component(id: &str) -> Vec<NameComponent> {
        vec![NameComponent::new(id, "")]
    }

    #[test]
    fn test_bind_after_destroy_is_rejected() {
        let (orb, store) = store();
        let (context, _) = store.create_context(false).unwrap();
        let target = orb.create_reference(b"target", "IDL:test/Thing:1.0").unwrap();

        context.destroy().unwrap();
        assert_eq!(store.context_count(), 0);

        // A request that already reached the servant must not land in it
        let err = context
            .bind(&component("late"), &target, BindingType::Object, false)
            .unwrap_err();
        let err = err.system().unwrap();
        assert_eq!(err.kind, SystemExceptionKind::ObjectNotExist);
        assert!(context.is_empty());
        orb.destroy();
    }

    #[test]
    fn test_destroy_keeps_non_empty_context() {
        let (orb, store) = store();
        let (context, _) = store.create_context(false).unwrap();
        let target = orb.create_reference(b"target", "IDL:test/Thing:1.0").unwrap();
        context
            .bind(&component("x"), &target, BindingType::Object, false)
            .unwrap();

        assert!(matches!(
            context.destroy(),
            Err(CallError::User(NamingError::NotEmpty(_)))
        ));
        assert_eq!(store.context_count(), 1);
        context
            .bind(&component("y"), &target, BindingType::Object, false)
            .unwrap();
        assert_eq!(context.len(), 2);
        orb.destroy();
    }
}
