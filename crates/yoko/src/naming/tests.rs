// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::sync::Arc;

use super::*;
use crate::exception::SystemExceptionKind;
use crate::holder::Holder;
use crate::ior::{Endpoint, Ior, ObjectRef};
use crate::stub::{CallError, ObjectStub};
use crate::transport::LoopbackConnector;
use crate::{Orb, OrbConfig};

struct Fixture {
    orb: Orb,
    service: TransientNameService,
    root: NamingContextStub,
}

fn fixture() -> Fixture {
    let connector = LoopbackConnector::new();
    let orb = Orb::with_connector(OrbConfig::default().with_port(2809), Arc::new(connector.clone())).unwrap();
    connector.register(orb.published_endpoint().unwrap(), Arc::clone(orb.dispatcher()));

    let service = TransientNameService::with_orb(orb.clone(), NameServiceConfig::default());
    let root_ref = service.initialize().unwrap();
    let root = NamingContextStub::new(&orb, root_ref);
    Fixture { orb, service, root }
}

fn name(text: &str) -> Name {
    names::to_name(text).unwrap()
}

fn thing(orb: &Orb, key: &str) -> ObjectRef {
    orb.create_reference(key.as_bytes(), "IDL:test/Thing:1.0").unwrap()
}

fn user_error<T: std::fmt::Debug>(result: Result<T, CallError<NamingError>>) -> NamingError {
    match result {
        Err(CallError::User(e)) => e,
        other => panic!("expected a naming exception, got {:?}", other),
    }
}

#[test]
fn test_bind_resolve_unbind() {
    let f = fixture();
    let printer = thing(&f.orb, "printer");

    f.root.bind(&name("printer"), &printer).unwrap();
    let resolved = f.root.resolve(&name("printer")).unwrap();
    assert!(resolved.is_equivalent(&printer));
    assert_eq!(resolved.type_id(), "IDL:test/Thing:1.0");

    assert_eq!(
        user_error(f.root.bind(&name("printer"), &printer)),
        NamingError::AlreadyBound(AlreadyBound)
    );

    f.root.unbind(&name("printer")).unwrap();
    match user_error(f.root.resolve(&name("printer"))) {
        NamingError::NotFound(e) => {
            assert_eq!(e.why, NotFoundReason::MissingNode);
            assert_eq!(e.rest_of_name, name("printer"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_empty_name_is_invalid() {
    let f = fixture();
    assert_eq!(
        user_error(f.root.resolve(&Vec::new())),
        NamingError::InvalidName(InvalidName)
    );
}

#[test]
fn test_compound_names() {
    let f = fixture();
    let dir = f.root.bind_new_context(&name("devices.dir")).unwrap();
    assert_eq!(f.service.context_count(), 2);

    let sub = NamingContextStub::new(&f.orb, dir);
    sub.bind(&name("laser"), &thing(&f.orb, "laser")).unwrap();

    let resolved = f.root.resolve_str("devices.dir/laser").unwrap();
    assert_eq!(resolved.object_key(), Some(b"laser".to_vec()));

    f.root
        .bind(&name("devices.dir/inkjet"), &thing(&f.orb, "inkjet"))
        .unwrap();
    assert!(sub.resolve(&name("inkjet")).is_ok());

    match user_error(f.root.resolve(&name("devices.dir/missing/deeper"))) {
        NamingError::NotFound(e) => {
            assert_eq!(e.why, NotFoundReason::MissingNode);
            assert_eq!(e.rest_of_name, name("missing/deeper"));
        }
        other => panic!("unexpected {:?}", other),
    }

    match user_error(f.root.resolve(&name("devices.dir/laser/x"))) {
        NamingError::NotFound(e) => {
            assert_eq!(e.why, NotFoundReason::NotContext);
            assert_eq!(e.rest_of_name, name("laser/x"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_rebind_type_checks() {
    let f = fixture();
    let ctx = f.root.new_context().unwrap();
    f.root.bind_context(&name("ctx"), &ctx).unwrap();
    f.root.bind(&name("obj"), &thing(&f.orb, "a")).unwrap();

    match user_error(f.root.rebind(&name("ctx"), &thing(&f.orb, "b"))) {
        NamingError::NotFound(e) => assert_eq!(e.why, NotFoundReason::NotObject),
        other => panic!("unexpected {:?}", other),
    }
    match user_error(f.root.rebind_context(&name("obj"), &ctx)) {
        NamingError::NotFound(e) => assert_eq!(e.why, NotFoundReason::NotContext),
        other => panic!("unexpected {:?}", other),
    }

    f.root.rebind(&name("obj"), &thing(&f.orb, "b")).unwrap();
    let resolved = f.root.resolve(&name("obj")).unwrap();
    assert_eq!(resolved.object_key(), Some(b"b".to_vec()));
    f.root.rebind(&name("fresh"), &thing(&f.orb, "c")).unwrap();
}

#[test]
fn test_list_with_iterator() {
    let f = fixture();
    for i in 0..5 {
        f.root
            .bind(&name(&format!("item{}", i)), &thing(&f.orb, "x"))
            .unwrap();
    }

    let mut bindings = Holder::new();
    let mut iterator = Holder::new();
    f.root.list(2, &mut bindings, &mut iterator).unwrap();
    let first = bindings.take().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].binding_name, name("item0"));
    assert_eq!(first[0].binding_type, BindingType::Object);

    let iterator = BindingIteratorStub::new(&f.orb, iterator.take().unwrap());
    let mut one = Holder::new();
    assert!(iterator.next_one(&mut one).unwrap());
    assert_eq!(one.get().unwrap().binding_name, name("item2"));

    let err = iterator.next_n(0, &mut Holder::new()).unwrap_err();
    assert_eq!(err.kind, SystemExceptionKind::BadParam);

    let mut batch = Holder::new();
    assert!(iterator.next_n(10, &mut batch).unwrap());
    assert_eq!(batch.get().unwrap().len(), 2);
    assert!(!iterator.next_n(10, &mut batch).unwrap());
    assert!(batch.get().unwrap().is_empty());
    assert!(!iterator.next_one(&mut one).unwrap());

    iterator.destroy().unwrap();
    assert!(iterator.non_existent().unwrap());
}

#[test]
fn test_list_everything_returns_nil_iterator() {
    let f = fixture();
    f.root.bind(&name("only"), &thing(&f.orb, "x")).unwrap();
    let mut bindings = Holder::new();
    let mut iterator = Holder::new();
    f.root.list(10, &mut bindings, &mut iterator).unwrap();
    assert_eq!(bindings.get().unwrap().len(), 1);
    assert!(iterator.get().unwrap().is_nil());
}

#[test]
fn test_destroy_contexts() {
    let f = fixture();
    let sub_ref = f.root.bind_new_context(&name("sub")).unwrap();
    let sub = NamingContextStub::new(&f.orb, sub_ref);
    sub.bind(&name("x"), &thing(&f.orb, "x")).unwrap();

    assert_eq!(user_error(sub.destroy()), NamingError::NotEmpty(NotEmpty));
    sub.unbind(&name("x")).unwrap();
    sub.destroy().unwrap();
    assert!(sub.non_existent().unwrap());
    f.root.unbind(&name("sub")).unwrap();

    let err = f.root.destroy().unwrap_err();
    assert_eq!(err.system().unwrap().kind, SystemExceptionKind::NoPermission);
}

#[test]
fn test_failed_bind_new_context_releases_context() {
    let f = fixture();
    f.root.bind(&name("taken"), &thing(&f.orb, "x")).unwrap();
    let before = f.service.context_count();
    assert_eq!(
        user_error(f.root.bind_new_context(&name("taken"))),
        NamingError::AlreadyBound(AlreadyBound)
    );
    assert_eq!(f.service.context_count(), before);
}

#[test]
fn test_unreachable_context_cannot_proceed() {
    let f = fixture();
    let dead: ObjectRef = Ior::iiop(NAMING_CONTEXT_EXT_ID, &Endpoint::new("10.255.255.1", 1), b"ctx".to_vec(), 2)
        .unwrap()
        .into();
    f.root.bind_context(&name("remote"), &dead).unwrap();

    match user_error(f.root.resolve(&name("remote/a/b"))) {
        NamingError::CannotProceed(e) => {
            assert!(e.cxt.is_equivalent(&dead));
            assert_eq!(e.rest_of_name, name("a/b"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_string_conversions_remote() {
    let f = fixture();
    let components = vec![NameComponent::new("a/b", "k"), NameComponent::new("c", "")];
    let text = f.root.to_string(&components).unwrap();
    assert_eq!(text, "a\\/b.k/c");
    assert_eq!(f.root.to_name(&text).unwrap(), components);
    assert_eq!(
        user_error(f.root.to_name("a..b")),
        NamingError::InvalidName(InvalidName)
    );
    assert_eq!(
        f.root.to_url(":host:2809", "a/b").unwrap(),
        "corbaname::host:2809#a/b"
    );
    assert_eq!(
        user_error(f.root.to_url("", "a")),
        NamingError::InvalidAddress(InvalidAddress)
    );
}

#[test]
fn test_root_reachable_through_boot_binding() {
    let f = fixture();
    f.root.bind(&name("x"), &thing(&f.orb, "x")).unwrap();

    let obj = f.orb.string_to_object("corbaloc::127.0.0.1:2809/NameService").unwrap();
    let via_boot = NamingContextStub::narrow(&f.orb, obj).unwrap();
    assert!(via_boot.resolve(&name("x")).is_ok());
    assert!(via_boot.delegate().is_forwarded());

    let initial = f.orb.resolve_initial_references("NameService").unwrap();
    assert!(initial.is_equivalent(&f.service.root_context().unwrap()));
}

#[test]
fn test_initialize_is_idempotent_and_destroy_keeps_foreign_orb() {
    let f = fixture();
    let again = f.service.initialize().unwrap();
    assert!(again.is_equivalent(&f.root.object()));
    assert_eq!(f.service.context_count(), 1);

    f.service.destroy();
    f.service.destroy();
    assert!(!f.service.is_running());
    assert!(!f.orb.is_destroyed());
    assert!(f.orb.boot_manager().resolve(b"NameService").is_none());
    assert!(f.root.non_existent().unwrap());
}
