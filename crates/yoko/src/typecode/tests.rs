// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use super::*;
use crate::cdr::{ByteOrder, OutputStream};

fn point(id: &str, first: &str) -> TypeCode {
    TypeCode::structure(
        id,
        "Point",
        vec![
            StructMember::new(first, TypeDesc::Long.into()),
            StructMember::new("y", TypeDesc::Long.into()),
        ],
    )
}

/// `struct Node { long value; sequence<Node> children; }`
fn node_type(registry: &TypeCodeRegistry) -> TypeCode {
    registry.get_or_build("IDL:test/Node:1.0", |registry| {
        TypeCode::structure(
            "IDL:test/Node:1.0",
            "Node",
            vec![
                StructMember::new("value", TypeDesc::Long.into()),
                StructMember::new("children", TypeCode::sequence(node_type(registry), 0)),
            ],
        )
    })
}

#[test]
fn test_kind_values() {
    assert_eq!(TcKind::from_u32(0), Some(TcKind::Null));
    assert_eq!(TcKind::from_u32(15), Some(TcKind::Struct));
    assert_eq!(TcKind::from_u32(22), Some(TcKind::Except));
    assert_eq!(TcKind::from_u32(33), Some(TcKind::LocalInterface));
    assert_eq!(TcKind::from_u32(34), None);
    assert_eq!(TcKind::Alias as u32, 21);
}

#[test]
fn test_accessors() {
    let tc = point("IDL:test/Point:1.0", "x");
    assert_eq!(tc.kind(), TcKind::Struct);
    assert_eq!(tc.id(), Some("IDL:test/Point:1.0"));
    assert_eq!(tc.name(), Some("Point"));
    assert_eq!(tc.member_count(), Some(2));
    assert_eq!(tc.member_name(0), Some("x"));
    assert_eq!(tc.member_type(1).map(TypeCode::kind), Some(TcKind::Long));
    assert_eq!(tc.content_type(), None);

    let seq = TypeCode::sequence(TypeDesc::Octet.into(), 16);
    assert_eq!(seq.length(), Some(16));
    assert_eq!(seq.content_type().map(TypeCode::kind), Some(TcKind::Octet));
    assert_eq!(seq.to_string(), "sequence<Octet, 16>");
}

#[test]
fn test_equal_vs_equivalent() {
    let a = point("IDL:test/Point:1.0", "x");
    let renamed = point("IDL:test/Point:1.0", "first");
    assert!(!a.equal(&renamed));
    assert!(a.equivalent(&renamed));

    let other_id = point("IDL:test/Other:1.0", "x");
    assert!(!a.equivalent(&other_id));

    // Anonymous ids fall back to structural comparison
    let anon = point("", "px");
    assert!(a.equivalent(&anon));
}

#[test]
fn test_alias_equivalence() {
    let long: TypeCode = TypeDesc::Long.into();
    let alias = TypeCode::alias("IDL:test/Count:1.0", "Count", long.clone());
    let nested = TypeCode::alias("IDL:test/Total:1.0", "Total", alias.clone());

    assert!(!alias.equal(&long));
    assert!(alias.equivalent(&long));
    assert!(nested.equivalent(&long));
    assert!(!nested.equivalent(&TypeDesc::Short.into()));
}

#[test]
fn test_sequence_bound_matters() {
    let unbounded = TypeCode::sequence(TypeDesc::Long.into(), 0);
    let bounded = TypeCode::sequence(TypeDesc::Long.into(), 4);
    assert!(!unbounded.equivalent(&bounded));
    assert!(unbounded.equivalent(&TypeCode::sequence(TypeDesc::Long.into(), 0)));
}

#[test]
fn test_wire_roundtrip_complex() {
    let tc = TypeCode::structure(
        "IDL:test/Record:1.0",
        "Record",
        vec![
            StructMember::new("name", TypeCode::string(0)),
            StructMember::new(
                "state",
                TypeCode::enumeration(
                    "IDL:test/State:1.0",
                    "State",
                    vec!["ON".into(), "OFF".into()],
                ),
            ),
            StructMember::new(
                "tags",
                TypeCode::alias(
                    "IDL:test/Tags:1.0",
                    "Tags",
                    TypeCode::sequence(TypeCode::string(8), 0),
                ),
            ),
            StructMember::new("matrix", TypeCode::array(TypeDesc::Double.into(), 9)),
            StructMember::new("target", TypeCode::object_ref("IDL:test/Target:1.0", "Target")),
        ],
    );

    for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
        let mut out = OutputStream::new(order);
        write_type_code(&mut out, &tc).unwrap();
        let decoded = read_type_code(&mut out.create_input_stream()).unwrap();
        assert!(decoded.equal(&tc));
    }
}

#[test]
fn test_wire_recursive_indirection() {
    let registry = TypeCodeRegistry::new();
    let node = node_type(&registry);

    // Message bodies start at offset 12; indirection must survive that origin
    let mut out = OutputStream::with_origin(ByteOrder::BigEndian, 12);
    out.write_octet(1);
    write_type_code(&mut out, &node).unwrap();

    let mut input = out.create_input_stream();
    input.read_octet().unwrap();
    let decoded = read_type_code(&mut input).unwrap();
    assert!(decoded.equal(&node));

    let children = decoded.member_type(1).unwrap();
    let element = children.content_type().unwrap();
    assert!(element.is_recursive());
    assert_eq!(element.id(), Some("IDL:test/Node:1.0"));
}

#[test]
fn test_dangling_recursive_placeholder_rejected() {
    let mut out = OutputStream::new(ByteOrder::BigEndian);
    let err = write_type_code(&mut out, &TypeCode::recursive("IDL:test/Lost:1.0")).unwrap_err();
    assert_eq!(err.kind, crate::SystemExceptionKind::BadTypecode);
}

#[test]
fn test_unknown_kind_rejected() {
    let mut out = OutputStream::new(ByteOrder::BigEndian);
    out.write_ulong(99);
    assert!(read_type_code(&mut out.create_input_stream()).is_err());
}

#[test]
fn test_registry_caches() {
    let registry = TypeCodeRegistry::new();
    let builds = AtomicUsize::new(0);
    let build = |_: &TypeCodeRegistry| {
        builds.fetch_add(1, Ordering::SeqCst);
        point("IDL:test/Point:1.0", "x")
    };

    let first = registry.get_or_build("IDL:test/Point:1.0", build);
    let second = registry.get_or_build("IDL:test/Point:1.0", |_| unreachable!());
    assert!(first.equal(&second));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
    assert!(registry.contains("IDL:test/Point:1.0"));
}

#[test]
fn test_registry_recursive_placeholder() {
    let registry = TypeCodeRegistry::new();
    let node = node_type(&registry);

    let element = node.member_type(1).and_then(TypeCode::content_type).unwrap();
    assert_eq!(
        element.desc(),
        &TypeDesc::Recursive {
            id: "IDL:test/Node:1.0".into()
        }
    );
    assert_eq!(registry.build_count(), 1);
    // The placeholder never leaks into the cache
    assert!(!registry.lookup("IDL:test/Node:1.0").unwrap().is_recursive());
}

#[test]
fn test_registry_race_builds_once() {
    let registry = Arc::new(TypeCodeRegistry::new());
    let builds = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let builds = Arc::clone(&builds);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get_or_build("IDL:test/Point:1.0", |_| {
                    builds.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(std::time::Duration::from_millis(5));
                    point("IDL:test/Point:1.0", "x")
                })
            })
        })
        .collect();

    let results: Vec<TypeCode> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(results.windows(2).all(|w| w[0].equal(&w[1])));
}

#[test]
fn test_registry_recursive_race() {
    let registry = Arc::new(TypeCodeRegistry::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || node_type(&registry))
        })
        .collect();

    for handle in handles {
        let node = handle.join().unwrap();
        assert!(!node.is_recursive());
        assert_eq!(node.id(), Some("IDL:test/Node:1.0"));
    }
    assert_eq!(registry.build_count(), 1);
}

#[test]
fn test_registry_panicking_build_does_not_poison() {
    let registry = TypeCodeRegistry::new();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        registry.get_or_build("IDL:test/Boom:1.0", |_| panic!("boom"))
    }));
    assert!(result.is_err());

    // The id is no longer marked in progress
    let tc = registry.get_or_build("IDL:test/Boom:1.0", |_| point("IDL:test/Boom:1.0", "x"));
    assert!(!tc.is_recursive());
}

#[test]
fn test_deeply_nested_type_code_rejected() {
    let nested = |depth: usize| {
        (0..depth).fold(TypeCode::from(TypeDesc::Long), |tc, _| TypeCode::sequence(tc, 0))
    };

    let mut out = OutputStream::new(ByteOrder::BigEndian);
    write_type_code(&mut out, &nested(100)).unwrap();
    let decoded = read_type_code(&mut out.create_input_stream()).unwrap();
    assert!(decoded.equal(&nested(100)));

    let mut out = OutputStream::new(ByteOrder::BigEndian);
    write_type_code(&mut out, &nested(crate::config::MAX_NESTING + 1)).unwrap();
    let err = read_type_code(&mut out.create_input_stream()).unwrap_err();
    assert_eq!(err.kind, crate::exception::SystemExceptionKind::Marshal);
    assert_eq!(err.minor, crate::exception::minor::NESTING_TOO_DEEP);
}
