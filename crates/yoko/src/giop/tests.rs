// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::io::Cursor;

use super::*;
use crate::exception::SystemExceptionKind;

fn request(version: Version, order: ByteOrder) -> Vec<u8> {
    let header = RequestHeader {
        request_id: 7,
        response_expected: true,
        target: TargetAddress::Key(b"obj".to_vec()),
        operation: "resolve".into(),
        service_contexts: vec![ServiceContext {
            context_id: 1,
            context_data: vec![9, 9],
        }],
    };
    let mut out = body_stream(order);
    header.write(&mut out, version).unwrap();
    out.write_double(1.5);
    frame(version, MessageType::Request, out).unwrap()
}

#[test]
fn test_header_encode_decode() {
    let header = MessageHeader {
        version: Version::V1_2,
        byte_order: ByteOrder::LittleEndian,
        message_type: MessageType::Reply,
        body_size: 0x0102,
    };
    let bytes = header.encode();
    assert_eq!(&bytes[..8], b"GIOP\x01\x02\x01\x01");
    assert_eq!(&bytes[8..], &[0x02, 0x01, 0, 0]);
    assert_eq!(MessageHeader::decode(&bytes).unwrap(), header);
}

#[test]
fn test_header_rejects_bad_magic_and_version() {
    let mut bytes = control_message(Version::V1_0, MessageType::CloseConnection);
    bytes[0] = b'X';
    let mut header = [0u8; 12];
    header.copy_from_slice(&bytes);
    assert_eq!(
        MessageHeader::decode(&header).unwrap_err().minor,
        minor::BAD_MAGIC
    );

    header[0] = b'G';
    header[5] = 9;
    assert_eq!(
        MessageHeader::decode(&header).unwrap_err().minor,
        minor::BAD_VERSION
    );
}

#[test]
fn test_fragments_rejected() {
    let mut header = MessageHeader {
        version: Version::V1_1,
        byte_order: ByteOrder::BigEndian,
        message_type: MessageType::Request,
        body_size: 0,
    }
    .encode();
    header[6] |= 0x02;
    let err = MessageHeader::decode(&header).unwrap_err();
    assert_eq!(err.kind, SystemExceptionKind::NoImplement);
    assert_eq!(err.minor, minor::FRAGMENT_UNSUPPORTED);
}

#[test]
fn test_request_roundtrip_all_versions() {
    for minor_version in 0..=2 {
        for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
            let version = Version::new(minor_version);
            let bytes = request(version, order);
            let mut message = read_message(&mut Cursor::new(bytes), 1024).unwrap();
            assert_eq!(message.header.message_type, MessageType::Request);
            assert_eq!(message.header.version, version);

            let header = RequestHeader::read(&mut message.body, version).unwrap();
            assert_eq!(header.request_id, 7);
            assert!(header.response_expected);
            assert_eq!(header.operation, "resolve");
            assert_eq!(header.target.object_key().unwrap(), b"obj");
            assert_eq!(header.service_contexts.len(), 1);
            assert_eq!(message.body.read_double().unwrap(), 1.5);
        }
    }
}

#[test]
fn test_giop_1_2_body_is_8_aligned() {
    let bytes = request(Version::V1_2, ByteOrder::BigEndian);
    let message = parse_message(&bytes, 1024).unwrap();
    let body_start = bytes.len() - 8;
    assert_eq!(body_start % 8, 0);
    assert_eq!(message.body.remaining(), bytes.len() - 12);
}

#[test]
fn test_reply_header_roundtrip() {
    for minor_version in 0..=2 {
        let version = Version::new(minor_version);
        let mut out = body_stream(ByteOrder::BigEndian);
        ReplyHeader::new(42, ReplyStatus::UserException)
            .write(&mut out, version)
            .unwrap();
        out.write_string("IDL:x/Y:1.0").unwrap();
        let bytes = frame(version, MessageType::Reply, out).unwrap();

        let mut message = parse_message(&bytes, 1024).unwrap();
        let header = ReplyHeader::read(&mut message.body, version).unwrap();
        assert_eq!(header.request_id, 42);
        assert_eq!(header.status, ReplyStatus::UserException);
        assert_eq!(message.body.read_string().unwrap(), "IDL:x/Y:1.0");
    }
}

#[test]
fn test_forward_perm_requires_1_2() {
    let mut out = body_stream(ByteOrder::BigEndian);
    assert!(ReplyHeader::new(1, ReplyStatus::LocationForwardPerm)
        .write(&mut out, Version::V1_1)
        .is_err());
}

#[test]
fn test_locate_roundtrip() {
    for version in [Version::V1_0, Version::V1_2] {
        let mut out = body_stream(ByteOrder::BigEndian);
        LocateRequestHeader {
            request_id: 3,
            target: TargetAddress::Key(b"NameService".to_vec()),
        }
        .write(&mut out, version)
        .unwrap();
        let bytes = frame(version, MessageType::LocateRequest, out).unwrap();
        let mut message = parse_message(&bytes, 1024).unwrap();
        let header = LocateRequestHeader::read(&mut message.body, version).unwrap();
        assert_eq!(header.request_id, 3);
        assert_eq!(header.target.object_key().unwrap(), b"NameService");

        let mut out = body_stream(ByteOrder::LittleEndian);
        LocateReplyHeader {
            request_id: 3,
            status: LocateStatus::ObjectHere,
        }
        .write(&mut out, version)
        .unwrap();
        let bytes = frame(version, MessageType::LocateReply, out).unwrap();
        let mut message = parse_message(&bytes, 1024).unwrap();
        let reply = LocateReplyHeader::read(&mut message.body, version).unwrap();
        assert_eq!(reply.status, LocateStatus::ObjectHere);
    }
}

#[test]
fn test_profile_addressing() {
    let ior = crate::ior::Ior::iiop(
        "IDL:x:1.0",
        &crate::ior::Endpoint::new("h", 1),
        b"k".to_vec(),
        2,
    )
    .unwrap();
    let by_profile = TargetAddress::Profile(ior.profiles[0].clone());
    assert_eq!(by_profile.object_key().unwrap(), b"k");
    let by_ref = TargetAddress::Reference {
        selected_profile: 0,
        ior,
    };
    assert_eq!(by_ref.object_key().unwrap(), b"k");
}

#[test]
fn test_read_message_eof_and_limits() {
    let err = read_message(&mut Cursor::new(Vec::new()), 1024).unwrap_err();
    assert_eq!(err.minor, minor::CONNECTION_CLOSED);

    let bytes = request(Version::V1_2, ByteOrder::BigEndian);
    let err = read_message(&mut Cursor::new(bytes.clone()), 8).unwrap_err();
    assert_eq!(err.kind, SystemExceptionKind::ImpLimit);

    let err = read_message(&mut Cursor::new(bytes[..20].to_vec()), 1024).unwrap_err();
    assert_eq!(err.kind, SystemExceptionKind::CommFailure);
}
