// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Turns incoming GIOP messages into replies.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::{BootManager, Lookup, ObjectAdapter, ResponseHandler, Servant};
use crate::cdr::{ByteOrder, InputStream};
use crate::exception::{minor, CompletionStatus, SystemException};
use crate::giop::{
    body_stream, control_message, frame, LocateReplyHeader, LocateRequestHeader, LocateStatus,
    Message, MessageType, ReplyHeader, ReplyStatus, RequestHeader, ServiceContext, Version,
};
use crate::ior::ObjectRef;
use crate::policy::{PolicyType, INVOCATION_POLICIES};

/// What to send back for one incoming message.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub reply: Option<Vec<u8>>,
    /// Close the connection after sending `reply`.
    pub close: bool,
}

impl DispatchOutcome {
    fn reply(bytes: Vec<u8>) -> Self {
        Self {
            reply: Some(bytes),
            close: false,
        }
    }

    fn message_error(version: Version) -> Self {
        Self {
            reply: Some(control_message(version, MessageType::MessageError)),
            close: true,
        }
    }
}

/// Routes requests to servants of an [`ObjectAdapter`].
pub struct RequestDispatcher {
    adapter: Arc<ObjectAdapter>,
    boot: Arc<BootManager>,
    byte_order: ByteOrder,
}

enum Target {
    Servant(Arc<dyn Servant>),
    Forward(ObjectRef),
    Missing,
}

impl RequestDispatcher {
    pub fn new(adapter: Arc<ObjectAdapter>, boot: Arc<BootManager>, byte_order: ByteOrder) -> Self {
        Self {
            adapter,
            boot,
            byte_order,
        }
    }

    pub fn adapter(&self) -> &Arc<ObjectAdapter> {
        &self.adapter
    }

    pub fn boot_manager(&self) -> &Arc<BootManager> {
        &self.boot
    }

    pub fn handle(&self, message: Message) -> DispatchOutcome {
        let version = message.header.version;
        let mut body = message.body;
        match message.header.message_type {
            MessageType::Request => self.handle_request(&mut body, version),
            MessageType::LocateRequest => self.handle_locate(&mut body, version),
            MessageType::CancelRequest => DispatchOutcome::default(),
            MessageType::CloseConnection => DispatchOutcome {
                reply: None,
                close: true,
            },
            MessageType::MessageError => {
                log::warn!("[dispatch] peer reported a message error");
                DispatchOutcome {
                    reply: None,
                    close: true,
                }
            }
            other => {
                log::warn!("[dispatch] unexpected {:?} message from client", other);
                DispatchOutcome::message_error(version)
            }
        }
    }

    fn resolve(&self, key: &[u8]) -> Target {
        match self.adapter.lookup(key) {
            Lookup::Active(servant) => Target::Servant(servant),
            Lookup::Forward(obj) => Target::Forward(obj),
            Lookup::Unknown => match self.boot.resolve(key) {
                Some(obj) => {
                    log::debug!(
                        "[dispatch] boot forward for '{}'",
                        String::from_utf8_lossy(key)
                    );
                    Target::Forward(obj)
                }
                None => Target::Missing,
            },
        }
    }

    fn handle_request(&self, body: &mut InputStream, version: Version) -> DispatchOutcome {
        let header = match RequestHeader::read(body, version) {
            Ok(header) => header,
            Err(e) => {
                log::warn!("[dispatch] malformed request header: {}", e);
                return DispatchOutcome::message_error(version);
            }
        };
        log::trace!(
            "[dispatch] request {} '{}' (GIOP 1.{})",
            header.request_id,
            header.operation,
            version.minor
        );

        let result = self.invoke(&header, body, version);
        if !header.response_expected {
            if let Err(e) = result {
                log::debug!("[dispatch] oneway '{}' failed: {}", header.operation, e);
            }
            return DispatchOutcome::default();
        }

        let reply = match result {
            Ok(bytes) => Ok(bytes),
            Err(e) => self.system_exception_reply(header.request_id, version, &e),
        };
        match reply {
            Ok(bytes) => DispatchOutcome::reply(bytes),
            Err(e) => {
                log::error!("[dispatch] cannot marshal reply to {}: {}", header.request_id, e);
                DispatchOutcome::message_error(version)
            }
        }
    }

    fn invoke(
        &self,
        header: &RequestHeader,
        body: &mut InputStream,
        version: Version,
    ) -> Result<Vec<u8>, SystemException> {
        let key = header.target.object_key()?;
        let servant = match self.resolve(&key) {
            Target::Servant(servant) => servant,
            Target::Forward(obj) => return self.forward_reply(header.request_id, version, &obj),
            Target::Missing => {
                return Err(SystemException::object_not_exist(
                    minor::NO_SUCH_OBJECT,
                    format!("no object with key '{}'", String::from_utf8_lossy(&key)),
                ))
            }
        };

        let policies = invocation_policies(&header.service_contexts)?;
        let mut handler = ResponseHandler::new(header.request_id, version, self.byte_order, policies);

        match header.operation.as_str() {
            "_is_a" => {
                let id = body.read_string()?;
                handler.create_reply()?.write_boolean(servant.is_a(&id));
            }
            "_non_existent" | "_not_existent" => {
                handler.create_reply()?.write_boolean(false);
            }
            "_interface" => {
                return Err(SystemException::no_implement(
                    minor::NO_INTERFACE_REPOSITORY,
                    "no interface repository",
                ))
            }
            operation => {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    servant.dispatch(operation, body, &mut handler)
                }));
                match outcome {
                    Ok(result) => result?,
                    Err(_) => {
                        log::error!("[dispatch] servant panicked in '{}'", operation);
                        return Err(SystemException::unknown(
                            minor::SERVANT_PANIC,
                            format!("servant panicked in '{}'", operation),
                        )
                        .with_completed(CompletionStatus::Maybe));
                    }
                }
            }
        }

        frame(version, MessageType::Reply, handler.finish()?)
    }

    fn forward_reply(
        &self,
        request_id: u32,
        version: Version,
        target: &ObjectRef,
    ) -> Result<Vec<u8>, SystemException> {
        let mut out = body_stream(self.byte_order);
        ReplyHeader::new(request_id, ReplyStatus::LocationForward).write(&mut out, version)?;
        target.ior().write(&mut out)?;
        frame(version, MessageType::Reply, out)
    }

    fn system_exception_reply(
        &self,
        request_id: u32,
        version: Version,
        exception: &SystemException,
    ) -> Result<Vec<u8>, SystemException> {
        log::debug!("[dispatch] request {} raised {}", request_id, exception);
        let mut out = body_stream(self.byte_order);
        ReplyHeader::new(request_id, ReplyStatus::SystemException).write(&mut out, version)?;
        exception.write(&mut out)?;
        frame(version, MessageType::Reply, out)
    }

    fn handle_locate(&self, body: &mut InputStream, version: Version) -> DispatchOutcome {
        let header = match LocateRequestHeader::read(body, version) {
            Ok(header) => header,
            Err(e) => {
                log::warn!("[dispatch] malformed locate request: {}", e);
                return DispatchOutcome::message_error(version);
            }
        };

        let mut out = body_stream(self.byte_order);
        let result = header.target.object_key().and_then(|key| {
            let (status, forward) = match self.resolve(&key) {
                Target::Servant(_) => (LocateStatus::ObjectHere, None),
                Target::Forward(obj) => (LocateStatus::ObjectForward, Some(obj)),
                Target::Missing => (LocateStatus::UnknownObject, None),
            };
            LocateReplyHeader {
                request_id: header.request_id,
                status,
            }
            .write(&mut out, version)?;
            if let Some(obj) = forward {
                obj.ior().write(&mut out)?;
            }
            Ok(())
        });

        match result.and_then(|()| frame(version, MessageType::LocateReply, out)) {
            Ok(bytes) => DispatchOutcome::reply(bytes),
            Err(e) => {
                log::warn!("[dispatch] locate request {} failed: {}", header.request_id, e);
                DispatchOutcome::message_error(version)
            }
        }
    }
}

/// Decode the client policy overrides context, if present.
fn invocation_policies(
    contexts: &[ServiceContext],
) -> Result<Vec<(PolicyType, Vec<u8>)>, SystemException> {
    let Some(context) = contexts.iter().find(|c| c.context_id == INVOCATION_POLICIES) else {
        return Ok(Vec::new());
    };
    let mut input = InputStream::from_encapsulation(context.context_data.clone())?;
    let count = input.read_sequence_length(8)?;
    let mut policies = Vec::with_capacity(count);
    for _ in 0..count {
        let policy_type = input.read_ulong()?;
        let value = input.read_octet_seq()?;
        policies.push((policy_type, value));
    }
    Ok(policies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::OutputStream;
    use crate::exception::SystemExceptionKind;
    use crate::giop::{parse_message, TargetAddress};
    use crate::ior::{Endpoint, Ior};

    struct Counter;

    impl Servant for Counter {
        fn repository_ids(&self) -> &[&'static str] {
            &["IDL:test/Counter:1.0"]
        }

        fn dispatch(
            &self,
            operation: &str,
            input: &mut InputStream,
            handler: &mut ResponseHandler,
        ) -> Result<(), SystemException> {
            match operation {
                "add" => {
                    let a = input.read_long()?;
                    let b = input.read_long()?;
                    handler.create_reply()?.write_long(a + b);
                    Ok(())
                }
                "boom" => panic!("servant failure"),
                "policies" => {
                    let count = handler.invocation_policies().len() as u32;
                    handler.create_reply()?.write_ulong(count);
                    Ok(())
                }
                other => Err(crate::adapter::unknown_operation(other)),
            }
        }
    }

    fn dispatcher() -> RequestDispatcher {
        let adapter = Arc::new(ObjectAdapter::new("poa"));
        adapter
            .activate_object_with_key(b"counter", Arc::new(Counter))
            .unwrap();
        RequestDispatcher::new(adapter, Arc::new(BootManager::new()), ByteOrder::BigEndian)
    }

    fn request(
        version: Version,
        key: &[u8],
        operation: &str,
        args: impl FnOnce(&mut OutputStream),
    ) -> Message {
        let mut out = body_stream(ByteOrder::LittleEndian);
        RequestHeader {
            request_id: 11,
            response_expected: true,
            target: TargetAddress::Key(key.to_vec()),
            operation: operation.into(),
            service_contexts: Vec::new(),
        }
        .write(&mut out, version)
        .unwrap();
        args(&mut out);
        let bytes = frame(version, MessageType::Request, out).unwrap();
        parse_message(&bytes, 1 << 20).unwrap()
    }

    fn reply(outcome: DispatchOutcome, version: Version) -> (ReplyHeader, InputStream) {
        let bytes = outcome.reply.unwrap();
        let mut message = parse_message(&bytes, 1 << 20).unwrap();
        let header = ReplyHeader::read(&mut message.body, version).unwrap();
        (header, message.body)
    }

    #[test]
    fn test_dispatch_to_servant() {
        for version in [Version::V1_0, Version::V1_1, Version::V1_2] {
            let msg = request(version, b"counter", "add", |out| {
                out.write_long(40);
                out.write_long(2);
            });
            let (header, mut body) = reply(dispatcher().handle(msg), version);
            assert_eq!(header.request_id, 11);
            assert_eq!(header.status, ReplyStatus::NoException);
            assert_eq!(body.read_long().unwrap(), 42);
        }
    }

    #[test]
    fn test_standard_operations() {
        let d = dispatcher();
        let msg = request(Version::V1_2, b"counter", "_is_a", |out| {
            out.write_string("IDL:test/Counter:1.0").unwrap();
        });
        let (_, mut body) = reply(d.handle(msg), Version::V1_2);
        assert!(body.read_boolean().unwrap());

        let msg = request(Version::V1_2, b"counter", "_is_a", |out| {
            out.write_string("IDL:other:1.0").unwrap();
        });
        let (_, mut body) = reply(d.handle(msg), Version::V1_2);
        assert!(!body.read_boolean().unwrap());

        let msg = request(Version::V1_2, b"counter", "_interface", |_| {});
        let (header, mut body) = reply(d.handle(msg), Version::V1_2);
        assert_eq!(header.status, ReplyStatus::SystemException);
        let err = SystemException::read(&mut body).unwrap();
        assert_eq!(err.kind, SystemExceptionKind::NoImplement);
    }

    #[test]
    fn test_unknown_object_and_operation() {
        let d = dispatcher();
        let msg = request(Version::V1_2, b"missing", "add", |_| {});
        let (header, mut body) = reply(d.handle(msg), Version::V1_2);
        assert_eq!(header.status, ReplyStatus::SystemException);
        assert_eq!(
            SystemException::read(&mut body).unwrap().kind,
            SystemExceptionKind::ObjectNotExist
        );

        let msg = request(Version::V1_2, b"counter", "sub", |_| {});
        let (_, mut body) = reply(d.handle(msg), Version::V1_2);
        assert_eq!(
            SystemException::read(&mut body).unwrap().kind,
            SystemExceptionKind::BadOperation
        );
    }

    #[test]
    fn test_servant_panic_becomes_unknown() {
        let msg = request(Version::V1_2, b"counter", "boom", |_| {});
        let (_, mut body) = reply(dispatcher().handle(msg), Version::V1_2);
        let err = SystemException::read(&mut body).unwrap();
        assert_eq!(err.kind, SystemExceptionKind::Unknown);
        assert_eq!(err.minor, minor::SERVANT_PANIC);
        assert_eq!(err.completed, CompletionStatus::Maybe);
    }

    #[test]
    fn test_boot_binding_forwards() {
        let d = dispatcher();
        let target: ObjectRef = Ior::iiop("IDL:x:1.0", &Endpoint::new("h", 1), b"counter".to_vec(), 2)
            .unwrap()
            .into();
        d.boot_manager().add_binding(b"NameService", target.clone());

        let msg = request(Version::V1_2, b"NameService", "add", |_| {});
        let (header, mut body) = reply(d.handle(msg), Version::V1_2);
        assert_eq!(header.status, ReplyStatus::LocationForward);
        assert_eq!(Ior::read(&mut body).unwrap(), *target.ior());
    }

    #[test]
    fn test_locate() {
        let d = dispatcher();
        for (key, expected) in [
            (&b"counter"[..], LocateStatus::ObjectHere),
            (&b"missing"[..], LocateStatus::UnknownObject),
        ] {
            let mut out = body_stream(ByteOrder::BigEndian);
            LocateRequestHeader {
                request_id: 5,
                target: TargetAddress::Key(key.to_vec()),
            }
            .write(&mut out, Version::V1_2)
            .unwrap();
            let bytes = frame(Version::V1_2, MessageType::LocateRequest, out).unwrap();
            let outcome = d.handle(parse_message(&bytes, 1024).unwrap());
            let mut message = parse_message(&outcome.reply.unwrap(), 1024).unwrap();
            let header = LocateReplyHeader::read(&mut message.body, Version::V1_2).unwrap();
            assert_eq!(header.status, expected);
        }
    }

    #[test]
    fn test_malformed_request_gets_message_error() {
        let mut out = body_stream(ByteOrder::BigEndian);
        out.write_octet(1);
        let bytes = frame(Version::V1_2, MessageType::Request, out).unwrap();
        let outcome = dispatcher().handle(parse_message(&bytes, 1024).unwrap());
        assert!(outcome.close);
        let message = parse_message(&outcome.reply.unwrap(), 1024).unwrap();
        assert_eq!(message.header.message_type, MessageType::MessageError);
    }

    #[test]
    fn test_invocation_policies_context() {
        let mut encap = OutputStream::new(ByteOrder::BigEndian);
        encap.write_octet(ByteOrder::BigEndian.flag());
        encap.write_ulong(1);
        encap.write_ulong(26);
        encap.write_octet_seq(&[0, 0, 0, 1]).unwrap();

        let mut out = body_stream(ByteOrder::BigEndian);
        RequestHeader {
            request_id: 1,
            response_expected: true,
            target: TargetAddress::Key(b"counter".to_vec()),
            operation: "policies".into(),
            service_contexts: vec![ServiceContext {
                context_id: INVOCATION_POLICIES,
                context_data: encap.into_bytes(),
            }],
        }
        .write(&mut out, Version::V1_2)
        .unwrap();
        let bytes = frame(Version::V1_2, MessageType::Request, out).unwrap();
        let (_, mut body) = reply(
            dispatcher().handle(parse_message(&bytes, 1024).unwrap()),
            Version::V1_2,
        );
        assert_eq!(body.read_ulong().unwrap(), 1);
    }
}
