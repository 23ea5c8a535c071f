// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-reference invocation state and the remarshal loop.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{CallError, ExceptionList};
use crate::cdr::{ByteOrder, InputStream, OutputStream};
use crate::exception::{minor, CompletionStatus, SystemException};
use crate::giop::{
    body_stream, frame, LocateReplyHeader, LocateRequestHeader, LocateStatus, MessageType,
    ReplyHeader, ReplyStatus, RequestHeader, ServiceContext, TargetAddress, Version,
};
use crate::ior::{Ior, ObjectRef};
use crate::orb::Orb;
use crate::policy::{Policy, INVOCATION_POLICIES};
use crate::transport::ConnectionGuard;

/// An outgoing request whose arguments are still being marshalled.
pub struct Request {
    request_id: u32,
    version: Version,
    response_expected: bool,
    operation: String,
    out: OutputStream,
    connection: ConnectionGuard,
}

impl Request {
    /// Stream positioned at the start of the arguments.
    pub fn out(&mut self) -> &mut OutputStream {
        &mut self.out
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn request_id(&self) -> u32 {
        self.request_id
    }
}

/// A received reply body. The connection goes back to the pool when the
/// reply is dropped.
pub struct Reply {
    input: InputStream,
    _connection: ConnectionGuard,
}

impl Reply {
    pub fn input(&mut self) -> &mut InputStream {
        &mut self.input
    }
}

/// Result of one request/reply exchange.
pub enum InvocationOutcome {
    /// Normal reply; results follow in the body.
    Reply(Reply),
    /// User exception `id`; the body starts with the id.
    ApplicationException { id: String, reply: Reply },
    /// The target moved or the connection was lost before the request was
    /// processed: marshal and send the request again.
    Remarshal,
}

/// Invocation state behind a stub: the original reference, the current
/// (possibly forwarded) target and client policy overrides.
pub struct Delegate {
    orb: Orb,
    original: RwLock<ObjectRef>,
    target: RwLock<ObjectRef>,
    policies: RwLock<Vec<Arc<dyn Policy>>>,
}

impl Delegate {
    pub fn new(orb: &Orb, obj: ObjectRef) -> Self {
        Self {
            orb: orb.clone(),
            original: RwLock::new(obj.clone()),
            target: RwLock::new(obj),
            policies: RwLock::new(Vec::new()),
        }
    }

    pub fn orb(&self) -> &Orb {
        &self.orb
    }

    /// Reference the stub was created from (updated by LOCATION_FORWARD_PERM).
    pub fn object(&self) -> ObjectRef {
        self.original.read().clone()
    }

    /// Reference requests are currently sent to.
    pub fn effective_target(&self) -> ObjectRef {
        self.target.read().clone()
    }

    pub fn is_forwarded(&self) -> bool {
        *self.target.read() != *self.original.read()
    }

    /// Drop any forward and send to the original reference again.
    pub fn reset_target(&self) {
        let original = self.original.read().clone();
        *self.target.write() = original;
    }

    /// Policies sent with every invocation through this delegate.
    pub fn set_policy_overrides(&self, policies: Vec<Arc<dyn Policy>>) {
        *self.policies.write() = policies;
    }

    pub fn policy_overrides(&self) -> Vec<Arc<dyn Policy>> {
        self.policies.read().clone()
    }

    /// Connect to the current target and write the request header.
    pub fn request(&self, operation: &str, response_expected: bool) -> Result<Request, SystemException> {
        self.orb.check_alive()?;
        let target = self.effective_target();
        let profile = target.ior().iiop_profile().ok_or_else(|| {
            SystemException::inv_objref(
                minor::NO_PROFILE,
                format!("no usable IIOP profile invoking '{}'", operation),
            )
        })?;
        let config = self.orb.config();
        let version = Version::new(config.giop_minor.min(profile.minor));
        let connection = self.orb.checkout(&profile.endpoint())?;

        let header = RequestHeader {
            request_id: self.orb.next_request_id(),
            response_expected,
            target: TargetAddress::Key(profile.object_key),
            operation: operation.to_string(),
            service_contexts: self.service_contexts()?,
        };
        let mut out = body_stream(config.byte_order);
        header.write(&mut out, version)?;

        Ok(Request {
            request_id: header.request_id,
            version,
            response_expected,
            operation: header.operation,
            out,
            connection,
        })
    }

    fn service_contexts(&self) -> Result<Vec<ServiceContext>, SystemException> {
        let policies = self.policies.read();
        let mut values = Vec::new();
        for policy in policies.iter() {
            if let Some(value) = policy.encode_value()? {
                values.push((policy.policy_type(), value));
            }
        }
        if values.is_empty() {
            return Ok(Vec::new());
        }

        let mut encap = OutputStream::new(ByteOrder::BigEndian);
        encap.write_octet(ByteOrder::BigEndian.flag());
        encap.write_sequence_length(values.len())?;
        for (policy_type, value) in &values {
            encap.write_ulong(*policy_type);
            encap.write_octet_seq(value)?;
        }
        Ok(vec![ServiceContext {
            context_id: INVOCATION_POLICIES,
            context_data: encap.into_bytes(),
        }])
    }

    /// Send `request` and wait for its reply.
    pub fn invoke(&self, request: Request) -> Result<InvocationOutcome, SystemException> {
        let Request {
            request_id,
            version,
            response_expected,
            operation,
            out,
            mut connection,
        } = request;

        let bytes = frame(version, MessageType::Request, out)?;
        if let Err(e) = connection.send(&bytes) {
            connection.mark_broken();
            if connection.is_reused() {
                log::debug!("[stub] stale connection sending '{}': {}", operation, e);
                return Ok(InvocationOutcome::Remarshal);
            }
            return Err(e);
        }

        if !response_expected {
            return Ok(InvocationOutcome::Reply(Reply {
                input: InputStream::new(Vec::new(), ByteOrder::BigEndian),
                _connection: connection,
            }));
        }

        let message = match connection.receive() {
            Ok(message) => message,
            Err(e) => {
                connection.mark_broken();
                if e.minor == minor::CONNECTION_CLOSED && connection.is_reused() {
                    log::debug!("[stub] stale connection awaiting '{}'", operation);
                    return Ok(InvocationOutcome::Remarshal);
                }
                return Err(e);
            }
        };

        match message.header.message_type {
            MessageType::Reply => {}
            MessageType::CloseConnection => {
                connection.mark_broken();
                log::debug!("[stub] connection closed by server before reply to '{}'", operation);
                return Ok(InvocationOutcome::Remarshal);
            }
            other => {
                connection.mark_broken();
                return Err(SystemException::comm_failure(
                    minor::BAD_MESSAGE_TYPE,
                    format!("expected Reply to '{}', got {:?}", operation, other),
                )
                .with_completed(CompletionStatus::Maybe));
            }
        }

        let mut input = message.body;
        let header = match ReplyHeader::read(&mut input, message.header.version) {
            Ok(header) => header,
            Err(e) => {
                connection.mark_broken();
                return Err(e.with_completed(CompletionStatus::Maybe));
            }
        };
        if header.request_id != request_id {
            connection.mark_broken();
            return Err(SystemException::comm_failure(
                minor::REQUEST_ID_MISMATCH,
                format!("reply id {} for request {}", header.request_id, request_id),
            )
            .with_completed(CompletionStatus::Maybe));
        }

        match header.status {
            ReplyStatus::NoException => Ok(InvocationOutcome::Reply(Reply {
                input,
                _connection: connection,
            })),
            ReplyStatus::UserException => {
                let id = input.peek_string()?;
                Ok(InvocationOutcome::ApplicationException {
                    id,
                    reply: Reply {
                        input,
                        _connection: connection,
                    },
                })
            }
            ReplyStatus::SystemException => Err(SystemException::read(&mut input)?),
            ReplyStatus::LocationForward | ReplyStatus::LocationForwardPerm => {
                let forward: ObjectRef = read_forward(&mut input)?.into();
                log::debug!(
                    "[stub] '{}' forwarded to {}",
                    operation,
                    forward
                        .endpoint()
                        .map_or_else(|| "<no endpoint>".to_string(), |e| e.to_string())
                );
                if header.status == ReplyStatus::LocationForwardPerm {
                    *self.original.write() = forward.clone();
                }
                *self.target.write() = forward;
                Ok(InvocationOutcome::Remarshal)
            }
            ReplyStatus::NeedsAddressingMode => {
                log::debug!("[stub] server requested another addressing mode for '{}'", operation);
                Ok(InvocationOutcome::Remarshal)
            }
        }
    }

    /// Run one operation to completion, retrying on remarshal.
    ///
    /// `marshal` writes the arguments and may run once per attempt;
    /// `demarshal` reads the results of the successful attempt.
    pub fn call<R, E, M, D>(
        &self,
        operation: &str,
        response_expected: bool,
        marshal: M,
        exceptions: &ExceptionList<E>,
        demarshal: D,
    ) -> Result<R, CallError<E>>
    where
        M: Fn(&mut OutputStream) -> Result<(), SystemException>,
        D: FnOnce(&mut InputStream) -> Result<R, SystemException>,
    {
        let limit = self.orb.config().max_remarshal;
        let mut retries: u32 = 0;
        loop {
            let outcome = self.request(operation, response_expected).and_then(|mut request| {
                marshal(request.out())?;
                self.invoke(request)
            });

            match outcome {
                Ok(InvocationOutcome::Reply(mut reply)) => {
                    return demarshal(reply.input()).map_err(CallError::System);
                }
                Ok(InvocationOutcome::ApplicationException { id, mut reply }) => {
                    return Err(exceptions.read(&id, reply.input()));
                }
                Ok(InvocationOutcome::Remarshal) => {}
                Err(e) if e.is_transport_failure_not_completed() && self.is_forwarded() => {
                    log::debug!(
                        "[stub] forwarded target failed for '{}' ({}); reverting to original",
                        operation,
                        e
                    );
                    self.reset_target();
                }
                Err(e) => return Err(CallError::System(e)),
            }

            retries += 1;
            if limit.is_some_and(|max| retries > max) {
                log::warn!("[stub] '{}' exceeded {} remarshal attempts", operation, retries - 1);
                return Err(CallError::System(SystemException::transient(
                    minor::REMARSHAL_LIMIT,
                    format!("'{}' remarshalled more than {} times", operation, retries - 1),
                )));
            }
            log::trace!("[stub] remarshalling '{}' (retry {})", operation, retries);
        }
    }

    /// Ask the server whether the object exists, following forwards.
    pub fn locate(&self) -> Result<bool, SystemException> {
        let limit = self.orb.config().max_remarshal;
        let mut retries: u32 = 0;
        loop {
            self.orb.check_alive()?;
            let target = self.effective_target();
            let profile = target.ior().iiop_profile().ok_or_else(|| {
                SystemException::inv_objref(minor::NO_PROFILE, "no usable IIOP profile")
            })?;
            let version = Version::new(self.orb.config().giop_minor.min(profile.minor));
            let mut connection = self.orb.checkout(&profile.endpoint())?;

            let request_id = self.orb.next_request_id();
            let mut out = body_stream(self.orb.config().byte_order);
            LocateRequestHeader {
                request_id,
                target: TargetAddress::Key(profile.object_key),
            }
            .write(&mut out, version)?;
            let exchange = connection
                .send(&frame(version, MessageType::LocateRequest, out)?)
                .and_then(|()| connection.receive());
            let mut message = match exchange {
                Ok(message) if message.header.message_type == MessageType::LocateReply => message,
                Ok(message) => {
                    connection.mark_broken();
                    return Err(SystemException::comm_failure(
                        minor::BAD_MESSAGE_TYPE,
                        format!("expected LocateReply, got {:?}", message.header.message_type),
                    ));
                }
                Err(e) => {
                    connection.mark_broken();
                    return Err(e);
                }
            };

            let reply = LocateReplyHeader::read(&mut message.body, message.header.version)?;
            if reply.request_id != request_id {
                connection.mark_broken();
                return Err(SystemException::comm_failure(
                    minor::REQUEST_ID_MISMATCH,
                    format!("locate reply id {} for request {}", reply.request_id, request_id),
                ));
            }
            match reply.status {
                LocateStatus::ObjectHere => return Ok(true),
                LocateStatus::UnknownObject => return Ok(false),
                LocateStatus::ObjectForward | LocateStatus::ObjectForwardPerm => {
                    let forward: ObjectRef = read_forward(&mut message.body)?.into();
                    if reply.status == LocateStatus::ObjectForwardPerm {
                        *self.original.write() = forward.clone();
                    }
                    *self.target.write() = forward;
                }
                LocateStatus::LocSystemException => {
                    return Err(SystemException::read(&mut message.body)?)
                }
                LocateStatus::LocNeedsAddressingMode => {}
            }

            retries += 1;
            if limit.is_some_and(|max| retries > max) {
                return Err(SystemException::transient(
                    minor::REMARSHAL_LIMIT,
                    format!("locate forwarded more than {} times", retries - 1),
                ));
            }
        }
    }
}

fn read_forward(input: &mut InputStream) -> Result<Ior, SystemException> {
    let ior = Ior::read(input)?;
    if ior.is_nil() {
        return Err(SystemException::inv_objref(
            minor::NO_PROFILE,
            "location forward to a nil reference",
        ));
    }
    Ok(ior)
}
