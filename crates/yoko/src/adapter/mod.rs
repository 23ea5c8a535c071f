// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server side: servants, the object adapter and the IIOP server loop.
//!
//! ```text
//! TcpListener ──accept──> connection thread ──Message──> RequestDispatcher
//!                                                        │
//!                          ObjectAdapter (key -> servant) ┤
//!                          BootManager (key -> forward)  ┘
//! ```

mod boot;
mod dispatch;
mod object_adapter;
mod server;

pub use boot::BootManager;
pub use dispatch::{DispatchOutcome, RequestDispatcher};
pub use object_adapter::{Lookup, ObjectAdapter};
pub use server::OrbServer;

use crate::cdr::{ByteOrder, InputStream, OutputStream};
use crate::exception::{minor, SystemException};
use crate::giop::{body_stream, ReplyHeader, ReplyStatus, Version};
use crate::ior::OBJECT_ID;
use crate::policy::PolicyType;

/// Implementation object behind one or more object keys.
pub trait Servant: Send + Sync {
    /// Repository ids this servant implements, most derived first.
    fn repository_ids(&self) -> &[&'static str];

    /// Demarshal the arguments of `operation`, run it and write the reply
    /// through `handler`.
    ///
    /// Returning an error sends it as a SYSTEM_EXCEPTION reply. Leaving
    /// `handler` untouched sends an empty NO_EXCEPTION reply.
    fn dispatch(
        &self,
        operation: &str,
        input: &mut InputStream,
        handler: &mut ResponseHandler,
    ) -> Result<(), SystemException>;

    fn is_a(&self, id: &str) -> bool {
        id == OBJECT_ID || self.repository_ids().contains(&id)
    }
}

/// Error a servant returns for an operation it does not implement.
pub fn unknown_operation(operation: &str) -> SystemException {
    SystemException::bad_operation(
        minor::NO_SUCH_OPERATION,
        format!("unknown operation '{}'", operation),
    )
}

/// Builds the reply body for one request.
pub struct ResponseHandler {
    request_id: u32,
    version: Version,
    byte_order: ByteOrder,
    reply: Option<OutputStream>,
    policies: Vec<(PolicyType, Vec<u8>)>,
}

impl ResponseHandler {
    pub(crate) fn new(
        request_id: u32,
        version: Version,
        byte_order: ByteOrder,
        policies: Vec<(PolicyType, Vec<u8>)>,
    ) -> Self {
        Self {
            request_id,
            version,
            byte_order,
            reply: None,
            policies,
        }
    }

    pub fn request_id(&self) -> u32 {
        self.request_id
    }

    /// Start a normal reply; results are written to the returned stream.
    ///
    /// Discards anything written by an earlier `create_*` call.
    pub fn create_reply(&mut self) -> Result<&mut OutputStream, SystemException> {
        self.start(ReplyStatus::NoException)
    }

    /// Start a user exception reply; the exception (id first) is written to
    /// the returned stream.
    pub fn create_exception_reply(&mut self) -> Result<&mut OutputStream, SystemException> {
        self.start(ReplyStatus::UserException)
    }

    /// Client policy overrides sent with the request, as (type, encapsulated value).
    pub fn invocation_policies(&self) -> &[(PolicyType, Vec<u8>)] {
        &self.policies
    }

    fn start(&mut self, status: ReplyStatus) -> Result<&mut OutputStream, SystemException> {
        let mut out = body_stream(self.byte_order);
        ReplyHeader::new(self.request_id, status).write(&mut out, self.version)?;
        Ok(self.reply.insert(out))
    }

    /// Reply body, or an empty NO_EXCEPTION reply if none was started.
    pub(crate) fn finish(mut self) -> Result<OutputStream, SystemException> {
        match self.reply.take() {
            Some(out) => Ok(out),
            None => {
                self.create_reply()?;
                self.reply
                    .take()
                    .ok_or_else(|| SystemException::internal(0, "reply stream missing"))
            }
        }
    }
}
