// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Policy objects.
//!
//! Policies are immutable values tagged with a policy type. `copy` hands
//! back the same instance and `destroy` does nothing, so a policy can be
//! shared freely between adapters and delegates.

use std::any::Any as StdAny;
use std::fmt;
use std::sync::Arc;

use crate::cdr::{ByteOrder, InputStream, OutputStream};
use crate::exception::SystemException;
use crate::helper::Helper;
use crate::Idl;

pub type PolicyType = u32;

/// `PortableServer::LIFESPAN_POLICY_ID`.
pub const LIFESPAN_POLICY_ID: PolicyType = 17;

/// `Messaging::REPLY_PRIORITY_POLICY_TYPE`.
pub const REPLY_PRIORITY_POLICY_TYPE: PolicyType = 26;

/// Service context id carrying client policy overrides.
pub const INVOCATION_POLICIES: u32 = 2;

pub trait Policy: Send + Sync + fmt::Debug {
    fn policy_type(&self) -> PolicyType;

    /// Policies are immutable: copying returns the same instance.
    fn copy(self: Arc<Self>) -> Arc<dyn Policy>;

    /// No-op; may be called any number of times.
    fn destroy(&self) {}

    fn as_any(&self) -> &dyn StdAny;

    /// Encapsulated value sent with invocations, for client-exposed policies.
    fn encode_value(&self) -> Result<Option<Vec<u8>>, SystemException> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Idl)]
#[idl(id = "IDL:omg.org/PortableServer/LifespanPolicyValue:2.3")]
pub enum LifespanPolicyValue {
    #[idl(name = "TRANSIENT")]
    #[default]
    Transient,
    #[idl(name = "PERSISTENT")]
    Persistent,
}

/// Whether object keys outlive the adapter instance that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Idl)]
#[idl(id = "IDL:omg.org/PortableServer/LifespanPolicy:2.3", local)]
pub struct LifespanPolicy {
    value: LifespanPolicyValue,
}

impl LifespanPolicy {
    pub fn new(value: LifespanPolicyValue) -> Arc<Self> {
        Arc::new(Self { value })
    }

    pub fn value(&self) -> LifespanPolicyValue {
        self.value
    }
}

impl Policy for LifespanPolicy {
    fn policy_type(&self) -> PolicyType {
        LIFESPAN_POLICY_ID
    }

    fn copy(self: Arc<Self>) -> Arc<dyn Policy> {
        self
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Idl)]
#[idl(id = "IDL:omg.org/Messaging/PriorityRange:1.0")]
pub struct PriorityRange {
    pub min: i16,
    pub max: i16,
}

impl PriorityRange {
    /// Decode the encapsulated value carried in an invocation policy context.
    pub fn from_policy_value(bytes: &[u8]) -> Result<Self, SystemException> {
        let mut input = InputStream::from_encapsulation(bytes.to_vec())?;
        PriorityRange::read(&mut input)
    }
}

/// Range of priorities the server should use for its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Idl)]
#[idl(id = "IDL:omg.org/Messaging/ReplyPriorityPolicy:1.0", local)]
pub struct ReplyPriorityPolicy {
    priority_range: PriorityRange,
}

impl ReplyPriorityPolicy {
    pub fn new(priority_range: PriorityRange) -> Arc<Self> {
        Arc::new(Self { priority_range })
    }

    pub fn priority_range(&self) -> PriorityRange {
        self.priority_range
    }
}

impl Policy for ReplyPriorityPolicy {
    fn policy_type(&self) -> PolicyType {
        REPLY_PRIORITY_POLICY_TYPE
    }

    fn copy(self: Arc<Self>) -> Arc<dyn Policy> {
        self
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }

    fn encode_value(&self) -> Result<Option<Vec<u8>>, SystemException> {
        let mut out = OutputStream::new(ByteOrder::BigEndian);
        out.write_octet(ByteOrder::BigEndian.flag());
        PriorityRange::write(&mut out, &self.priority_range)?;
        Ok(Some(out.into_bytes()))
    }
}

/// First policy of type `T` in `policies`.
pub fn find_policy<T: Policy + 'static>(policies: &[Arc<dyn Policy>]) -> Option<&T> {
    policies.iter().find_map(|p| p.as_any().downcast_ref::<T>())
}
