// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CosTransactions types and the `Resource` interface.
//!
//! Only the participant side is provided: a coordinator drives a
//! [`ResourceStub`], and applications expose their own resources through
//! [`ResourceServant`].

mod resource;

pub use resource::{
    ResourceError, ResourceOperations, ResourceResult, ResourceServant, ResourceStub, RESOURCE_ID,
};

use crate::Idl;

/// Open Group XA transaction id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Idl)]
#[idl(id = "IDL:omg.org/CosTransactions/otid_t:1.0")]
pub struct OtidT {
    #[idl(name = "formatID")]
    pub format_id: i32,
    pub bqual_length: i32,
    pub tid: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Idl)]
#[idl(id = "IDL:omg.org/CosTransactions/Status:1.0")]
pub enum Status {
    #[idl(name = "StatusActive")]
    Active,
    #[idl(name = "StatusMarkedRollback")]
    MarkedRollback,
    #[idl(name = "StatusPrepared")]
    Prepared,
    #[idl(name = "StatusCommitted")]
    Committed,
    #[idl(name = "StatusRolledBack")]
    RolledBack,
    #[idl(name = "StatusUnknown")]
    Unknown,
    #[idl(name = "StatusNoTransaction")]
    NoTransaction,
    #[idl(name = "StatusPreparing")]
    Preparing,
    #[idl(name = "StatusCommitting")]
    Committing,
    #[idl(name = "StatusRollingBack")]
    RollingBack,
}

/// Outcome of `Resource::prepare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Idl)]
#[idl(id = "IDL:omg.org/CosTransactions/Vote:1.0")]
pub enum Vote {
    #[idl(name = "VoteCommit")]
    Commit,
    #[idl(name = "VoteRollback")]
    Rollback,
    #[idl(name = "VoteReadOnly")]
    ReadOnly,
}

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosTransactions/NotPrepared:1.0", exception)]
pub struct NotPrepared;

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosTransactions/HeuristicRollback:1.0", exception)]
pub struct HeuristicRollback;

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosTransactions/HeuristicCommit:1.0", exception)]
pub struct HeuristicCommit;

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosTransactions/HeuristicMixed:1.0", exception)]
pub struct HeuristicMixed;

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosTransactions/HeuristicHazard:1.0", exception)]
pub struct HeuristicHazard;
