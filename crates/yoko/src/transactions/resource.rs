// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;

use super::{HeuristicCommit, HeuristicHazard, HeuristicMixed, HeuristicRollback, NotPrepared, Vote};
use crate::adapter::{unknown_operation, ResponseHandler, Servant};
use crate::cdr::{InputStream, OutputStream};
use crate::exception::{minor, CompletionStatus, SystemException};
use crate::helper::Helper;
use crate::ior::ObjectRef;
use crate::orb::Orb;
use crate::stub::{CallError, Delegate, ExceptionList, ObjectStub};

pub const RESOURCE_ID: &str = "IDL:omg.org/CosTransactions/Resource:1.0";

/// User exceptions raised by `Resource` operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    NotPrepared(NotPrepared),
    HeuristicRollback(HeuristicRollback),
    HeuristicCommit(HeuristicCommit),
    HeuristicMixed(HeuristicMixed),
    HeuristicHazard(HeuristicHazard),
}

impl ResourceError {
    pub fn id(&self) -> &'static str {
        match self {
            ResourceError::NotPrepared(_) => NotPrepared::id(),
            ResourceError::HeuristicRollback(_) => HeuristicRollback::id(),
            ResourceError::HeuristicCommit(_) => HeuristicCommit::id(),
            ResourceError::HeuristicMixed(_) => HeuristicMixed::id(),
            ResourceError::HeuristicHazard(_) => HeuristicHazard::id(),
        }
    }

    fn write(&self, out: &mut OutputStream) -> Result<(), SystemException> {
        match self {
            ResourceError::NotPrepared(e) => NotPrepared::write(out, e),
            ResourceError::HeuristicRollback(e) => HeuristicRollback::write(out, e),
            ResourceError::HeuristicCommit(e) => HeuristicCommit::write(out, e),
            ResourceError::HeuristicMixed(e) => HeuristicMixed::write(out, e),
            ResourceError::HeuristicHazard(e) => HeuristicHazard::write(out, e),
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotPrepared(e) => write!(f, "{}", e),
            ResourceError::HeuristicRollback(e) => write!(f, "{}", e),
            ResourceError::HeuristicCommit(e) => write!(f, "{}", e),
            ResourceError::HeuristicMixed(e) => write!(f, "{}", e),
            ResourceError::HeuristicHazard(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ResourceError {}

/// Declared exceptions of each operation.
fn raises(operation: &str) -> ExceptionList<ResourceError> {
    let list = ExceptionList::new();
    match operation {
        "prepare" => list
            .with(ResourceError::HeuristicMixed)
            .with(ResourceError::HeuristicHazard),
        "rollback" => list
            .with(ResourceError::HeuristicCommit)
            .with(ResourceError::HeuristicMixed)
            .with(ResourceError::HeuristicHazard),
        "commit" => list
            .with(ResourceError::NotPrepared)
            .with(ResourceError::HeuristicRollback)
            .with(ResourceError::HeuristicMixed)
            .with(ResourceError::HeuristicHazard),
        "commit_one_phase" => list.with(ResourceError::HeuristicHazard),
        _ => list,
    }
}

pub type ResourceResult<T> = Result<T, CallError<ResourceError>>;

/// `CosTransactions::Resource` operations.
pub trait ResourceOperations: Send + Sync {
    fn prepare(&self) -> ResourceResult<Vote>;
    fn rollback(&self) -> ResourceResult<()>;
    fn commit(&self) -> ResourceResult<()>;
    fn commit_one_phase(&self) -> ResourceResult<()>;
    fn forget(&self) -> Result<(), SystemException>;
}

/// Remote `Resource`.
pub struct ResourceStub {
    delegate: Delegate,
}

impl ResourceStub {
    pub fn new(orb: &Orb, obj: ObjectRef) -> Self {
        Self {
            delegate: Delegate::new(orb, obj),
        }
    }

    fn call_void(&self, operation: &str) -> ResourceResult<()> {
        self.delegate
            .call(operation, true, |_| Ok(()), &raises(operation), |_| Ok(()))
    }
}

impl ObjectStub for ResourceStub {
    fn delegate(&self) -> &Delegate {
        &self.delegate
    }
}

impl ResourceOperations for ResourceStub {
    fn prepare(&self) -> ResourceResult<Vote> {
        self.delegate
            .call("prepare", true, |_| Ok(()), &raises("prepare"), |input| Vote::read(input))
    }

    fn rollback(&self) -> ResourceResult<()> {
        self.call_void("rollback")
    }

    fn commit(&self) -> ResourceResult<()> {
        self.call_void("commit")
    }

    fn commit_one_phase(&self) -> ResourceResult<()> {
        self.call_void("commit_one_phase")
    }

    fn forget(&self) -> Result<(), SystemException> {
        self.call_void("forget").map_err(|e| match e {
            CallError::System(e) => e,
            // forget declares no exceptions, so the list never yields one
            CallError::User(e) => SystemException::internal(minor::UNKNOWN_USER_EXCEPTION, e.to_string()),
        })
    }
}

/// Skeleton exposing a [`ResourceOperations`] implementation.
pub struct ResourceServant<T> {
    implementation: T,
}

impl<T: ResourceOperations> ResourceServant<T> {
    pub fn new(implementation: T) -> Self {
        Self { implementation }
    }

    pub fn implementation(&self) -> &T {
        &self.implementation
    }
}

impl<T: ResourceOperations> Servant for ResourceServant<T> {
    fn repository_ids(&self) -> &[&'static str] {
        &[RESOURCE_ID]
    }

    fn dispatch(
        &self,
        operation: &str,
        _input: &mut InputStream,
        handler: &mut ResponseHandler,
    ) -> Result<(), SystemException> {
        let result = match operation {
            "prepare" => self.implementation.prepare().map(Some),
            "rollback" => self.implementation.rollback().map(|()| None),
            "commit" => self.implementation.commit().map(|()| None),
            "commit_one_phase" => self.implementation.commit_one_phase().map(|()| None),
            "forget" => self.implementation.forget().map(|()| None).map_err(CallError::System),
            other => return Err(unknown_operation(other)),
        };

        match result {
            Ok(vote) => {
                let out = handler.create_reply()?;
                match vote {
                    Some(vote) => Vote::write(out, &vote),
                    None => Ok(()),
                }
            }
            Err(CallError::User(e)) if raises(operation).contains(e.id()) => {
                e.write(handler.create_exception_reply()?)
            }
            Err(CallError::User(e)) => {
                log::warn!("[transactions] '{}' raised undeclared {}", operation, e.id());
                Err(SystemException::unknown(
                    minor::UNDECLARED_USER_EXCEPTION,
                    format!("'{}' raised undeclared {}", operation, e.id()),
                )
                .with_completed(CompletionStatus::Maybe))
            }
            Err(CallError::System(e)) => Err(e),
        }
    }
}
