// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side invocation.
//!
//! A stub owns a [`Delegate`] and implements each IDL operation as one call
//! to [`Delegate::call`]: marshal the arguments in declaration order, send,
//! then demarshal either the result or one of the operation's declared user
//! exceptions. LOCATION_FORWARD replies and recoverable transport failures
//! come back as [`InvocationOutcome::Remarshal`] and the whole invocation is
//! retried, up to `OrbConfig::max_remarshal` times.

mod delegate;

pub use delegate::{Delegate, InvocationOutcome, Reply, Request};

use std::convert::Infallible;
use std::fmt;

use crate::cdr::InputStream;
use crate::exception::{minor, CompletionStatus, SystemException, SystemExceptionKind};
use crate::helper::UserException;
use crate::ior::ObjectRef;

type ExceptionReader<E> = Box<dyn Fn(&mut InputStream) -> Result<E, SystemException> + Send + Sync>;

/// User exceptions an operation may raise, keyed by repository id.
pub struct ExceptionList<E> {
    entries: Vec<(&'static str, ExceptionReader<E>)>,
}

impl<E> Default for ExceptionList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ExceptionList<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Declare exception `X`, wrapped into the operation's error type.
    pub fn with<X>(mut self, wrap: fn(X) -> E) -> Self
    where
        X: UserException + 'static,
        E: 'static,
    {
        self.entries
            .push((X::id(), Box::new(move |input: &mut InputStream| X::read(input).map(wrap))));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|(known, _)| *known == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Demarshal the exception body in `input`, whose id is `id`.
    ///
    /// Ids not declared for the operation become MARSHAL.
    pub fn read(&self, id: &str, input: &mut InputStream) -> CallError<E> {
        let Some((_, reader)) = self.entries.iter().find(|(known, _)| *known == id) else {
            log::debug!("[stub] undeclared user exception {}", id);
            return CallError::System(
                SystemException::marshal(
                    minor::UNKNOWN_USER_EXCEPTION,
                    format!("unexpected user exception {}", id),
                )
                .with_completed(CompletionStatus::Yes),
            );
        };
        match reader(input) {
            Ok(exception) => CallError::User(exception),
            Err(e) => CallError::System(e),
        }
    }
}

impl ExceptionList<Infallible> {
    /// Operation without a `raises` clause.
    pub fn none() -> Self {
        Self::new()
    }
}

/// Failure of a stub call: a declared user exception or a system exception.
#[derive(Debug, Clone, PartialEq)]
pub enum CallError<E> {
    User(E),
    System(SystemException),
}

impl<E> CallError<E> {
    pub fn user(self) -> Option<E> {
        match self {
            CallError::User(e) => Some(e),
            CallError::System(_) => None,
        }
    }

    pub fn system(&self) -> Option<&SystemException> {
        match self {
            CallError::User(_) => None,
            CallError::System(e) => Some(e),
        }
    }
}

impl CallError<Infallible> {
    pub fn into_system(self) -> SystemException {
        match self {
            CallError::User(never) => match never {},
            CallError::System(e) => e,
        }
    }
}

impl<E> From<SystemException> for CallError<E> {
    fn from(e: SystemException) -> Self {
        CallError::System(e)
    }
}

impl From<CallError<Infallible>> for SystemException {
    fn from(e: CallError<Infallible>) -> Self {
        e.into_system()
    }
}

impl<E: fmt::Display> fmt::Display for CallError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::User(e) => write!(f, "user exception: {}", e),
            CallError::System(e) => write!(f, "system exception: {}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for CallError<E> {}

/// Operations every CORBA object supports.
pub trait ObjectStub {
    fn delegate(&self) -> &Delegate;

    /// The reference this stub was created from.
    fn object(&self) -> ObjectRef {
        self.delegate().object()
    }

    fn is_a(&self, repository_id: &str) -> Result<bool, SystemException> {
        self.delegate()
            .call(
                "_is_a",
                true,
                |out| out.write_string(repository_id),
                &ExceptionList::none(),
                |input| input.read_boolean(),
            )
            .map_err(CallError::into_system)
    }

    /// `true` when the server reports the object no longer exists.
    fn non_existent(&self) -> Result<bool, SystemException> {
        let result = self.delegate().call(
            "_non_existent",
            true,
            |_| Ok(()),
            &ExceptionList::none(),
            |input| input.read_boolean(),
        );
        match result.map_err(CallError::into_system) {
            Err(e) if e.kind == SystemExceptionKind::ObjectNotExist => Ok(true),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::{ByteOrder, OutputStream};
    use crate::Idl;

    #[derive(Debug, Clone, PartialEq, Idl)]
    #[idl(id = "IDL:test/Busy:1.0", exception)]
    struct Busy {
        retry_after: u32,
    }

    #[derive(Debug, Clone, PartialEq, Idl)]
    #[idl(id = "IDL:test/Gone:1.0", exception)]
    struct Gone;

    #[derive(Debug, PartialEq)]
    enum OpError {
        Busy(Busy),
        Gone(Gone),
    }

    fn body<X: crate::Helper>(value: &X) -> InputStream {
        let mut out = OutputStream::new(ByteOrder::BigEndian);
        X::write(&mut out, value).unwrap();
        out.create_input_stream()
    }

    #[test]
    fn test_declared_exception_is_typed() {
        let list = ExceptionList::new()
            .with(OpError::Busy)
            .with(OpError::Gone);
        assert_eq!(list.len(), 2);
        assert!(list.contains("IDL:test/Gone:1.0"));

        let mut input = body(&Busy { retry_after: 5 });
        match list.read("IDL:test/Busy:1.0", &mut input) {
            CallError::User(OpError::Busy(busy)) => assert_eq!(busy.retry_after, 5),
            other => panic!("unexpected {:?}", other),
        }

        let mut input = body(&Gone);
        assert_eq!(
            list.read("IDL:test/Gone:1.0", &mut input),
            CallError::User(OpError::Gone(Gone))
        );
    }

    #[test]
    fn test_undeclared_exception_is_marshal() {
        let list = ExceptionList::new().with(OpError::Busy);
        let mut input = body(&Gone);
        let err = list.read("IDL:test/Gone:1.0", &mut input);
        let sys = err.system().unwrap();
        assert_eq!(sys.kind, SystemExceptionKind::Marshal);
        assert_eq!(sys.minor, minor::UNKNOWN_USER_EXCEPTION);
    }

    #[test]
    fn test_call_error_display() {
        let err: CallError<Busy> = CallError::User(Busy { retry_after: 1 });
        assert!(err.to_string().starts_with("user exception"));
        let err: CallError<Infallible> =
            SystemException::transient(minor::CONNECT, "down").into();
        assert_eq!(err.into_system().kind, SystemExceptionKind::Transient);
    }
}
