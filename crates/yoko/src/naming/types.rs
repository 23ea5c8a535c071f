// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CosNaming IDL types and exceptions.

use std::fmt;

use crate::ior::ObjectRef;
use crate::stub::ExceptionList;
use crate::Idl;

/// One component of a compound name.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Idl)]
#[idl(id = "IDL:omg.org/CosNaming/NameComponent:1.0")]
pub struct NameComponent {
    pub id: String,
    pub kind: String,
}

impl NameComponent {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// Compound name, outermost context first.
pub type Name = Vec<NameComponent>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Idl)]
#[idl(id = "IDL:omg.org/CosNaming/BindingType:1.0")]
pub enum BindingType {
    #[default]
    #[idl(name = "nobject")]
    Object,
    #[idl(name = "ncontext")]
    Context,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Idl)]
#[idl(id = "IDL:omg.org/CosNaming/Binding:1.0")]
pub struct Binding {
    pub binding_name: Name,
    pub binding_type: BindingType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Idl)]
#[idl(id = "IDL:omg.org/CosNaming/NamingContext/NotFoundReason:1.0")]
pub enum NotFoundReason {
    #[idl(name = "missing_node")]
    MissingNode,
    #[idl(name = "not_context")]
    NotContext,
    #[idl(name = "not_object")]
    NotObject,
}

/// Resolution stopped at the first component of `rest_of_name`.
#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosNaming/NamingContext/NotFound:1.0", exception)]
pub struct NotFound {
    pub why: NotFoundReason,
    pub rest_of_name: Name,
}

/// `cxt` could not continue resolving `rest_of_name`.
#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosNaming/NamingContext/CannotProceed:1.0", exception)]
pub struct CannotProceed {
    pub cxt: ObjectRef,
    pub rest_of_name: Name,
}

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosNaming/NamingContext/InvalidName:1.0", exception)]
pub struct InvalidName;

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosNaming/NamingContext/AlreadyBound:1.0", exception)]
pub struct AlreadyBound;

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosNaming/NamingContext/NotEmpty:1.0", exception)]
pub struct NotEmpty;

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:omg.org/CosNaming/NamingContextExt/InvalidAddress:1.0", exception)]
pub struct InvalidAddress;

/// Any user exception raised by a naming operation.
#[derive(Debug, Clone, PartialEq)]
pub enum NamingError {
    NotFound(NotFound),
    CannotProceed(CannotProceed),
    InvalidName(InvalidName),
    AlreadyBound(AlreadyBound),
    NotEmpty(NotEmpty),
    InvalidAddress(InvalidAddress),
}

impl NamingError {
    pub fn not_found(why: NotFoundReason, rest_of_name: &[NameComponent]) -> Self {
        NamingError::NotFound(NotFound {
            why,
            rest_of_name: rest_of_name.to_vec(),
        })
    }

    pub fn cannot_proceed(cxt: ObjectRef, rest_of_name: &[NameComponent]) -> Self {
        NamingError::CannotProceed(CannotProceed {
            cxt,
            rest_of_name: rest_of_name.to_vec(),
        })
    }
}

impl fmt::Display for NamingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingError::NotFound(e) => write!(f, "{} ({:?}, {} components left)", e, e.why, e.rest_of_name.len()),
            NamingError::CannotProceed(e) => write!(f, "{} ({} components left)", e, e.rest_of_name.len()),
            NamingError::InvalidName(e) => write!(f, "{}", e),
            NamingError::AlreadyBound(e) => write!(f, "{}", e),
            NamingError::NotEmpty(e) => write!(f, "{}", e),
            NamingError::InvalidAddress(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for NamingError {}

/// `raises` clauses of the naming operations.
pub(crate) mod raises {
    use super::*;

    fn resolution() -> ExceptionList<NamingError> {
        ExceptionList::new()
            .with(NamingError::NotFound)
            .with(NamingError::CannotProceed)
            .with(NamingError::InvalidName)
    }

    /// bind, bind_context, bind_new_context
    pub fn binding() -> ExceptionList<NamingError> {
        resolution().with(NamingError::AlreadyBound)
    }

    /// rebind, rebind_context, resolve, unbind, resolve_str
    pub fn lookup() -> ExceptionList<NamingError> {
        resolution()
    }

    pub fn destroy() -> ExceptionList<NamingError> {
        ExceptionList::new().with(NamingError::NotEmpty)
    }

    /// to_string, to_name
    pub fn conversion() -> ExceptionList<NamingError> {
        ExceptionList::new().with(NamingError::InvalidName)
    }

    pub fn to_url() -> ExceptionList<NamingError> {
        ExceptionList::new()
            .with(NamingError::InvalidAddress)
            .with(NamingError::InvalidName)
    }

    /// new_context, list
    pub fn nothing() -> ExceptionList<NamingError> {
        ExceptionList::new()
    }
}
