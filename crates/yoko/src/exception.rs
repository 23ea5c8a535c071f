// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CORBA system exceptions.
//!
//! [`SystemException`] is the error type of the whole ORB core. User
//! exceptions are ordinary IDL types implementing
//! [`UserException`](crate::UserException) and travel inside
//! [`CallError::User`](crate::CallError).

use std::fmt;

use crate::cdr::{InputStream, OutputStream};

/// Minor codes raised by this ORB (vendor range `YOKO_VMCID`).
pub mod minor {
    use crate::config::{OMG_VMCID, YOKO_VMCID};

    pub const READ_OVERFLOW: u32 = YOKO_VMCID | 0x01;
    pub const BAD_BOOLEAN: u32 = YOKO_VMCID | 0x02;
    pub const STRING_NOT_TERMINATED: u32 = YOKO_VMCID | 0x03;
    pub const STRING_ENCODING: u32 = YOKO_VMCID | 0x04;
    pub const LENGTH_TOO_LARGE: u32 = YOKO_VMCID | 0x05;
    pub const EXCEPTION_ID_MISMATCH: u32 = YOKO_VMCID | 0x06;
    pub const UNKNOWN_USER_EXCEPTION: u32 = YOKO_VMCID | 0x07;
    pub const LOCAL_OBJECT: u32 = YOKO_VMCID | 0x08;
    pub const ENUM_OUT_OF_RANGE: u32 = YOKO_VMCID | 0x09;
    pub const BAD_ENCAPSULATION: u32 = YOKO_VMCID | 0x0a;
    pub const VALUE_MISMATCH: u32 = YOKO_VMCID | 0x0b;
    pub const NESTING_TOO_DEEP: u32 = YOKO_VMCID | 0x0c;
    pub const TYPE_MISMATCH: u32 = YOKO_VMCID | 0x10;
    pub const BAD_TYPECODE_KIND: u32 = YOKO_VMCID | 0x11;
    pub const BAD_INDIRECTION: u32 = YOKO_VMCID | 0x12;
    pub const BAD_MAGIC: u32 = YOKO_VMCID | 0x20;
    pub const BAD_VERSION: u32 = YOKO_VMCID | 0x21;
    pub const BAD_MESSAGE_TYPE: u32 = YOKO_VMCID | 0x22;
    pub const FRAGMENT_UNSUPPORTED: u32 = YOKO_VMCID | 0x23;
    pub const MESSAGE_TOO_LARGE: u32 = YOKO_VMCID | 0x24;
    pub const REQUEST_ID_MISMATCH: u32 = YOKO_VMCID | 0x25;
    pub const BAD_REPLY_STATUS: u32 = YOKO_VMCID | 0x26;
    pub const CONNECT: u32 = YOKO_VMCID | 0x30;
    pub const SEND: u32 = YOKO_VMCID | 0x31;
    pub const RECV: u32 = YOKO_VMCID | 0x32;
    pub const CONNECTION_CLOSED: u32 = YOKO_VMCID | 0x33;
    pub const NO_ROUTE: u32 = YOKO_VMCID | 0x34;
    pub const REMARSHAL_LIMIT: u32 = YOKO_VMCID | 0x40;
    pub const ORB_DESTROYED: u32 = YOKO_VMCID | 0x41;
    pub const NOT_LISTENING: u32 = YOKO_VMCID | 0x42;
    pub const BAD_CONFIG: u32 = YOKO_VMCID | 0x43;
    pub const BAD_IOR: u32 = YOKO_VMCID | 0x50;
    pub const BAD_URL: u32 = YOKO_VMCID | 0x51;
    pub const NO_PROFILE: u32 = YOKO_VMCID | 0x52;
    pub const INVALID_INIT_REF: u32 = YOKO_VMCID | 0x53;
    pub const HOLDER_EMPTY: u32 = YOKO_VMCID | 0x54;
    pub const ALREADY_ACTIVE: u32 = YOKO_VMCID | 0x60;
    pub const NOT_ACTIVE: u32 = YOKO_VMCID | 0x61;
    pub const SERVANT_PANIC: u32 = YOKO_VMCID | 0x62;
    pub const UNDECLARED_USER_EXCEPTION: u32 = YOKO_VMCID | 0x63;
    pub const ZERO_COUNT: u32 = YOKO_VMCID | 0x70;
    pub const ROOT_CONTEXT: u32 = YOKO_VMCID | 0x71;

    /// OMG: BAD_OPERATION 2, "operation not found".
    pub const NO_SUCH_OPERATION: u32 = OMG_VMCID | 2;
    /// OMG: OBJECT_NOT_EXIST 2, "no such object".
    pub const NO_SUCH_OBJECT: u32 = OMG_VMCID | 2;
    /// OMG: NO_IMPLEMENT 3, "no interface repository".
    pub const NO_INTERFACE_REPOSITORY: u32 = OMG_VMCID | 3;
    /// OMG: BAD_PARAM 5, "invalid name".
    pub const INVALID_NAME: u32 = OMG_VMCID | 5;
}

/// Standard system exception kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemExceptionKind {
    Unknown,
    BadParam,
    NoMemory,
    ImpLimit,
    CommFailure,
    InvObjref,
    NoPermission,
    Internal,
    Marshal,
    Initialize,
    NoImplement,
    BadTypecode,
    BadOperation,
    NoResources,
    NoResponse,
    BadInvOrder,
    Transient,
    ObjAdapter,
    DataConversion,
    ObjectNotExist,
    Timeout,
}

const ALL_KINDS: [SystemExceptionKind; 21] = [
    SystemExceptionKind::Unknown,
    SystemExceptionKind::BadParam,
    SystemExceptionKind::NoMemory,
    SystemExceptionKind::ImpLimit,
    SystemExceptionKind::CommFailure,
    SystemExceptionKind::InvObjref,
    SystemExceptionKind::NoPermission,
    SystemExceptionKind::Internal,
    SystemExceptionKind::Marshal,
    SystemExceptionKind::Initialize,
    SystemExceptionKind::NoImplement,
    SystemExceptionKind::BadTypecode,
    SystemExceptionKind::BadOperation,
    SystemExceptionKind::NoResources,
    SystemExceptionKind::NoResponse,
    SystemExceptionKind::BadInvOrder,
    SystemExceptionKind::Transient,
    SystemExceptionKind::ObjAdapter,
    SystemExceptionKind::DataConversion,
    SystemExceptionKind::ObjectNotExist,
    SystemExceptionKind::Timeout,
];

impl SystemExceptionKind {
    /// IDL name, e.g. `MARSHAL`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::BadParam => "BAD_PARAM",
            Self::NoMemory => "NO_MEMORY",
            Self::ImpLimit => "IMP_LIMIT",
            Self::CommFailure => "COMM_FAILURE",
            Self::InvObjref => "INV_OBJREF",
            Self::NoPermission => "NO_PERMISSION",
            Self::Internal => "INTERNAL",
            Self::Marshal => "MARSHAL",
            Self::Initialize => "INITIALIZE",
            Self::NoImplement => "NO_IMPLEMENT",
            Self::BadTypecode => "BAD_TYPECODE",
            Self::BadOperation => "BAD_OPERATION",
            Self::NoResources => "NO_RESOURCES",
            Self::NoResponse => "NO_RESPONSE",
            Self::BadInvOrder => "BAD_INV_ORDER",
            Self::Transient => "TRANSIENT",
            Self::ObjAdapter => "OBJ_ADAPTER",
            Self::DataConversion => "DATA_CONVERSION",
            Self::ObjectNotExist => "OBJECT_NOT_EXIST",
            Self::Timeout => "TIMEOUT",
        }
    }

    pub fn repository_id(self) -> String {
        format!("IDL:omg.org/CORBA/{}:1.0", self.name())
    }

    pub fn from_repository_id(id: &str) -> Option<Self> {
        let name = id
            .strip_prefix("IDL:omg.org/CORBA/")
            .and_then(|rest| rest.strip_suffix(":1.0"))?;
        ALL_KINDS.iter().copied().find(|kind| kind.name() == name)
    }
}

/// Whether the target operation ran before the exception was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CompletionStatus {
    Yes = 0,
    No = 1,
    Maybe = 2,
}

impl CompletionStatus {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Yes),
            1 => Some(Self::No),
            2 => Some(Self::Maybe),
            _ => None,
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "COMPLETED_YES"),
            Self::No => write!(f, "COMPLETED_NO"),
            Self::Maybe => write!(f, "COMPLETED_MAYBE"),
        }
    }
}

/// A CORBA system exception.
///
/// `message` is local diagnostic text and never crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemException {
    pub kind: SystemExceptionKind,
    pub minor: u32,
    pub completed: CompletionStatus,
    pub message: Option<String>,
}

macro_rules! system_exception_ctor {
    ($($fn_name:ident => $kind:ident),* $(,)?) => {
        $(
            pub fn $fn_name(minor: u32, message: impl Into<String>) -> Self {
                Self::new(SystemExceptionKind::$kind, minor, CompletionStatus::No)
                    .with_message(message)
            }
        )*
    };
}

impl SystemException {
    pub fn new(kind: SystemExceptionKind, minor: u32, completed: CompletionStatus) -> Self {
        Self {
            kind,
            minor,
            completed,
            message: None,
        }
    }

    system_exception_ctor! {
        unknown => Unknown,
        bad_param => BadParam,
        imp_limit => ImpLimit,
        comm_failure => CommFailure,
        inv_objref => InvObjref,
        internal => Internal,
        marshal => Marshal,
        initialize => Initialize,
        no_implement => NoImplement,
        bad_typecode => BadTypecode,
        bad_operation => BadOperation,
        bad_inv_order => BadInvOrder,
        transient => Transient,
        obj_adapter => ObjAdapter,
        data_conversion => DataConversion,
        object_not_exist => ObjectNotExist,
        timeout => Timeout,
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = if message.is_empty() { None } else { Some(message) };
        self
    }

    pub fn with_completed(mut self, completed: CompletionStatus) -> Self {
        self.completed = completed;
        self
    }

    pub fn repository_id(&self) -> String {
        self.kind.repository_id()
    }

    /// Failed before reaching the target: safe to retry against another profile.
    pub fn is_transport_failure_not_completed(&self) -> bool {
        matches!(
            self.kind,
            SystemExceptionKind::CommFailure | SystemExceptionKind::Transient
        ) && self.completed == CompletionStatus::No
    }

    /// Marshal as carried in a SYSTEM_EXCEPTION reply body.
    pub fn write(&self, out: &mut OutputStream) -> Result<(), SystemException> {
        out.write_string(&self.repository_id())?;
        out.write_ulong(self.minor);
        out.write_ulong(self.completed as u32);
        Ok(())
    }

    /// Read a SYSTEM_EXCEPTION reply body.
    ///
    /// Unrecognized repository ids map to UNKNOWN, keeping minor/completed.
    pub fn read(input: &mut InputStream) -> Result<SystemException, SystemException> {
        let id = input.read_string()?;
        let minor = input.read_ulong()?;
        let raw_completed = input.read_ulong()?;
        let completed = CompletionStatus::from_u32(raw_completed).ok_or_else(|| {
            SystemException::marshal(
                minor::VALUE_MISMATCH,
                format!("invalid completion status {}", raw_completed),
            )
        })?;
        let kind = SystemExceptionKind::from_repository_id(&id).unwrap_or_else(|| {
            log::debug!("[exception] unrecognized system exception id {}", id);
            SystemExceptionKind::Unknown
        });
        Ok(SystemException::new(kind, minor, completed))
    }
}

impl fmt::Display for SystemException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (minor {:#x}, {})",
            self.kind.name(),
            self.minor,
            self.completed
        )?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for SystemException {}
