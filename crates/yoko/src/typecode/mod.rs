// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TypeCodes: runtime descriptions of IDL types.
//!
//! A [`TypeCode`] is an immutable, cheaply clonable tree. Self-referential
//! types are expressed with [`TypeDesc::Recursive`] placeholders naming the
//! repository id of an enclosing struct; they are resolved against that
//! enclosing type wherever a TypeCode is walked.
//!
//! Two comparisons are provided:
//! - [`TypeCode::equal`]: exact structural equality, names included
//! - [`TypeCode::equivalent`]: aliases stripped, member names ignored,
//!   repository ids decisive when both sides carry one

mod marshal;
mod registry;

pub use marshal::{read_type_code, write_type_code};
pub use registry::TypeCodeRegistry;

use std::fmt;
use std::sync::Arc;

/// CORBA `TCKind` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TcKind {
    Null = 0,
    Void = 1,
    Short = 2,
    Long = 3,
    UShort = 4,
    ULong = 5,
    Float = 6,
    Double = 7,
    Boolean = 8,
    Char = 9,
    Octet = 10,
    Any = 11,
    TypeCode = 12,
    Principal = 13,
    ObjRef = 14,
    Struct = 15,
    Union = 16,
    Enum = 17,
    String = 18,
    Sequence = 19,
    Array = 20,
    Alias = 21,
    Except = 22,
    LongLong = 23,
    ULongLong = 24,
    LongDouble = 25,
    WChar = 26,
    WString = 27,
    Fixed = 28,
    Value = 29,
    ValueBox = 30,
    Native = 31,
    AbstractInterface = 32,
    LocalInterface = 33,
}

impl TcKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        const KINDS: [TcKind; 34] = [
            TcKind::Null,
            TcKind::Void,
            TcKind::Short,
            TcKind::Long,
            TcKind::UShort,
            TcKind::ULong,
            TcKind::Float,
            TcKind::Double,
            TcKind::Boolean,
            TcKind::Char,
            TcKind::Octet,
            TcKind::Any,
            TcKind::TypeCode,
            TcKind::Principal,
            TcKind::ObjRef,
            TcKind::Struct,
            TcKind::Union,
            TcKind::Enum,
            TcKind::String,
            TcKind::Sequence,
            TcKind::Array,
            TcKind::Alias,
            TcKind::Except,
            TcKind::LongLong,
            TcKind::ULongLong,
            TcKind::LongDouble,
            TcKind::WChar,
            TcKind::WString,
            TcKind::Fixed,
            TcKind::Value,
            TcKind::ValueBox,
            TcKind::Native,
            TcKind::AbstractInterface,
            TcKind::LocalInterface,
        ];
        KINDS.get(value as usize).copied()
    }
}

/// Named member of a struct or exception.
#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub type_code: TypeCode,
}

impl StructMember {
    pub fn new(name: impl Into<String>, type_code: TypeCode) -> Self {
        Self {
            name: name.into(),
            type_code,
        }
    }
}

/// Structural descriptor behind a [`TypeCode`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    Null,
    Void,
    Short,
    Long,
    UShort,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    Boolean,
    Char,
    WChar,
    Octet,
    Any,
    TypeCode,
    /// `bound == 0` means unbounded.
    String { bound: u32 },
    WString { bound: u32 },
    ObjRef { id: String, name: String },
    LocalInterface { id: String, name: String },
    Struct {
        id: String,
        name: String,
        members: Vec<StructMember>,
    },
    Except {
        id: String,
        name: String,
        members: Vec<StructMember>,
    },
    Enum {
        id: String,
        name: String,
        members: Vec<String>,
    },
    Alias {
        id: String,
        name: String,
        content: TypeCode,
    },
    /// `bound == 0` means unbounded.
    Sequence { bound: u32, element: TypeCode },
    Array { length: u32, element: TypeCode },
    /// Placeholder for an enclosing struct still under construction.
    Recursive { id: String },
}

/// Immutable type descriptor; clones share the same tree.
#[derive(Clone, PartialEq)]
pub struct TypeCode(Arc<TypeDesc>);

impl From<TypeDesc> for TypeCode {
    fn from(desc: TypeDesc) -> Self {
        TypeCode(Arc::new(desc))
    }
}

impl fmt::Debug for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.desc() {
            TypeDesc::String { bound: 0 } => write!(f, "string"),
            TypeDesc::String { bound } => write!(f, "string<{}>", bound),
            TypeDesc::WString { bound: 0 } => write!(f, "wstring"),
            TypeDesc::WString { bound } => write!(f, "wstring<{}>", bound),
            TypeDesc::Sequence { bound: 0, element } => write!(f, "sequence<{}>", element),
            TypeDesc::Sequence { bound, element } => write!(f, "sequence<{}, {}>", element, bound),
            TypeDesc::Array { length, element } => write!(f, "{}[{}]", element, length),
            TypeDesc::Recursive { id } => write!(f, "recursive({})", id),
            _ => match self.id() {
                Some(id) => write!(f, "{:?} {}", self.kind(), id),
                None => write!(f, "{:?}", self.kind()),
            },
        }
    }
}

impl TypeCode {
    pub fn desc(&self) -> &TypeDesc {
        &self.0
    }

    pub fn null() -> Self {
        TypeDesc::Null.into()
    }

    pub fn void() -> Self {
        TypeDesc::Void.into()
    }

    pub fn string(bound: u32) -> Self {
        TypeDesc::String { bound }.into()
    }

    pub fn object_ref(id: impl Into<String>, name: impl Into<String>) -> Self {
        TypeDesc::ObjRef {
            id: id.into(),
            name: name.into(),
        }
        .into()
    }

    pub fn local_interface(id: impl Into<String>, name: impl Into<String>) -> Self {
        TypeDesc::LocalInterface {
            id: id.into(),
            name: name.into(),
        }
        .into()
    }

    pub fn structure(id: impl Into<String>, name: impl Into<String>, members: Vec<StructMember>) -> Self {
        TypeDesc::Struct {
            id: id.into(),
            name: name.into(),
            members,
        }
        .into()
    }

    pub fn exception(id: impl Into<String>, name: impl Into<String>, members: Vec<StructMember>) -> Self {
        TypeDesc::Except {
            id: id.into(),
            name: name.into(),
            members,
        }
        .into()
    }

    pub fn enumeration(id: impl Into<String>, name: impl Into<String>, members: Vec<String>) -> Self {
        TypeDesc::Enum {
            id: id.into(),
            name: name.into(),
            members,
        }
        .into()
    }

    pub fn alias(id: impl Into<String>, name: impl Into<String>, content: TypeCode) -> Self {
        TypeDesc::Alias {
            id: id.into(),
            name: name.into(),
            content,
        }
        .into()
    }

    pub fn sequence(element: TypeCode, bound: u32) -> Self {
        TypeDesc::Sequence { bound, element }.into()
    }

    pub fn array(element: TypeCode, length: u32) -> Self {
        TypeDesc::Array { length, element }.into()
    }

    pub fn recursive(id: impl Into<String>) -> Self {
        TypeDesc::Recursive { id: id.into() }.into()
    }

    /// Kind of this TypeCode.
    ///
    /// Recursive placeholders only ever stand for structs, so they report
    /// `tk_struct`.
    pub fn kind(&self) -> TcKind {
        match self.desc() {
            TypeDesc::Null => TcKind::Null,
            TypeDesc::Void => TcKind::Void,
            TypeDesc::Short => TcKind::Short,
            TypeDesc::Long => TcKind::Long,
            TypeDesc::UShort => TcKind::UShort,
            TypeDesc::ULong => TcKind::ULong,
            TypeDesc::LongLong => TcKind::LongLong,
            TypeDesc::ULongLong => TcKind::ULongLong,
            TypeDesc::Float => TcKind::Float,
            TypeDesc::Double => TcKind::Double,
            TypeDesc::Boolean => TcKind::Boolean,
            TypeDesc::Char => TcKind::Char,
            TypeDesc::WChar => TcKind::WChar,
            TypeDesc::Octet => TcKind::Octet,
            TypeDesc::Any => TcKind::Any,
            TypeDesc::TypeCode => TcKind::TypeCode,
            TypeDesc::String { .. } => TcKind::String,
            TypeDesc::WString { .. } => TcKind::WString,
            TypeDesc::ObjRef { .. } => TcKind::ObjRef,
            TypeDesc::LocalInterface { .. } => TcKind::LocalInterface,
            TypeDesc::Struct { .. } | TypeDesc::Recursive { .. } => TcKind::Struct,
            TypeDesc::Except { .. } => TcKind::Except,
            TypeDesc::Enum { .. } => TcKind::Enum,
            TypeDesc::Alias { .. } => TcKind::Alias,
            TypeDesc::Sequence { .. } => TcKind::Sequence,
            TypeDesc::Array { .. } => TcKind::Array,
        }
    }

    /// Repository id, for kinds that carry one.
    pub fn id(&self) -> Option<&str> {
        match self.desc() {
            TypeDesc::ObjRef { id, .. }
            | TypeDesc::LocalInterface { id, .. }
            | TypeDesc::Struct { id, .. }
            | TypeDesc::Except { id, .. }
            | TypeDesc::Enum { id, .. }
            | TypeDesc::Alias { id, .. }
            | TypeDesc::Recursive { id } => Some(id),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self.desc() {
            TypeDesc::ObjRef { name, .. }
            | TypeDesc::LocalInterface { name, .. }
            | TypeDesc::Struct { name, .. }
            | TypeDesc::Except { name, .. }
            | TypeDesc::Enum { name, .. }
            | TypeDesc::Alias { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn members(&self) -> Option<&[StructMember]> {
        match self.desc() {
            TypeDesc::Struct { members, .. } | TypeDesc::Except { members, .. } => Some(members),
            _ => None,
        }
    }

    pub fn member_count(&self) -> Option<usize> {
        match self.desc() {
            TypeDesc::Struct { members, .. } | TypeDesc::Except { members, .. } => {
                Some(members.len())
            }
            TypeDesc::Enum { members, .. } => Some(members.len()),
            _ => None,
        }
    }

    pub fn member_name(&self, index: usize) -> Option<&str> {
        match self.desc() {
            TypeDesc::Struct { members, .. } | TypeDesc::Except { members, .. } => {
                members.get(index).map(|m| m.name.as_str())
            }
            TypeDesc::Enum { members, .. } => members.get(index).map(String::as_str),
            _ => None,
        }
    }

    pub fn member_type(&self, index: usize) -> Option<&TypeCode> {
        self.members()
            .and_then(|members| members.get(index))
            .map(|m| &m.type_code)
    }

    /// Element type of sequences and arrays, aliased type of aliases.
    pub fn content_type(&self) -> Option<&TypeCode> {
        match self.desc() {
            TypeDesc::Sequence { element, .. } | TypeDesc::Array { element, .. } => Some(element),
            TypeDesc::Alias { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Bound of strings and sequences, length of arrays.
    pub fn length(&self) -> Option<u32> {
        match self.desc() {
            TypeDesc::String { bound } | TypeDesc::WString { bound } => Some(*bound),
            TypeDesc::Sequence { bound, .. } => Some(*bound),
            TypeDesc::Array { length, .. } => Some(*length),
            _ => None,
        }
    }

    pub fn is_recursive(&self) -> bool {
        matches!(self.desc(), TypeDesc::Recursive { .. })
    }

    /// Strip any number of alias layers.
    pub fn unaliased(&self) -> &TypeCode {
        let mut current = self;
        while let TypeDesc::Alias { content, .. } = current.desc() {
            current = content;
        }
        current
    }

    /// Exact equality, including names and aliases.
    pub fn equal(&self, other: &TypeCode) -> bool {
        self == other
    }

    /// Interchangeability: aliases stripped, names ignored.
    pub fn equivalent(&self, other: &TypeCode) -> bool {
        let a = self.unaliased();
        let b = other.unaliased();
        if Arc::ptr_eq(&a.0, &b.0) {
            return true;
        }

        // Recursive placeholders stand for structs and are matched by id
        if a.is_recursive() || b.is_recursive() {
            return a.kind() == b.kind() && a.id() == b.id();
        }
        if a.kind() != b.kind() {
            return false;
        }

        match (a.desc(), b.desc()) {
            (TypeDesc::ObjRef { id: ia, .. }, TypeDesc::ObjRef { id: ib, .. })
            | (TypeDesc::LocalInterface { id: ia, .. }, TypeDesc::LocalInterface { id: ib, .. }) => {
                ia == ib
            }
            (
                TypeDesc::Struct {
                    id: ia,
                    members: ma,
                    ..
                },
                TypeDesc::Struct {
                    id: ib,
                    members: mb,
                    ..
                },
            )
            | (
                TypeDesc::Except {
                    id: ia,
                    members: ma,
                    ..
                },
                TypeDesc::Except {
                    id: ib,
                    members: mb,
                    ..
                },
            ) => {
                if !ia.is_empty() && !ib.is_empty() {
                    return ia == ib;
                }
                ma.len() == mb.len()
                    && ma
                        .iter()
                        .zip(mb)
                        .all(|(x, y)| x.type_code.equivalent(&y.type_code))
            }
            (
                TypeDesc::Enum {
                    id: ia,
                    members: ma,
                    ..
                },
                TypeDesc::Enum {
                    id: ib,
                    members: mb,
                    ..
                },
            ) => {
                if !ia.is_empty() && !ib.is_empty() {
                    return ia == ib;
                }
                ma.len() == mb.len()
            }
            (
                TypeDesc::Sequence {
                    bound: ba,
                    element: ea,
                },
                TypeDesc::Sequence {
                    bound: bb,
                    element: eb,
                },
            ) => ba == bb && ea.equivalent(eb),
            (
                TypeDesc::Array {
                    length: la,
                    element: ea,
                },
                TypeDesc::Array {
                    length: lb,
                    element: eb,
                },
            ) => la == lb && ea.equivalent(eb),
            (TypeDesc::String { bound: ba }, TypeDesc::String { bound: bb })
            | (TypeDesc::WString { bound: ba }, TypeDesc::WString { bound: bb }) => ba == bb,
            // Same primitive kind
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests;
