// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic value tree.

use super::Any;
use crate::ior::ObjectRef;
use crate::typecode::TypeCode;

/// A value described by some TypeCode.
///
/// Structs and exceptions keep their members in declaration order; enums
/// keep their ordinal. `sequence<octet>` is held as [`Value::Octets`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Short(i16),
    Long(i32),
    UShort(u16),
    ULong(u32),
    LongLong(i64),
    ULongLong(u64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Char(char),
    Octet(u8),
    String(String),
    Struct(Vec<Value>),
    Enum(u32),
    Sequence(Vec<Value>),
    Octets(Vec<u8>),
    Array(Vec<Value>),
    Any(Box<Any>),
    TypeCode(TypeCode),
    ObjRef(ObjectRef),
}

impl Value {
    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Short(_) => "short",
            Value::Long(_) => "long",
            Value::UShort(_) => "ushort",
            Value::ULong(_) => "ulong",
            Value::LongLong(_) => "longlong",
            Value::ULongLong(_) => "ulonglong",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::Char(_) => "char",
            Value::Octet(_) => "octet",
            Value::String(_) => "string",
            Value::Struct(_) => "struct",
            Value::Enum(_) => "enum",
            Value::Sequence(_) => "sequence",
            Value::Octets(_) => "sequence<octet>",
            Value::Array(_) => "array",
            Value::Any(_) => "any",
            Value::TypeCode(_) => "TypeCode",
            Value::ObjRef(_) => "Object",
        }
    }

    /// Member `index` of a struct value.
    pub fn member(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(index),
            _ => None,
        }
    }
}
