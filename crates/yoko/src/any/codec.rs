// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TypeCode-driven encoding and decoding of [`Value`] trees.
//!
//! Recursive placeholders are resolved against the stack of enclosing
//! struct TypeCodes, innermost first.

use super::{Any, Value};
use crate::cdr::{InputStream, OutputStream};
use crate::exception::{minor, SystemException};
use crate::ior::Ior;
use crate::typecode::{read_type_code, write_type_code, TypeCode, TypeDesc};

pub(super) fn encode(out: &mut OutputStream, value: &Value, tc: &TypeCode) -> Result<(), SystemException> {
    let mut enclosing = Vec::new();
    encode_inner(out, value, tc, &mut enclosing)
}

pub(super) fn decode(input: &mut InputStream, tc: &TypeCode) -> Result<Value, SystemException> {
    let mut enclosing = Vec::new();
    decode_inner(input, tc, &mut enclosing)
}

fn mismatch(tc: &TypeCode, value: &Value) -> SystemException {
    SystemException::marshal(
        minor::VALUE_MISMATCH,
        format!("value of kind {} does not match TypeCode {}", value.type_name(), tc),
    )
}

fn resolve<'a>(tc: &'a TypeCode, enclosing: &'a [TypeCode]) -> Result<&'a TypeCode, SystemException> {
    match tc.desc() {
        TypeDesc::Recursive { id } => enclosing
            .iter()
            .rev()
            .find(|outer| outer.id() == Some(id.as_str()))
            .ok_or_else(|| {
                SystemException::bad_typecode(
                    minor::BAD_INDIRECTION,
                    format!("unresolved recursive TypeCode {}", id),
                )
            }),
        TypeDesc::Alias { content, .. } => resolve(content, enclosing),
        _ => Ok(tc),
    }
}

fn encode_inner(
    out: &mut OutputStream,
    value: &Value,
    tc: &TypeCode,
    enclosing: &mut Vec<TypeCode>,
) -> Result<(), SystemException> {
    let tc = resolve(tc, enclosing)?.clone();

    match (tc.desc(), value) {
        (TypeDesc::Null | TypeDesc::Void, Value::Null) => {}
        (TypeDesc::Short, Value::Short(v)) => out.write_short(*v),
        (TypeDesc::Long, Value::Long(v)) => out.write_long(*v),
        (TypeDesc::UShort, Value::UShort(v)) => out.write_ushort(*v),
        (TypeDesc::ULong, Value::ULong(v)) => out.write_ulong(*v),
        (TypeDesc::LongLong, Value::LongLong(v)) => out.write_longlong(*v),
        (TypeDesc::ULongLong, Value::ULongLong(v)) => out.write_ulonglong(*v),
        (TypeDesc::Float, Value::Float(v)) => out.write_float(*v),
        (TypeDesc::Double, Value::Double(v)) => out.write_double(*v),
        (TypeDesc::Boolean, Value::Boolean(v)) => out.write_boolean(*v),
        (TypeDesc::Char, Value::Char(v)) => out.write_char(*v)?,
        (TypeDesc::Octet, Value::Octet(v)) => out.write_octet(*v),
        (TypeDesc::String { bound }, Value::String(s)) => {
            check_bound(*bound, s.len())?;
            out.write_string(s)?;
        }
        (TypeDesc::Struct { members, .. }, Value::Struct(values))
        | (TypeDesc::Except { members, .. }, Value::Struct(values)) => {
            if members.len() != values.len() {
                return Err(mismatch(&tc, value));
            }
            if let Some(id) = tc.id() {
                if matches!(tc.desc(), TypeDesc::Except { .. }) {
                    out.write_string(id)?;
                }
            }
            enclosing.push(tc.clone());
            let result = members
                .iter()
                .zip(values)
                .try_for_each(|(member, v)| encode_inner(out, v, &member.type_code, enclosing));
            enclosing.pop();
            result?;
        }
        (TypeDesc::Enum { members, .. }, Value::Enum(ordinal)) => {
            if *ordinal as usize >= members.len() {
                return Err(SystemException::bad_param(
                    minor::ENUM_OUT_OF_RANGE,
                    format!("enum ordinal {} out of range for {}", ordinal, tc),
                ));
            }
            out.write_ulong(*ordinal);
        }
        (TypeDesc::Sequence { bound, element }, Value::Octets(bytes))
            if matches!(resolve(element, enclosing)?.desc(), TypeDesc::Octet) =>
        {
            check_bound(*bound, bytes.len())?;
            out.write_octet_seq(bytes)?;
        }
        (TypeDesc::Sequence { bound, element }, Value::Sequence(items)) => {
            check_bound(*bound, items.len())?;
            out.write_sequence_length(items.len())?;
            for item in items {
                encode_inner(out, item, element, enclosing)?;
            }
        }
        (TypeDesc::Array { length, element }, Value::Array(items)) => {
            if items.len() != *length as usize {
                return Err(mismatch(&tc, value));
            }
            for item in items {
                encode_inner(out, item, element, enclosing)?;
            }
        }
        (TypeDesc::Any, Value::Any(any)) => any.write(out)?,
        (TypeDesc::TypeCode, Value::TypeCode(inner)) => write_type_code(out, inner)?,
        (TypeDesc::ObjRef { .. }, Value::ObjRef(obj)) => obj.ior().write(out)?,
        _ => return Err(mismatch(&tc, value)),
    }
    Ok(())
}

fn check_bound(bound: u32, len: usize) -> Result<(), SystemException> {
    if bound != 0 && len > bound as usize {
        return Err(SystemException::marshal(
            minor::LENGTH_TOO_LARGE,
            format!("length {} exceeds bound {}", len, bound),
        ));
    }
    Ok(())
}

fn decode_inner(
    input: &mut InputStream,
    tc: &TypeCode,
    enclosing: &mut Vec<TypeCode>,
) -> Result<Value, SystemException> {
    input.enter_nested()?;
    let result = decode_nested(input, tc, enclosing);
    input.leave_nested();
    result
}

fn decode_nested(
    input: &mut InputStream,
    tc: &TypeCode,
    enclosing: &mut Vec<TypeCode>,
) -> Result<Value, SystemException> {
    let tc = resolve(tc, enclosing)?.clone();

    let value = match tc.desc() {
        TypeDesc::Null | TypeDesc::Void => Value::Null,
        TypeDesc::Short => Value::Short(input.read_short()?),
        TypeDesc::Long => Value::Long(input.read_long()?),
        TypeDesc::UShort => Value::UShort(input.read_ushort()?),
        TypeDesc::ULong => Value::ULong(input.read_ulong()?),
        TypeDesc::LongLong => Value::LongLong(input.read_longlong()?),
        TypeDesc::ULongLong => Value::ULongLong(input.read_ulonglong()?),
        TypeDesc::Float => Value::Float(input.read_float()?),
        TypeDesc::Double => Value::Double(input.read_double()?),
        TypeDesc::Boolean => Value::Boolean(input.read_boolean()?),
        TypeDesc::Char => Value::Char(input.read_char()?),
        TypeDesc::Octet => Value::Octet(input.read_octet()?),
        TypeDesc::String { bound } => {
            let s = input.read_string()?;
            check_bound(*bound, s.len())?;
            Value::String(s)
        }
        TypeDesc::Struct { members, .. } | TypeDesc::Except { members, .. } => {
            if let (TypeDesc::Except { .. }, Some(id)) = (tc.desc(), tc.id()) {
                crate::helper::read_exception_id(input, id)?;
            }
            enclosing.push(tc.clone());
            let result = members
                .iter()
                .map(|member| decode_inner(input, &member.type_code, enclosing))
                .collect::<Result<Vec<_>, _>>();
            enclosing.pop();
            Value::Struct(result?)
        }
        TypeDesc::Enum { members, .. } => {
            let ordinal = input.read_ulong()?;
            if ordinal as usize >= members.len() {
                return Err(SystemException::bad_param(
                    minor::ENUM_OUT_OF_RANGE,
                    format!("enum ordinal {} out of range for {}", ordinal, tc),
                ));
            }
            Value::Enum(ordinal)
        }
        TypeDesc::Sequence { bound, element } => {
            let is_octets = matches!(resolve(element, enclosing)?.desc(), TypeDesc::Octet);
            if is_octets {
                let bytes = input.read_octet_seq()?;
                check_bound(*bound, bytes.len())?;
                Value::Octets(bytes)
            } else {
                let len = input.read_sequence_length(1)?;
                check_bound(*bound, len)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(decode_inner(input, element, enclosing)?);
                }
                Value::Sequence(items)
            }
        }
        TypeDesc::Array { length, element } => {
            let mut items = Vec::with_capacity((*length as usize).min(input.remaining()));
            for _ in 0..*length {
                items.push(decode_inner(input, element, enclosing)?);
            }
            Value::Array(items)
        }
        TypeDesc::Any => Value::Any(Box::new(Any::read(input)?)),
        TypeDesc::TypeCode => Value::TypeCode(read_type_code(input)?),
        TypeDesc::ObjRef { .. } => Value::ObjRef(Ior::read(input)?.into()),
        TypeDesc::WChar | TypeDesc::WString { .. } => {
            return Err(SystemException::no_implement(
                minor::BAD_TYPECODE_KIND,
                "wide characters require codeset negotiation",
            ))
        }
        TypeDesc::LocalInterface { id, .. } => {
            return Err(crate::helper::local_object_error(id));
        }
        TypeDesc::Alias { .. } | TypeDesc::Recursive { .. } => {
            // resolve() strips both
            return Err(SystemException::internal(
                minor::BAD_TYPECODE_KIND,
                "unresolved TypeCode",
            ));
        }
    };
    Ok(value)
}
