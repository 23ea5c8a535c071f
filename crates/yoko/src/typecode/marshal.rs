// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TypeCode wire format.
//!
//! Simple kinds are a bare `ulong` kind; string kinds add a bound; complex
//! kinds add an encapsulation holding their parameters. A recursive
//! placeholder is written as the indirection marker `0xffffffff` followed by
//! a `long` offset (relative to the offset itself) back to the `TCKind` of
//! the enclosing struct with the same repository id.

use std::collections::HashMap;

use super::{StructMember, TcKind, TypeCode, TypeDesc};
use crate::cdr::{InputStream, OutputStream};
use crate::exception::{minor, SystemException};

const INDIRECTION: u32 = 0xffff_ffff;

/// Marshal a TypeCode.
pub fn write_type_code(out: &mut OutputStream, tc: &TypeCode) -> Result<(), SystemException> {
    let mut enclosing = Vec::new();
    write_inner(out, tc, &mut enclosing)
}

/// Demarshal a TypeCode.
pub fn read_type_code(input: &mut InputStream) -> Result<TypeCode, SystemException> {
    let mut ctx = ReadContext::default();
    read_inner(input, &mut ctx)
}

/// `(repository id, absolute position of the TCKind)` of structs being written.
type Enclosing = Vec<(String, usize)>;

fn write_inner(
    out: &mut OutputStream,
    tc: &TypeCode,
    enclosing: &mut Enclosing,
) -> Result<(), SystemException> {
    if let TypeDesc::Recursive { id } = tc.desc() {
        return write_indirection(out, id, enclosing);
    }

    out.align(4);
    let start = out.absolute_position();
    out.write_ulong(tc.kind() as u32);

    match tc.desc() {
        TypeDesc::String { bound } | TypeDesc::WString { bound } => {
            out.write_ulong(*bound);
        }
        TypeDesc::ObjRef { id, name } | TypeDesc::LocalInterface { id, name } => {
            out.write_encapsulation(|encap| {
                encap.write_string(id)?;
                encap.write_string(name)
            })?;
        }
        TypeDesc::Struct { id, name, members } | TypeDesc::Except { id, name, members } => {
            enclosing.push((id.clone(), start));
            let result = out.write_encapsulation(|encap| {
                encap.write_string(id)?;
                encap.write_string(name)?;
                encap.write_sequence_length(members.len())?;
                for member in members {
                    encap.write_string(&member.name)?;
                    write_inner(encap, &member.type_code, enclosing)?;
                }
                Ok(())
            });
            enclosing.pop();
            result?;
        }
        TypeDesc::Enum { id, name, members } => {
            out.write_encapsulation(|encap| {
                encap.write_string(id)?;
                encap.write_string(name)?;
                encap.write_sequence_length(members.len())?;
                for member in members {
                    encap.write_string(member)?;
                }
                Ok(())
            })?;
        }
        TypeDesc::Alias { id, name, content } => {
            out.write_encapsulation(|encap| {
                encap.write_string(id)?;
                encap.write_string(name)?;
                write_inner(encap, content, enclosing)
            })?;
        }
        TypeDesc::Sequence { bound, element } => {
            out.write_encapsulation(|encap| {
                write_inner(encap, element, enclosing)?;
                encap.write_ulong(*bound);
                Ok(())
            })?;
        }
        TypeDesc::Array { length, element } => {
            out.write_encapsulation(|encap| {
                write_inner(encap, element, enclosing)?;
                encap.write_ulong(*length);
                Ok(())
            })?;
        }
        // Simple kinds carry no parameters
        _ => {}
    }
    Ok(())
}

fn write_indirection(
    out: &mut OutputStream,
    id: &str,
    enclosing: &Enclosing,
) -> Result<(), SystemException> {
    let target = enclosing
        .iter()
        .rev()
        .find(|(enclosing_id, _)| enclosing_id == id)
        .map(|(_, position)| *position)
        .ok_or_else(|| {
            SystemException::bad_typecode(
                minor::BAD_INDIRECTION,
                format!("recursive TypeCode {} outside its enclosing type", id),
            )
        })?;

    out.write_ulong(INDIRECTION);
    let offset_at = out.absolute_position();
    let offset = target as i64 - offset_at as i64;
    let offset = i32::try_from(offset).map_err(|_| {
        SystemException::bad_typecode(minor::BAD_INDIRECTION, "indirection offset out of range")
    })?;
    out.write_long(offset);
    Ok(())
}

#[derive(Default)]
struct ReadContext {
    /// Structs being read: absolute TCKind position -> repository id.
    in_progress: Vec<(usize, String)>,
    /// Completed complex TypeCodes by absolute position, for repeated indirections.
    completed: HashMap<usize, TypeCode>,
}

fn read_inner(input: &mut InputStream, ctx: &mut ReadContext) -> Result<TypeCode, SystemException> {
    input.enter_nested()?;
    let result = read_nested(input, ctx);
    input.leave_nested();
    result
}

fn read_nested(input: &mut InputStream, ctx: &mut ReadContext) -> Result<TypeCode, SystemException> {
    input.align(4)?;
    let start = input.absolute_position();
    let raw_kind = input.read_ulong()?;

    if raw_kind == INDIRECTION {
        return read_indirection(input, ctx);
    }

    let kind = TcKind::from_u32(raw_kind).ok_or_else(|| {
        SystemException::bad_typecode(
            minor::BAD_TYPECODE_KIND,
            format!("unknown TCKind {}", raw_kind),
        )
    })?;

    let tc: TypeCode = match kind {
        TcKind::Null => TypeDesc::Null.into(),
        TcKind::Void => TypeDesc::Void.into(),
        TcKind::Short => TypeDesc::Short.into(),
        TcKind::Long => TypeDesc::Long.into(),
        TcKind::UShort => TypeDesc::UShort.into(),
        TcKind::ULong => TypeDesc::ULong.into(),
        TcKind::LongLong => TypeDesc::LongLong.into(),
        TcKind::ULongLong => TypeDesc::ULongLong.into(),
        TcKind::Float => TypeDesc::Float.into(),
        TcKind::Double => TypeDesc::Double.into(),
        TcKind::Boolean => TypeDesc::Boolean.into(),
        TcKind::Char => TypeDesc::Char.into(),
        TcKind::WChar => TypeDesc::WChar.into(),
        TcKind::Octet => TypeDesc::Octet.into(),
        TcKind::Any => TypeDesc::Any.into(),
        TcKind::TypeCode => TypeDesc::TypeCode.into(),
        TcKind::String => TypeDesc::String {
            bound: input.read_ulong()?,
        }
        .into(),
        TcKind::WString => TypeDesc::WString {
            bound: input.read_ulong()?,
        }
        .into(),
        TcKind::ObjRef | TcKind::LocalInterface => {
            let mut encap = input.read_encapsulation()?;
            let id = encap.read_string()?;
            let name = encap.read_string()?;
            if kind == TcKind::ObjRef {
                TypeCode::object_ref(id, name)
            } else {
                TypeCode::local_interface(id, name)
            }
        }
        TcKind::Struct | TcKind::Except => {
            let mut encap = input.read_encapsulation()?;
            let id = encap.read_string()?;
            let name = encap.read_string()?;
            ctx.in_progress.push((start, id.clone()));
            let members = read_members(&mut encap, ctx);
            ctx.in_progress.pop();
            let members = members?;
            if kind == TcKind::Struct {
                TypeCode::structure(id, name, members)
            } else {
                TypeCode::exception(id, name, members)
            }
        }
        TcKind::Enum => {
            let mut encap = input.read_encapsulation()?;
            let id = encap.read_string()?;
            let name = encap.read_string()?;
            let count = encap.read_sequence_length(4)?;
            let members = (0..count)
                .map(|_| encap.read_string())
                .collect::<Result<Vec<_>, _>>()?;
            TypeCode::enumeration(id, name, members)
        }
        TcKind::Alias => {
            let mut encap = input.read_encapsulation()?;
            let id = encap.read_string()?;
            let name = encap.read_string()?;
            let content = read_inner(&mut encap, ctx)?;
            TypeCode::alias(id, name, content)
        }
        TcKind::Sequence | TcKind::Array => {
            let mut encap = input.read_encapsulation()?;
            let element = read_inner(&mut encap, ctx)?;
            let bound = encap.read_ulong()?;
            if kind == TcKind::Sequence {
                TypeCode::sequence(element, bound)
            } else {
                TypeCode::array(element, bound)
            }
        }
        other => {
            return Err(SystemException::no_implement(
                minor::BAD_TYPECODE_KIND,
                format!("TypeCode kind {:?} not supported", other),
            ))
        }
    };

    if tc.id().is_some() {
        ctx.completed.insert(start, tc.clone());
    }
    Ok(tc)
}

fn read_members(
    encap: &mut InputStream,
    ctx: &mut ReadContext,
) -> Result<Vec<StructMember>, SystemException> {
    // name (>= 5 bytes) + kind (4 bytes)
    let count = encap.read_sequence_length(8)?;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        let name = encap.read_string()?;
        let type_code = read_inner(encap, ctx)?;
        members.push(StructMember::new(name, type_code));
    }
    Ok(members)
}

fn read_indirection(input: &mut InputStream, ctx: &ReadContext) -> Result<TypeCode, SystemException> {
    input.align(4)?;
    let offset_at = input.absolute_position();
    let offset = input.read_long()?;
    let target = offset_at as i64 + i64::from(offset);
    let target = usize::try_from(target).map_err(|_| {
        SystemException::bad_typecode(minor::BAD_INDIRECTION, "indirection before stream start")
    })?;

    if let Some((_, id)) = ctx.in_progress.iter().rev().find(|(pos, _)| *pos == target) {
        return Ok(TypeCode::recursive(id.clone()));
    }
    ctx.completed.get(&target).cloned().ok_or_else(|| {
        SystemException::bad_typecode(
            minor::BAD_INDIRECTION,
            format!("dangling TypeCode indirection to offset {}", target),
        )
    })
}
