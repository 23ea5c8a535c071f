// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Marshalling helpers.
//!
//! Every IDL type maps to a Rust type implementing [`Helper`]. Generated
//! types get their impl from `#[derive(Idl)]`; the basic types and
//! sequences are implemented here.

use crate::any::Any;
use crate::cdr::{ByteOrder, InputStream, OutputStream};
use crate::exception::{minor, SystemException};
use crate::ior::{Ior, ObjectRef};
use crate::typecode::{read_type_code, write_type_code, TypeCode, TypeCodeRegistry, TypeDesc};

/// Per-type marshalling, TypeCode and `Any` support.
pub trait Helper: Sized {
    /// Repository id; empty for anonymous and basic types.
    fn id() -> &'static str {
        ""
    }

    /// TypeCode, resolving named types through `registry`.
    fn type_code_in(registry: &TypeCodeRegistry) -> TypeCode;

    /// TypeCode from the process-wide registry.
    fn type_code() -> TypeCode {
        Self::type_code_in(TypeCodeRegistry::global())
    }

    fn write(out: &mut OutputStream, value: &Self) -> Result<(), SystemException>;

    fn read(input: &mut InputStream) -> Result<Self, SystemException>;

    /// Store `value` in `any`, round-tripping through a CDR stream.
    fn insert(any: &mut Any, value: &Self) -> Result<(), SystemException> {
        let mut out = OutputStream::new(ByteOrder::native());
        Self::write(&mut out, value)?;
        let mut input = out.create_input_stream();
        any.read_value(&mut input, Self::type_code())
    }

    /// Take a value of this type out of `any`.
    ///
    /// Fails with BAD_OPERATION if the held TypeCode is not equivalent.
    fn extract(any: &Any) -> Result<Self, SystemException> {
        let expected = Self::type_code();
        if !any.type_code().equivalent(&expected) {
            return Err(SystemException::bad_operation(
                minor::TYPE_MISMATCH,
                format!("Any holds {}, expected {}", any.type_code(), expected),
            ));
        }
        let mut out = OutputStream::new(ByteOrder::native());
        any.write_value(&mut out)?;
        let mut input = out.create_input_stream();
        Self::read(&mut input)
    }

    /// Write `sequence<Self>`; overridden where a bulk encoding exists.
    fn write_seq(out: &mut OutputStream, values: &[Self]) -> Result<(), SystemException> {
        out.write_sequence_length(values.len())?;
        values.iter().try_for_each(|v| Self::write(out, v))
    }

    fn read_seq(input: &mut InputStream) -> Result<Vec<Self>, SystemException> {
        let len = input.read_sequence_length(1)?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(Self::read(input)?);
        }
        Ok(values)
    }
}

/// Marker for IDL exceptions.
///
/// The wire form of an exception starts with its repository id; the
/// generated `read` verifies it.
pub trait UserException: Helper + std::error::Error {
    fn exception_id(&self) -> &'static str {
        Self::id()
    }
}

/// Read and verify the leading repository id of an exception body.
pub fn read_exception_id(input: &mut InputStream, expected: &str) -> Result<(), SystemException> {
    let id = input.read_string()?;
    if id != expected {
        return Err(SystemException::marshal(
            minor::EXCEPTION_ID_MISMATCH,
            format!("expected exception {}, found {}", expected, id),
        ));
    }
    Ok(())
}

/// Error returned by helpers of local-only types.
pub fn local_object_error(id: &str) -> SystemException {
    SystemException::marshal(
        minor::LOCAL_OBJECT,
        format!("{} is a local type and cannot be marshalled", id),
    )
}

/// Error for an enum ordinal outside the declared labels.
pub fn enum_out_of_range(id: &str, ordinal: u32) -> SystemException {
    SystemException::bad_param(
        minor::ENUM_OUT_OF_RANGE,
        format!("ordinal {} out of range for {}", ordinal, id),
    )
}

macro_rules! impl_basic_helper {
    ($type:ty, $desc:ident, $write:ident, $read:ident) => {
        impl Helper for $type {
            fn type_code_in(_: &TypeCodeRegistry) -> TypeCode {
                TypeDesc::$desc.into()
            }

            fn write(out: &mut OutputStream, value: &Self) -> Result<(), SystemException> {
                out.$write(*value);
                Ok(())
            }

            fn read(input: &mut InputStream) -> Result<Self, SystemException> {
                input.$read()
            }
        }
    };
}

impl_basic_helper!(bool, Boolean, write_boolean, read_boolean);
impl_basic_helper!(i16, Short, write_short, read_short);
impl_basic_helper!(u16, UShort, write_ushort, read_ushort);
impl_basic_helper!(i32, Long, write_long, read_long);
impl_basic_helper!(u32, ULong, write_ulong, read_ulong);
impl_basic_helper!(i64, LongLong, write_longlong, read_longlong);
impl_basic_helper!(u64, ULongLong, write_ulonglong, read_ulonglong);
impl_basic_helper!(f32, Float, write_float, read_float);
impl_basic_helper!(f64, Double, write_double, read_double);

impl Helper for u8 {
    fn type_code_in(_: &TypeCodeRegistry) -> TypeCode {
        TypeDesc::Octet.into()
    }

    fn write(out: &mut OutputStream, value: &Self) -> Result<(), SystemException> {
        out.write_octet(*value);
        Ok(())
    }

    fn read(input: &mut InputStream) -> Result<Self, SystemException> {
        input.read_octet()
    }

    fn write_seq(out: &mut OutputStream, values: &[Self]) -> Result<(), SystemException> {
        out.write_octet_seq(values)
    }

    fn read_seq(input: &mut InputStream) -> Result<Vec<Self>, SystemException> {
        input.read_octet_seq()
    }
}

impl Helper for char {
    fn type_code_in(_: &TypeCodeRegistry) -> TypeCode {
        TypeDesc::Char.into()
    }

    fn write(out: &mut OutputStream, value: &Self) -> Result<(), SystemException> {
        out.write_char(*value)
    }

    fn read(input: &mut InputStream) -> Result<Self, SystemException> {
        input.read_char()
    }
}

impl Helper for String {
    fn type_code_in(_: &TypeCodeRegistry) -> TypeCode {
        TypeCode::string(0)
    }

    fn write(out: &mut OutputStream, value: &Self) -> Result<(), SystemException> {
        out.write_string(value)
    }

    fn read(input: &mut InputStream) -> Result<Self, SystemException> {
        input.read_string()
    }
}

impl<T: Helper> Helper for Vec<T> {
    fn type_code_in(registry: &TypeCodeRegistry) -> TypeCode {
        TypeCode::sequence(T::type_code_in(registry), 0)
    }

    fn write(out: &mut OutputStream, value: &Self) -> Result<(), SystemException> {
        T::write_seq(out, value)
    }

    fn read(input: &mut InputStream) -> Result<Self, SystemException> {
        T::read_seq(input)
    }
}

impl Helper for Any {
    fn type_code_in(_: &TypeCodeRegistry) -> TypeCode {
        TypeDesc::Any.into()
    }

    fn write(out: &mut OutputStream, value: &Self) -> Result<(), SystemException> {
        value.write(out)
    }

    fn read(input: &mut InputStream) -> Result<Self, SystemException> {
        Any::read(input)
    }
}

impl Helper for TypeCode {
    fn type_code_in(_: &TypeCodeRegistry) -> TypeCode {
        TypeDesc::TypeCode.into()
    }

    fn write(out: &mut OutputStream, value: &Self) -> Result<(), SystemException> {
        write_type_code(out, value)
    }

    fn read(input: &mut InputStream) -> Result<Self, SystemException> {
        read_type_code(input)
    }
}

impl Helper for ObjectRef {
    fn id() -> &'static str {
        crate::ior::OBJECT_ID
    }

    fn type_code_in(_: &TypeCodeRegistry) -> TypeCode {
        TypeCode::object_ref(crate::ior::OBJECT_ID, "Object")
    }

    fn write(out: &mut OutputStream, value: &Self) -> Result<(), SystemException> {
        value.ior().write(out)
    }

    fn read(input: &mut InputStream) -> Result<Self, SystemException> {
        Ok(Ior::read(input)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::SystemExceptionKind;

    #[test]
    fn test_octet_sequence_is_bulk() {
        let mut out = OutputStream::new(ByteOrder::BigEndian);
        Vec::<u8>::write(&mut out, &vec![0xDE, 0xAD]).unwrap();
        assert_eq!(out.as_bytes(), &[0, 0, 0, 2, 0xDE, 0xAD]);
        assert_eq!(
            Vec::<u8>::read(&mut out.create_input_stream()).unwrap(),
            vec![0xDE, 0xAD]
        );
    }

    #[test]
    fn test_nested_sequence() {
        let value = vec![vec!["a".to_string()], vec![], vec!["b".into(), "c".into()]];
        let mut out = OutputStream::new(ByteOrder::LittleEndian);
        Vec::<Vec<String>>::write(&mut out, &value).unwrap();
        let decoded = Vec::<Vec<String>>::read(&mut out.create_input_stream()).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(
            Vec::<Vec<String>>::type_code().to_string(),
            "sequence<sequence<string>>"
        );
    }

    #[test]
    fn test_basic_any_roundtrip() {
        let mut any = Any::new();
        i32::insert(&mut any, &-42).unwrap();
        assert_eq!(any.value(), &crate::Value::Long(-42));
        assert_eq!(i32::extract(&any).unwrap(), -42);

        let err = String::extract(&any).unwrap_err();
        assert_eq!(err.kind, SystemExceptionKind::BadOperation);
        assert_eq!(err.minor, minor::TYPE_MISMATCH);
    }

    #[test]
    fn test_exception_id_check() {
        let mut out = OutputStream::new(ByteOrder::BigEndian);
        out.write_string("IDL:a/B:1.0").unwrap();
        let mut input = out.create_input_stream();
        let err = read_exception_id(&mut input, "IDL:a/C:1.0").unwrap_err();
        assert_eq!(err.kind, SystemExceptionKind::Marshal);
        assert_eq!(err.minor, minor::EXCEPTION_ID_MISMATCH);
    }

    #[test]
    fn test_nil_object_ref() {
        let mut out = OutputStream::new(ByteOrder::BigEndian);
        ObjectRef::write(&mut out, &ObjectRef::nil()).unwrap();
        let decoded = ObjectRef::read(&mut out.create_input_stream()).unwrap();
        assert!(decoded.is_nil());
    }
}
