// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `Any`: a value paired with the TypeCode that describes it.
//!
//! The payload is held as a generic [`Value`] tree so an `Any` can be
//! received, inspected and re-sent without knowing the concrete Rust type.
//! Typed access goes through [`Helper::insert`](crate::Helper::insert) and
//! [`Helper::extract`](crate::Helper::extract).

mod codec;
mod value;

pub use value::Value;

use crate::cdr::{InputStream, OutputStream};
use crate::exception::SystemException;
use crate::typecode::{read_type_code, write_type_code, TypeCode};

/// Self-describing value container.
#[derive(Debug, Clone, PartialEq)]
pub struct Any {
    type_code: TypeCode,
    value: Value,
}

impl Default for Any {
    fn default() -> Self {
        Self::new()
    }
}

impl Any {
    /// Empty `Any` (`tk_null`).
    pub fn new() -> Self {
        Self {
            type_code: TypeCode::null(),
            value: Value::Null,
        }
    }

    /// Build from parts, checking that `value` matches `type_code`.
    pub fn from_value(type_code: TypeCode, value: Value) -> Result<Self, SystemException> {
        let mut scratch = OutputStream::new(crate::cdr::ByteOrder::BigEndian);
        codec::encode(&mut scratch, &value, &type_code)?;
        Ok(Self { type_code, value })
    }

    pub fn type_code(&self) -> &TypeCode {
        &self.type_code
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Decode a value of type `type_code` from `input` and hold it.
    pub fn read_value(&mut self, input: &mut InputStream, type_code: TypeCode) -> Result<(), SystemException> {
        let value = codec::decode(input, &type_code)?;
        self.type_code = type_code;
        self.value = value;
        Ok(())
    }

    /// Encode the held value (without its TypeCode).
    pub fn write_value(&self, out: &mut OutputStream) -> Result<(), SystemException> {
        codec::encode(out, &self.value, &self.type_code)
    }

    /// Wire form: TypeCode followed by the value.
    pub fn write(&self, out: &mut OutputStream) -> Result<(), SystemException> {
        write_type_code(out, &self.type_code)?;
        self.write_value(out)
    }

    pub fn read(input: &mut InputStream) -> Result<Any, SystemException> {
        let type_code = read_type_code(input)?;
        let mut any = Any::new();
        any.read_value(input, type_code)?;
        Ok(any)
    }
}
