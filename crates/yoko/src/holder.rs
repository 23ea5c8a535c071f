// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Holders for `out` and `inout` parameters.
//!
//! A holder owns at most one value of a fixed IDL type. Stubs fill it while
//! demarshalling a reply; it lives on the caller's stack for one call.

use crate::cdr::{InputStream, OutputStream};
use crate::exception::{minor, SystemException};
use crate::helper::Helper;
use crate::typecode::TypeCode;

#[derive(Debug, Clone, PartialEq)]
pub struct Holder<T> {
    pub value: Option<T>,
}

impl<T> Default for Holder<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: Helper> Holder<T> {
    /// Uninitialized holder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// Replace the held value with one read from `input`.
    pub fn read_from(&mut self, input: &mut InputStream) -> Result<(), SystemException> {
        self.value = Some(T::read(input)?);
        Ok(())
    }

    /// Write the held value; BAD_PARAM if the holder is empty.
    pub fn write_to(&self, out: &mut OutputStream) -> Result<(), SystemException> {
        match &self.value {
            Some(value) => T::write(out, value),
            None => Err(SystemException::bad_param(
                minor::HOLDER_EMPTY,
                "holder has no value",
            )),
        }
    }

    /// TypeCode of the held type.
    pub fn type_code(&self) -> TypeCode {
        T::type_code()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::ByteOrder;
    use crate::typecode::TcKind;

    #[test]
    fn test_read_write() {
        let source = Holder::with_value("bound".to_string());
        let mut out = OutputStream::new(ByteOrder::BigEndian);
        source.write_to(&mut out).unwrap();

        let mut target = Holder::<String>::new();
        assert!(target.get().is_none());
        target.read_from(&mut out.create_input_stream()).unwrap();
        assert_eq!(target.get().map(String::as_str), Some("bound"));
        assert_eq!(target.type_code().kind(), TcKind::String);
    }

    #[test]
    fn test_empty_holder_write_fails() {
        let holder = Holder::<u32>::new();
        let mut out = OutputStream::new(ByteOrder::BigEndian);
        let err = holder.write_to(&mut out).unwrap_err();
        assert_eq!(err.minor, minor::HOLDER_EMPTY);
        assert!(out.is_empty());
    }

    #[test]
    fn test_take() {
        let mut holder = Holder::with_value(vec![1u8, 2]);
        assert_eq!(holder.take(), Some(vec![1, 2]));
        assert!(holder.value.is_none());
    }
}
