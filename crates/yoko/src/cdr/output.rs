// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CDR output stream.

use super::{padding, ByteOrder, InputStream};
use crate::exception::{minor, SystemException};

/// Generate aligned write methods for primitive types.
///
/// Each generated method pads to the natural alignment of the type, then
/// appends the value in the stream's byte order. Writes into the growable
/// buffer cannot fail.
macro_rules! impl_write_primitive {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self, value: $type) {
            self.align($size);
            match self.byte_order {
                ByteOrder::BigEndian => self.buffer.extend_from_slice(&value.to_be_bytes()),
                ByteOrder::LittleEndian => self.buffer.extend_from_slice(&value.to_le_bytes()),
            }
        }
    };
}

/// Growable CDR encoder.
#[derive(Debug, Clone)]
pub struct OutputStream {
    buffer: Vec<u8>,
    byte_order: ByteOrder,
    /// Logical offset of `buffer[0]` for alignment purposes.
    origin: usize,
    /// Absolute offset of `buffer[0]` for TypeCode indirections.
    base: usize,
}

impl OutputStream {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self::with_origin(byte_order, 0)
    }

    /// Stream whose first byte sits `origin` bytes into the enclosing message.
    ///
    /// GIOP bodies are written with `origin = 12` so that alignment matches
    /// the receiver, which aligns relative to the message header.
    pub fn with_origin(byte_order: ByteOrder, origin: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(256),
            byte_order,
            origin,
            base: origin,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Logical position (origin + bytes written).
    pub fn position(&self) -> usize {
        self.origin + self.buffer.len()
    }

    pub(crate) fn absolute_position(&self) -> usize {
        self.base + self.buffer.len()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Pad with zero octets up to `alignment`.
    pub fn align(&mut self, alignment: usize) {
        let pad = padding(self.position(), alignment);
        self.buffer.resize(self.buffer.len() + pad, 0);
    }

    impl_write_primitive!(write_short, i16, 2);
    impl_write_primitive!(write_ushort, u16, 2);
    impl_write_primitive!(write_long, i32, 4);
    impl_write_primitive!(write_ulong, u32, 4);
    impl_write_primitive!(write_longlong, i64, 8);
    impl_write_primitive!(write_ulonglong, u64, 8);
    impl_write_primitive!(write_float, f32, 4);
    impl_write_primitive!(write_double, f64, 8);

    pub fn write_octet(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_boolean(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    /// IDL `char` is a single ISO 8859-1 octet.
    pub fn write_char(&mut self, value: char) -> Result<(), SystemException> {
        let code = u32::from(value);
        let octet = u8::try_from(code).map_err(|_| {
            SystemException::data_conversion(
                minor::STRING_ENCODING,
                format!("char U+{:04X} not representable in ISO 8859-1", code),
            )
        })?;
        self.buffer.push(octet);
        Ok(())
    }

    /// `ulong` length (including the terminating NUL), bytes, NUL.
    pub fn write_string(&mut self, value: &str) -> Result<(), SystemException> {
        if value.as_bytes().contains(&0) {
            return Err(SystemException::data_conversion(
                minor::STRING_ENCODING,
                "string contains an embedded NUL",
            ));
        }
        let len = u32::try_from(value.len() + 1).map_err(|_| {
            SystemException::marshal(minor::LENGTH_TOO_LARGE, "string too long")
        })?;
        self.write_ulong(len);
        self.buffer.extend_from_slice(value.as_bytes());
        self.buffer.push(0);
        Ok(())
    }

    /// Raw octets, no length prefix, no alignment.
    pub fn write_octet_array(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// `sequence<octet>`: `ulong` length followed by the bytes.
    pub fn write_octet_seq(&mut self, bytes: &[u8]) -> Result<(), SystemException> {
        self.write_sequence_length(bytes.len())?;
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Sequence length prefix.
    pub fn write_sequence_length(&mut self, len: usize) -> Result<(), SystemException> {
        let len = u32::try_from(len).map_err(|_| {
            SystemException::marshal(minor::LENGTH_TOO_LARGE, "sequence too long")
        })?;
        self.write_ulong(len);
        Ok(())
    }

    /// Write an encapsulation produced by `body`.
    ///
    /// The nested stream starts with this stream's byte-order octet and
    /// aligns relative to that octet; the result is emitted as a
    /// `sequence<octet>`.
    pub fn write_encapsulation<F>(&mut self, body: F) -> Result<(), SystemException>
    where
        F: FnOnce(&mut OutputStream) -> Result<(), SystemException>,
    {
        // Data starts after the aligned ulong length
        let length_at = self.absolute_position() + padding(self.position(), 4);
        let mut encap = OutputStream {
            buffer: Vec::with_capacity(64),
            byte_order: self.byte_order,
            origin: 0,
            base: length_at + 4,
        };
        encap.write_octet(self.byte_order.flag());
        body(&mut encap)?;
        self.write_octet_seq(&encap.buffer)
    }

    /// Input stream over the bytes written so far, with the same origin.
    pub fn create_input_stream(&self) -> InputStream {
        InputStream::with_origin(self.buffer.clone(), self.byte_order, self.origin)
    }
}
