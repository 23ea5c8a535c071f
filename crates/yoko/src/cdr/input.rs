// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CDR input stream.

use super::{padding, ByteOrder};
use crate::config::MAX_NESTING;
use crate::exception::{minor, SystemException};

/// Generate aligned, bounds-checked read methods for primitive types.
///
/// Each generated method:
/// 1. Skips padding to the natural alignment of the type
/// 2. Checks remaining length (MARSHAL on underflow)
/// 3. Decodes in the stream's byte order and advances
macro_rules! impl_read_primitive {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type, SystemException> {
            self.align($size)?;
            let bytes = self.take($size)?;
            let mut raw = [0u8; $size];
            raw.copy_from_slice(bytes);
            Ok(match self.byte_order {
                ByteOrder::BigEndian => <$type>::from_be_bytes(raw),
                ByteOrder::LittleEndian => <$type>::from_le_bytes(raw),
            })
        }
    };
}

/// CDR decoder over an owned buffer.
#[derive(Debug, Clone)]
pub struct InputStream {
    buffer: Vec<u8>,
    offset: usize,
    byte_order: ByteOrder,
    origin: usize,
    base: usize,
    depth: usize,
}

impl InputStream {
    pub fn new(buffer: Vec<u8>, byte_order: ByteOrder) -> Self {
        Self::with_origin(buffer, byte_order, 0)
    }

    /// Stream whose first byte sits `origin` bytes into the enclosing message.
    pub fn with_origin(buffer: Vec<u8>, byte_order: ByteOrder, origin: usize) -> Self {
        Self {
            buffer,
            offset: 0,
            byte_order,
            origin,
            base: origin,
            depth: 0,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
    }

    /// Logical position (origin + bytes consumed).
    pub fn position(&self) -> usize {
        self.origin + self.offset
    }

    pub(crate) fn absolute_position(&self) -> usize {
        self.base + self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unconsumed bytes.
    pub fn remaining_bytes(&self) -> &[u8] {
        &self.buffer[self.offset.min(self.buffer.len())..]
    }

    /// Enter one level of a nested TypeCode or value. Pair with
    /// [`leave_nested`](Self::leave_nested).
    pub fn enter_nested(&mut self) -> Result<(), SystemException> {
        if self.depth >= MAX_NESTING {
            return Err(SystemException::marshal(
                minor::NESTING_TOO_DEEP,
                format!("nesting deeper than {} levels", MAX_NESTING),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave_nested(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn align(&mut self, alignment: usize) -> Result<(), SystemException> {
        let pad = padding(self.position(), alignment);
        if pad > self.remaining() {
            return Err(self.overflow(pad));
        }
        self.offset += pad;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), SystemException> {
        self.take(count).map(|_| ())
    }

    fn take(&mut self, count: usize) -> Result<&[u8], SystemException> {
        if count > self.remaining() {
            return Err(self.overflow(count));
        }
        let start = self.offset;
        self.offset += count;
        Ok(&self.buffer[start..start + count])
    }

    fn overflow(&self, wanted: usize) -> SystemException {
        SystemException::marshal(
            minor::READ_OVERFLOW,
            format!(
                "unexpected end of buffer at offset {} (wanted {}, have {})",
                self.offset,
                wanted,
                self.remaining()
            ),
        )
    }

    impl_read_primitive!(read_short, i16, 2);
    impl_read_primitive!(read_ushort, u16, 2);
    impl_read_primitive!(read_long, i32, 4);
    impl_read_primitive!(read_ulong, u32, 4);
    impl_read_primitive!(read_longlong, i64, 8);
    impl_read_primitive!(read_ulonglong, u64, 8);
    impl_read_primitive!(read_float, f32, 4);
    impl_read_primitive!(read_double, f64, 8);

    pub fn read_octet(&mut self) -> Result<u8, SystemException> {
        Ok(self.take(1)?[0])
    }

    pub fn read_boolean(&mut self) -> Result<bool, SystemException> {
        match self.read_octet()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SystemException::marshal(
                minor::BAD_BOOLEAN,
                format!("invalid boolean octet {}", other),
            )),
        }
    }

    pub fn read_char(&mut self) -> Result<char, SystemException> {
        Ok(char::from(self.read_octet()?))
    }

    /// Inverse of [`OutputStream::write_string`](super::OutputStream::write_string).
    ///
    /// A zero length is accepted as the empty string.
    pub fn read_string(&mut self) -> Result<String, SystemException> {
        let len = self.read_ulong()? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        if len > self.remaining() {
            return Err(SystemException::marshal(
                minor::LENGTH_TOO_LARGE,
                format!("string length {} exceeds remaining {}", len, self.remaining()),
            ));
        }
        let bytes = self.take(len)?;
        let (text, terminator) = bytes.split_at(len - 1);
        if terminator != [0] {
            return Err(SystemException::marshal(
                minor::STRING_NOT_TERMINATED,
                "string is not NUL terminated",
            ));
        }
        String::from_utf8(text.to_vec()).map_err(|e| {
            SystemException::marshal(minor::STRING_ENCODING, format!("invalid UTF-8: {}", e))
        })
    }

    /// Read a string without consuming it.
    pub fn peek_string(&mut self) -> Result<String, SystemException> {
        let saved = self.offset;
        let result = self.read_string();
        self.offset = saved;
        result
    }

    pub fn read_octet_array(&mut self, len: usize) -> Result<Vec<u8>, SystemException> {
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_octet_seq(&mut self) -> Result<Vec<u8>, SystemException> {
        let len = self.read_sequence_length(1)?;
        self.read_octet_array(len)
    }

    /// Read a sequence length, rejecting lengths that cannot possibly fit.
    ///
    /// `min_element_size` is the smallest encoded size of one element; it
    /// keeps a corrupt length from driving a huge allocation.
    pub fn read_sequence_length(&mut self, min_element_size: usize) -> Result<usize, SystemException> {
        let len = self.read_ulong()? as usize;
        if len.saturating_mul(min_element_size.max(1)) > self.remaining() {
            return Err(SystemException::marshal(
                minor::LENGTH_TOO_LARGE,
                format!("sequence length {} exceeds remaining {}", len, self.remaining()),
            ));
        }
        Ok(len)
    }

    /// Read a nested encapsulation.
    ///
    /// The returned stream has its own byte order (from the first octet),
    /// aligns relative to that octet and is positioned just after it.
    pub fn read_encapsulation(&mut self) -> Result<InputStream, SystemException> {
        let len = self.read_sequence_length(1)?;
        let data_base = self.absolute_position();
        let bytes = self.read_octet_array(len)?;
        let flag = *bytes.first().ok_or_else(|| {
            SystemException::marshal(minor::BAD_ENCAPSULATION, "empty encapsulation")
        })?;
        Ok(InputStream {
            buffer: bytes,
            offset: 1,
            byte_order: ByteOrder::from_flag(flag),
            origin: 0,
            base: data_base,
            depth: self.depth,
        })
    }

    /// Decode a standalone encapsulation (e.g. a stringified IOR payload).
    pub fn from_encapsulation(bytes: Vec<u8>) -> Result<InputStream, SystemException> {
        let flag = *bytes.first().ok_or_else(|| {
            SystemException::marshal(minor::BAD_ENCAPSULATION, "empty encapsulation")
        })?;
        Ok(InputStream {
            buffer: bytes,
            offset: 1,
            byte_order: ByteOrder::from_flag(flag),
            origin: 0,
            base: 0,
            depth: 0,
        })
    }
}
