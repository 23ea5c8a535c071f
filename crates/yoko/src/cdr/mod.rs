// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CDR (Common Data Representation) streams.
//!
//! Primitives are naturally aligned (2/4/8 bytes) relative to an *alignment
//! origin*: the start of the GIOP message for message bodies, or the start of
//! an encapsulation (its byte-order octet) for nested data. Independently,
//! every stream tracks an *absolute base* so that TypeCode indirections can
//! be resolved across encapsulation boundaries.

mod input;
mod output;

pub use input::InputStream;
pub use output::OutputStream;

/// Byte order of a CDR stream.
///
/// The wire flag is `0` for big-endian and `1` for little-endian, both in
/// the GIOP header flags and as the first octet of an encapsulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    pub fn flag(self) -> u8 {
        match self {
            ByteOrder::BigEndian => 0,
            ByteOrder::LittleEndian => 1,
        }
    }

    /// Only the low bit is significant.
    pub fn from_flag(flag: u8) -> Self {
        if flag & 0x01 == 0 {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }
}

/// Padding needed to bring `position` to a multiple of `alignment`.
#[inline]
pub(crate) fn padding(position: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return 0;
    }
    let mask = alignment - 1;
    ((position + mask) & !mask) - position
}
