// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! GIOP 1.0 - 1.2 message framing.
//!
//! Every message is a 12-byte header followed by a body whose alignment is
//! computed from the start of the header:
//!
//! ```text
//! 0      4     5     6      7       8            12
//! +------+-----+-----+------+-------+------------+---------
//! | GIOP | maj | min | flags| type  | body size  | body ...
//! +------+-----+-----+------+-------+------------+---------
//! ```
//!
//! `flags` bit 0 is the byte order, bit 1 (GIOP 1.1+) announces that
//! fragments follow. Fragmented messages are not supported.

mod reply;
mod request;

pub use reply::{LocateReplyHeader, LocateStatus, ReplyHeader, ReplyStatus};
pub use request::{LocateRequestHeader, RequestHeader, ServiceContext, TargetAddress};

use std::io::Read;

use crate::cdr::{ByteOrder, InputStream, OutputStream};
use crate::config::{GIOP_HEADER_SIZE, GIOP_MAGIC, GIOP_MAJOR, GIOP_MAX_MINOR};
use crate::exception::{minor, CompletionStatus, SystemException};

/// Flag bit announcing more fragments.
const FLAG_FRAGMENT: u8 = 0x02;

/// GIOP message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Request = 0,
    Reply = 1,
    CancelRequest = 2,
    LocateRequest = 3,
    LocateReply = 4,
    CloseConnection = 5,
    MessageError = 6,
    Fragment = 7,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Request),
            1 => Some(Self::Reply),
            2 => Some(Self::CancelRequest),
            3 => Some(Self::LocateRequest),
            4 => Some(Self::LocateReply),
            5 => Some(Self::CloseConnection),
            6 => Some(Self::MessageError),
            7 => Some(Self::Fragment),
            _ => None,
        }
    }
}

/// GIOP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const V1_0: Version = Version { major: 1, minor: 0 };
    pub const V1_1: Version = Version { major: 1, minor: 1 };
    pub const V1_2: Version = Version { major: 1, minor: 2 };

    pub fn new(minor: u8) -> Self {
        Version {
            major: GIOP_MAJOR,
            minor: minor.min(GIOP_MAX_MINOR),
        }
    }
}

/// Decoded 12-byte message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: Version,
    pub byte_order: ByteOrder,
    pub message_type: MessageType,
    pub body_size: u32,
}

impl MessageHeader {
    pub fn decode(bytes: &[u8; GIOP_HEADER_SIZE]) -> Result<Self, SystemException> {
        if bytes[..4] != GIOP_MAGIC {
            return Err(SystemException::comm_failure(
                minor::BAD_MAGIC,
                format!("bad GIOP magic {:02x?}", &bytes[..4]),
            ));
        }
        let version = Version {
            major: bytes[4],
            minor: bytes[5],
        };
        if version.major != GIOP_MAJOR || version.minor > GIOP_MAX_MINOR {
            return Err(SystemException::comm_failure(
                minor::BAD_VERSION,
                format!("unsupported GIOP version {}.{}", version.major, version.minor),
            ));
        }
        let flags = bytes[6];
        let byte_order = ByteOrder::from_flag(flags);
        let message_type = MessageType::from_u8(bytes[7]).ok_or_else(|| {
            SystemException::comm_failure(
                minor::BAD_MESSAGE_TYPE,
                format!("unknown GIOP message type {}", bytes[7]),
            )
        })?;
        if message_type == MessageType::Fragment || (version.minor >= 1 && flags & FLAG_FRAGMENT != 0) {
            return Err(SystemException::no_implement(
                minor::FRAGMENT_UNSUPPORTED,
                "fragmented GIOP messages are not supported",
            ));
        }
        let mut size = [0u8; 4];
        size.copy_from_slice(&bytes[8..12]);
        let body_size = match byte_order {
            ByteOrder::BigEndian => u32::from_be_bytes(size),
            ByteOrder::LittleEndian => u32::from_le_bytes(size),
        };
        Ok(Self {
            version,
            byte_order,
            message_type,
            body_size,
        })
    }

    pub fn encode(&self) -> [u8; GIOP_HEADER_SIZE] {
        let mut bytes = [0u8; GIOP_HEADER_SIZE];
        bytes[..4].copy_from_slice(&GIOP_MAGIC);
        bytes[4] = self.version.major;
        bytes[5] = self.version.minor;
        bytes[6] = self.byte_order.flag();
        bytes[7] = self.message_type as u8;
        let size = match self.byte_order {
            ByteOrder::BigEndian => self.body_size.to_be_bytes(),
            ByteOrder::LittleEndian => self.body_size.to_le_bytes(),
        };
        bytes[8..12].copy_from_slice(&size);
        bytes
    }
}

/// A received message: header plus body stream aligned at offset 12.
#[derive(Debug)]
pub struct Message {
    pub header: MessageHeader,
    pub body: InputStream,
}

/// Stream for a message body, aligned as if preceded by the header.
pub fn body_stream(order: ByteOrder) -> OutputStream {
    OutputStream::with_origin(order, GIOP_HEADER_SIZE)
}

/// Prefix `body` with a GIOP header.
pub fn frame(
    version: Version,
    message_type: MessageType,
    body: OutputStream,
) -> Result<Vec<u8>, SystemException> {
    let body_size = u32::try_from(body.len()).map_err(|_| {
        SystemException::marshal(minor::MESSAGE_TOO_LARGE, "message body exceeds 4 GiB")
    })?;
    let header = MessageHeader {
        version,
        byte_order: body.byte_order(),
        message_type,
        body_size,
    };
    let bytes = body.into_bytes();
    let mut message = Vec::with_capacity(GIOP_HEADER_SIZE + bytes.len());
    message.extend_from_slice(&header.encode());
    message.extend_from_slice(&bytes);
    Ok(message)
}

/// Header-only message (CloseConnection, MessageError).
pub fn control_message(version: Version, message_type: MessageType) -> Vec<u8> {
    MessageHeader {
        version,
        byte_order: ByteOrder::BigEndian,
        message_type,
        body_size: 0,
    }
    .encode()
    .to_vec()
}

/// Parse a complete message held in memory.
pub fn parse_message(bytes: &[u8], max_body: usize) -> Result<Message, SystemException> {
    let mut header_bytes = [0u8; GIOP_HEADER_SIZE];
    let head = bytes.get(..GIOP_HEADER_SIZE).ok_or_else(|| {
        SystemException::comm_failure(minor::RECV, "truncated GIOP header")
    })?;
    header_bytes.copy_from_slice(head);
    let header = MessageHeader::decode(&header_bytes)?;
    check_size(&header, max_body)?;
    let body = &bytes[GIOP_HEADER_SIZE..];
    if body.len() != header.body_size as usize {
        return Err(SystemException::comm_failure(
            minor::RECV,
            format!("body size {} does not match header {}", body.len(), header.body_size),
        ));
    }
    Ok(Message {
        header,
        body: InputStream::with_origin(body.to_vec(), header.byte_order, GIOP_HEADER_SIZE),
    })
}

/// Read one message from a blocking reader.
///
/// EOF before the first header byte yields COMM_FAILURE with
/// `minor::CONNECTION_CLOSED` so callers can tell orderly closes apart.
pub fn read_message<R: Read>(reader: &mut R, max_body: usize) -> Result<Message, SystemException> {
    let mut header_bytes = [0u8; GIOP_HEADER_SIZE];
    read_header(reader, &mut header_bytes)?;
    let header = MessageHeader::decode(&header_bytes)?;
    check_size(&header, max_body)?;

    let mut body = vec![0u8; header.body_size as usize];
    reader.read_exact(&mut body).map_err(|e| {
        SystemException::comm_failure(minor::RECV, format!("reading GIOP body: {}", e))
            .with_completed(CompletionStatus::Maybe)
    })?;
    Ok(Message {
        header,
        body: InputStream::with_origin(body, header.byte_order, GIOP_HEADER_SIZE),
    })
}

fn read_header<R: Read>(reader: &mut R, buf: &mut [u8; GIOP_HEADER_SIZE]) -> Result<(), SystemException> {
    let mut filled = 0;
    while filled < GIOP_HEADER_SIZE {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => {
                return Err(SystemException::comm_failure(
                    minor::CONNECTION_CLOSED,
                    "connection closed by peer",
                )
                .with_completed(CompletionStatus::Maybe))
            }
            Ok(0) => {
                return Err(SystemException::comm_failure(minor::RECV, "truncated GIOP header")
                    .with_completed(CompletionStatus::Maybe))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ) =>
            {
                return Err(SystemException::timeout(minor::RECV, "timed out waiting for reply")
                    .with_completed(CompletionStatus::Maybe))
            }
            Err(e) => {
                return Err(SystemException::comm_failure(
                    minor::RECV,
                    format!("reading GIOP header: {}", e),
                )
                .with_completed(CompletionStatus::Maybe))
            }
        }
    }
    Ok(())
}

fn check_size(header: &MessageHeader, max_body: usize) -> Result<(), SystemException> {
    if header.body_size as usize > max_body {
        return Err(SystemException::imp_limit(
            minor::MESSAGE_TOO_LARGE,
            format!("message body of {} bytes exceeds limit {}", header.body_size, max_body),
        ));
    }
    Ok(())
}

/// Skip the 8-byte alignment GIOP 1.2 places before a non-empty body.
pub(crate) fn align_body(input: &mut InputStream, version: Version) -> Result<(), SystemException> {
    if version.minor >= 2 && !input.is_empty() {
        input.align(8)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
