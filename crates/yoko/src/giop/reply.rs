// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reply and LocateReply headers.

use super::request::{read_service_contexts, write_service_contexts};
use super::{ServiceContext, Version};
use crate::cdr::{InputStream, OutputStream};
use crate::exception::{minor, SystemException};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ReplyStatus {
    NoException = 0,
    UserException = 1,
    SystemException = 2,
    LocationForward = 3,
    LocationForwardPerm = 4,
    NeedsAddressingMode = 5,
}

impl ReplyStatus {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::NoException),
            1 => Some(Self::UserException),
            2 => Some(Self::SystemException),
            3 => Some(Self::LocationForward),
            4 => Some(Self::LocationForwardPerm),
            5 => Some(Self::NeedsAddressingMode),
            _ => None,
        }
    }
}

/// Header of a Reply message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHeader {
    pub request_id: u32,
    pub status: ReplyStatus,
    pub service_contexts: Vec<ServiceContext>,
}

impl ReplyHeader {
    pub fn new(request_id: u32, status: ReplyStatus) -> Self {
        Self {
            request_id,
            status,
            service_contexts: Vec::new(),
        }
    }

    /// Write the header; for GIOP 1.2 also pads to the 8-byte body boundary.
    pub fn write(&self, out: &mut OutputStream, version: Version) -> Result<(), SystemException> {
        if version.minor >= 2 {
            out.write_ulong(self.request_id);
            out.write_ulong(self.status as u32);
            write_service_contexts(out, &self.service_contexts)?;
            out.align(8);
        } else {
            if matches!(
                self.status,
                ReplyStatus::LocationForwardPerm | ReplyStatus::NeedsAddressingMode
            ) {
                return Err(SystemException::marshal(
                    minor::BAD_REPLY_STATUS,
                    format!("reply status {:?} requires GIOP 1.2", self.status),
                ));
            }
            write_service_contexts(out, &self.service_contexts)?;
            out.write_ulong(self.request_id);
            out.write_ulong(self.status as u32);
        }
        Ok(())
    }

    pub fn read(input: &mut InputStream, version: Version) -> Result<Self, SystemException> {
        let (request_id, raw_status, service_contexts) = if version.minor >= 2 {
            let request_id = input.read_ulong()?;
            let status = input.read_ulong()?;
            let contexts = read_service_contexts(input)?;
            (request_id, status, contexts)
        } else {
            let contexts = read_service_contexts(input)?;
            let request_id = input.read_ulong()?;
            let status = input.read_ulong()?;
            (request_id, status, contexts)
        };
        let status = ReplyStatus::from_u32(raw_status).ok_or_else(|| {
            SystemException::marshal(
                minor::BAD_REPLY_STATUS,
                format!("unknown reply status {}", raw_status),
            )
        })?;
        super::align_body(input, version)?;
        Ok(Self {
            request_id,
            status,
            service_contexts,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LocateStatus {
    UnknownObject = 0,
    ObjectHere = 1,
    ObjectForward = 2,
    ObjectForwardPerm = 3,
    LocSystemException = 4,
    LocNeedsAddressingMode = 5,
}

impl LocateStatus {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::UnknownObject),
            1 => Some(Self::ObjectHere),
            2 => Some(Self::ObjectForward),
            3 => Some(Self::ObjectForwardPerm),
            4 => Some(Self::LocSystemException),
            5 => Some(Self::LocNeedsAddressingMode),
            _ => None,
        }
    }
}

/// Header of a LocateReply message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateReplyHeader {
    pub request_id: u32,
    pub status: LocateStatus,
}

impl LocateReplyHeader {
    pub fn write(&self, out: &mut OutputStream, version: Version) -> Result<(), SystemException> {
        out.write_ulong(self.request_id);
        out.write_ulong(self.status as u32);
        if version.minor >= 2 {
            out.align(8);
        }
        Ok(())
    }

    pub fn read(input: &mut InputStream, version: Version) -> Result<Self, SystemException> {
        let request_id = input.read_ulong()?;
        let raw_status = input.read_ulong()?;
        let status = LocateStatus::from_u32(raw_status).ok_or_else(|| {
            SystemException::marshal(
                minor::BAD_REPLY_STATUS,
                format!("unknown locate status {}", raw_status),
            )
        })?;
        super::align_body(input, version)?;
        Ok(Self { request_id, status })
    }
}
