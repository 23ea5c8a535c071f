// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request and LocateRequest headers.

use super::Version;
use crate::cdr::{InputStream, OutputStream};
use crate::exception::{minor, SystemException};
use crate::ior::{IiopProfile, Ior, TaggedProfile};

/// Tagged context data attached to requests and replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContext {
    pub context_id: u32,
    pub context_data: Vec<u8>,
}

pub(crate) fn write_service_contexts(
    out: &mut OutputStream,
    contexts: &[ServiceContext],
) -> Result<(), SystemException> {
    out.write_sequence_length(contexts.len())?;
    for context in contexts {
        out.write_ulong(context.context_id);
        out.write_octet_seq(&context.context_data)?;
    }
    Ok(())
}

pub(crate) fn read_service_contexts(input: &mut InputStream) -> Result<Vec<ServiceContext>, SystemException> {
    let count = input.read_sequence_length(8)?;
    let mut contexts = Vec::with_capacity(count);
    for _ in 0..count {
        let context_id = input.read_ulong()?;
        let context_data = input.read_octet_seq()?;
        contexts.push(ServiceContext {
            context_id,
            context_data,
        });
    }
    Ok(contexts)
}

/// GIOP 1.2 target addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddress {
    Key(Vec<u8>),
    Profile(TaggedProfile),
    Reference { selected_profile: u32, ior: Ior },
}

impl TargetAddress {
    const KEY_ADDR: i16 = 0;
    const PROFILE_ADDR: i16 = 1;
    const REFERENCE_ADDR: i16 = 2;

    /// Object key addressed, whatever the addressing disposition.
    pub fn object_key(&self) -> Result<Vec<u8>, SystemException> {
        match self {
            TargetAddress::Key(key) => Ok(key.clone()),
            TargetAddress::Profile(profile) => Ok(IiopProfile::decode(profile)?.object_key),
            TargetAddress::Reference {
                selected_profile,
                ior,
            } => {
                let profile = ior.profiles.get(*selected_profile as usize).ok_or_else(|| {
                    SystemException::marshal(minor::NO_PROFILE, "selected profile out of range")
                })?;
                Ok(IiopProfile::decode(profile)?.object_key)
            }
        }
    }

    fn write(&self, out: &mut OutputStream) -> Result<(), SystemException> {
        match self {
            TargetAddress::Key(key) => {
                out.write_short(Self::KEY_ADDR);
                out.write_octet_seq(key)
            }
            TargetAddress::Profile(profile) => {
                out.write_short(Self::PROFILE_ADDR);
                out.write_ulong(profile.tag);
                out.write_octet_seq(&profile.data)
            }
            TargetAddress::Reference {
                selected_profile,
                ior,
            } => {
                out.write_short(Self::REFERENCE_ADDR);
                out.write_ulong(*selected_profile);
                ior.write(out)
            }
        }
    }

    fn read(input: &mut InputStream) -> Result<Self, SystemException> {
        match input.read_short()? {
            Self::KEY_ADDR => Ok(TargetAddress::Key(input.read_octet_seq()?)),
            Self::PROFILE_ADDR => {
                let tag = input.read_ulong()?;
                let data = input.read_octet_seq()?;
                Ok(TargetAddress::Profile(TaggedProfile { tag, data }))
            }
            Self::REFERENCE_ADDR => {
                let selected_profile = input.read_ulong()?;
                let ior = Ior::read(input)?;
                Ok(TargetAddress::Reference {
                    selected_profile,
                    ior,
                })
            }
            other => Err(SystemException::marshal(
                minor::VALUE_MISMATCH,
                format!("unknown addressing disposition {}", other),
            )),
        }
    }
}

/// Header of a Request message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub request_id: u32,
    pub response_expected: bool,
    pub target: TargetAddress,
    pub operation: String,
    pub service_contexts: Vec<ServiceContext>,
}

impl RequestHeader {
    /// Write the header; for GIOP 1.2 also pads to the 8-byte body boundary.
    pub fn write(&self, out: &mut OutputStream, version: Version) -> Result<(), SystemException> {
        if version.minor >= 2 {
            out.write_ulong(self.request_id);
            out.write_octet(if self.response_expected { 0x03 } else { 0x00 });
            out.write_octet_array(&[0, 0, 0]);
            self.target.write(out)?;
            out.write_string(&self.operation)?;
            write_service_contexts(out, &self.service_contexts)?;
            out.align(8);
        } else {
            write_service_contexts(out, &self.service_contexts)?;
            out.write_ulong(self.request_id);
            out.write_boolean(self.response_expected);
            if version.minor == 1 {
                out.write_octet_array(&[0, 0, 0]);
            }
            out.write_octet_seq(&self.target.object_key()?)?;
            out.write_string(&self.operation)?;
            // requesting_principal
            out.write_octet_seq(&[])?;
        }
        Ok(())
    }

    /// Read the header, leaving `input` at the start of the arguments.
    pub fn read(input: &mut InputStream, version: Version) -> Result<Self, SystemException> {
        let header = if version.minor >= 2 {
            let request_id = input.read_ulong()?;
            let flags = input.read_octet()?;
            input.skip(3)?;
            let target = TargetAddress::read(input)?;
            let operation = input.read_string()?;
            let service_contexts = read_service_contexts(input)?;
            RequestHeader {
                request_id,
                response_expected: flags != 0,
                target,
                operation,
                service_contexts,
            }
        } else {
            let service_contexts = read_service_contexts(input)?;
            let request_id = input.read_ulong()?;
            let response_expected = input.read_boolean()?;
            if version.minor == 1 {
                input.skip(3)?;
            }
            let key = input.read_octet_seq()?;
            let operation = input.read_string()?;
            let _principal = input.read_octet_seq()?;
            RequestHeader {
                request_id,
                response_expected,
                target: TargetAddress::Key(key),
                operation,
                service_contexts,
            }
        };
        super::align_body(input, version)?;
        Ok(header)
    }
}

/// Header of a LocateRequest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateRequestHeader {
    pub request_id: u32,
    pub target: TargetAddress,
}

impl LocateRequestHeader {
    pub fn write(&self, out: &mut OutputStream, version: Version) -> Result<(), SystemException> {
        out.write_ulong(self.request_id);
        if version.minor >= 2 {
            self.target.write(out)
        } else {
            out.write_octet_seq(&self.target.object_key()?)
        }
    }

    pub fn read(input: &mut InputStream, version: Version) -> Result<Self, SystemException> {
        let request_id = input.read_ulong()?;
        let target = if version.minor >= 2 {
            TargetAddress::read(input)?
        } else {
            TargetAddress::Key(input.read_octet_seq()?)
        };
        Ok(Self { request_id, target })
    }
}
