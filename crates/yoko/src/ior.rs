// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interoperable Object References.
//!
//! Supports the IIOP profile, stringified `IOR:` references and
//! `corbaloc:` URLs (`iiop` and `rir` protocols).

use std::fmt;
use std::sync::Arc;

use crate::cdr::{ByteOrder, InputStream, OutputStream};
use crate::config::DEFAULT_NAMING_PORT;
use crate::exception::{minor, SystemException};

/// Repository id of `CORBA::Object`.
pub const OBJECT_ID: &str = "IDL:omg.org/CORBA/Object:1.0";

/// Profile tag of IIOP.
pub const TAG_INTERNET_IOP: u32 = 0;

/// Profile tag of the multiple-components profile.
pub const TAG_MULTIPLE_COMPONENTS: u32 = 1;

/// Host and port of an IIOP server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedProfile {
    pub tag: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedComponent {
    pub tag: u32,
    pub data: Vec<u8>,
}

/// Decoded `TAG_INTERNET_IOP` profile body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IiopProfile {
    pub major: u8,
    pub minor: u8,
    pub host: String,
    pub port: u16,
    pub object_key: Vec<u8>,
    /// Present from IIOP 1.1 on.
    pub components: Vec<TaggedComponent>,
}

impl IiopProfile {
    pub fn new(endpoint: &Endpoint, object_key: Vec<u8>, minor: u8) -> Self {
        Self {
            major: 1,
            minor,
            host: endpoint.host.clone(),
            port: endpoint.port,
            object_key,
            components: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn encode(&self, order: ByteOrder) -> Result<TaggedProfile, SystemException> {
        let mut out = OutputStream::new(order);
        out.write_octet(order.flag());
        out.write_octet(self.major);
        out.write_octet(self.minor);
        out.write_string(&self.host)?;
        out.write_ushort(self.port);
        out.write_octet_seq(&self.object_key)?;
        if self.minor >= 1 {
            out.write_sequence_length(self.components.len())?;
            for component in &self.components {
                out.write_ulong(component.tag);
                out.write_octet_seq(&component.data)?;
            }
        }
        Ok(TaggedProfile {
            tag: TAG_INTERNET_IOP,
            data: out.into_bytes(),
        })
    }

    pub fn decode(profile: &TaggedProfile) -> Result<Self, SystemException> {
        if profile.tag != TAG_INTERNET_IOP {
            return Err(SystemException::inv_objref(
                minor::NO_PROFILE,
                format!("profile tag {} is not IIOP", profile.tag),
            ));
        }
        let mut input = InputStream::from_encapsulation(profile.data.clone())?;
        let major = input.read_octet()?;
        let minor_version = input.read_octet()?;
        if major != 1 {
            return Err(SystemException::inv_objref(
                minor::BAD_VERSION,
                format!("unsupported IIOP version {}.{}", major, minor_version),
            ));
        }
        let host = input.read_string()?;
        let port = input.read_ushort()?;
        let object_key = input.read_octet_seq()?;
        let mut components = Vec::new();
        if minor_version >= 1 && !input.is_empty() {
            let count = input.read_sequence_length(8)?;
            for _ in 0..count {
                let tag = input.read_ulong()?;
                let data = input.read_octet_seq()?;
                components.push(TaggedComponent { tag, data });
            }
        }
        Ok(Self {
            major,
            minor: minor_version,
            host,
            port,
            object_key,
            components,
        })
    }
}

/// An object reference as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ior {
    pub type_id: String,
    pub profiles: Vec<TaggedProfile>,
}

impl Ior {
    pub fn nil() -> Self {
        Self::default()
    }

    /// Reference with a single IIOP profile.
    pub fn iiop(
        type_id: impl Into<String>,
        endpoint: &Endpoint,
        object_key: Vec<u8>,
        giop_minor: u8,
    ) -> Result<Self, SystemException> {
        let profile = IiopProfile::new(endpoint, object_key, giop_minor).encode(ByteOrder::BigEndian)?;
        Ok(Self {
            type_id: type_id.into(),
            profiles: vec![profile],
        })
    }

    pub fn is_nil(&self) -> bool {
        self.profiles.is_empty()
    }

    /// All decodable IIOP profiles, in order.
    pub fn iiop_profiles(&self) -> Vec<IiopProfile> {
        self.profiles
            .iter()
            .filter(|p| p.tag == TAG_INTERNET_IOP)
            .filter_map(|p| match IiopProfile::decode(p) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    log::debug!("[ior] skipping undecodable IIOP profile: {}", e);
                    None
                }
            })
            .collect()
    }

    /// First decodable IIOP profile.
    pub fn iiop_profile(&self) -> Option<IiopProfile> {
        self.iiop_profiles().into_iter().next()
    }

    pub fn write(&self, out: &mut OutputStream) -> Result<(), SystemException> {
        out.write_string(&self.type_id)?;
        out.write_sequence_length(self.profiles.len())?;
        for profile in &self.profiles {
            out.write_ulong(profile.tag);
            out.write_octet_seq(&profile.data)?;
        }
        Ok(())
    }

    pub fn read(input: &mut InputStream) -> Result<Ior, SystemException> {
        let type_id = input.read_string()?;
        let count = input.read_sequence_length(8)?;
        let mut profiles = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = input.read_ulong()?;
            let data = input.read_octet_seq()?;
            profiles.push(TaggedProfile { tag, data });
        }
        Ok(Ior { type_id, profiles })
    }

    /// `IOR:` followed by the hex encoding of an encapsulated IOR.
    pub fn to_ior_string(&self, order: ByteOrder) -> Result<String, SystemException> {
        let mut out = OutputStream::new(order);
        out.write_octet(order.flag());
        self.write(&mut out)?;
        let mut text = String::with_capacity(4 + out.len() * 2);
        text.push_str("IOR:");
        for byte in out.as_bytes() {
            text.push_str(&format!("{:02x}", byte));
        }
        Ok(text)
    }

    pub fn from_ior_string(text: &str) -> Result<Ior, SystemException> {
        let hex = text
            .get(..4)
            .filter(|prefix| prefix.eq_ignore_ascii_case("IOR:"))
            .map(|_| text[4..].trim())
            .ok_or_else(|| SystemException::bad_param(minor::BAD_IOR, "missing IOR: prefix"))?;
        if hex.len() % 2 != 0 {
            return Err(SystemException::bad_param(minor::BAD_IOR, "odd IOR hex length"));
        }
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| {
                hex.get(i..i + 2)
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| {
                        SystemException::bad_param(minor::BAD_IOR, "invalid hex digit in IOR")
                    })
            })
            .collect::<Result<Vec<u8>, _>>()?;
        let mut input = InputStream::from_encapsulation(bytes)?;
        Ior::read(&mut input)
    }
}

/// Shared, immutable object reference. May be nil.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    ior: Arc<Ior>,
}

impl From<Ior> for ObjectRef {
    fn from(ior: Ior) -> Self {
        Self { ior: Arc::new(ior) }
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::nil()
    }
}

impl ObjectRef {
    pub fn nil() -> Self {
        Ior::nil().into()
    }

    pub fn is_nil(&self) -> bool {
        self.ior.is_nil()
    }

    pub fn ior(&self) -> &Ior {
        &self.ior
    }

    pub fn type_id(&self) -> &str {
        &self.ior.type_id
    }

    /// Endpoint of the first IIOP profile.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.ior.iiop_profile().map(|p| p.endpoint())
    }

    /// Object key of the first IIOP profile.
    pub fn object_key(&self) -> Option<Vec<u8>> {
        self.ior.iiop_profile().map(|p| p.object_key)
    }

    /// Same object: identical endpoint and key of the first profile.
    pub fn is_equivalent(&self, other: &ObjectRef) -> bool {
        match (self.ior.iiop_profile(), other.ior.iiop_profile()) {
            (Some(a), Some(b)) => a.host == b.host && a.port == b.port && a.object_key == b.object_key,
            (None, None) => self.is_nil() && other.is_nil(),
            _ => false,
        }
    }
}

/// One address of a `corbaloc:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorbalocAddress {
    Iiop { minor: u8, endpoint: Endpoint },
    /// `rir:` - resolve through the ORB's initial references.
    Rir,
}

/// Parsed `corbaloc:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corbaloc {
    pub addresses: Vec<CorbalocAddress>,
    pub key: Vec<u8>,
}

impl Corbaloc {
    /// Parse `corbaloc:<addr>[,<addr>...]/<key>`.
    pub fn parse(url: &str) -> Result<Corbaloc, SystemException> {
        let rest = url
            .get(..9)
            .filter(|scheme| scheme.eq_ignore_ascii_case("corbaloc:"))
            .map(|_| &url[9..])
            .ok_or_else(|| bad_url(url, "missing corbaloc: scheme"))?;
        let (addr_list, key) = rest
            .split_once('/')
            .ok_or_else(|| bad_url(url, "missing object key"))?;

        let addresses = addr_list
            .split(',')
            .map(|addr| parse_address(url, addr))
            .collect::<Result<Vec<_>, _>>()?;
        if addresses.contains(&CorbalocAddress::Rir) && addresses.len() > 1 {
            return Err(bad_url(url, "rir: cannot be combined with other addresses"));
        }

        Ok(Corbaloc {
            addresses,
            key: unescape_key(key).ok_or_else(|| bad_url(url, "invalid % escape in key"))?,
        })
    }

    /// Reference with one IIOP profile per `iiop` address.
    pub fn to_ior(&self, type_id: &str) -> Result<Ior, SystemException> {
        let mut profiles = Vec::new();
        for address in &self.addresses {
            if let CorbalocAddress::Iiop { minor, endpoint } = address {
                profiles.push(
                    IiopProfile::new(endpoint, self.key.clone(), *minor).encode(ByteOrder::BigEndian)?,
                );
            }
        }
        Ok(Ior {
            type_id: type_id.to_string(),
            profiles,
        })
    }
}

fn bad_url(url: &str, reason: &str) -> SystemException {
    SystemException::bad_param(minor::BAD_URL, format!("{}: {}", reason, url))
}

fn parse_address(url: &str, addr: &str) -> Result<CorbalocAddress, SystemException> {
    if addr.eq_ignore_ascii_case("rir:") {
        return Ok(CorbalocAddress::Rir);
    }
    let body = if let Some(body) = addr.strip_prefix("iiop:") {
        body
    } else if let Some(body) = addr.strip_prefix(':') {
        body
    } else {
        return Err(bad_url(url, "unsupported corbaloc protocol"));
    };

    let (minor, host_port) = match body.split_once('@') {
        Some((version, rest)) => {
            let minor = match version {
                "1.0" => 0,
                "1.1" => 1,
                "1.2" => 2,
                _ => return Err(bad_url(url, "unsupported IIOP version")),
            };
            (minor, rest)
        }
        None => (0, body),
    };

    let (host, port) = if let Some(bracketed) = host_port.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| bad_url(url, "unterminated IPv6 address"))?;
        (host, after.strip_prefix(':'))
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    let host = if host.is_empty() { "localhost" } else { host };
    let port = match port {
        Some(p) if !p.is_empty() => p.parse().map_err(|_| bad_url(url, "invalid port"))?,
        _ => DEFAULT_NAMING_PORT,
    };

    Ok(CorbalocAddress::Iiop {
        minor,
        endpoint: Endpoint::new(host, port),
    })
}

/// Decode `%xx` escapes of a corbaloc key.
pub fn unescape_key(key: &str) -> Option<Vec<u8>> {
    let bytes = key.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let pair = key.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(pair, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}

/// Escape an object key for use in a corbaloc URL.
pub fn escape_key(key: &[u8]) -> String {
    let mut out = String::with_capacity(key.len());
    for &byte in key {
        if byte.is_ascii_alphanumeric() || b";:?@&=+$,-_.!~*'()".contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iiop_profile_roundtrip() {
        let mut profile = IiopProfile::new(&Endpoint::new("10.0.0.7", 2809), b"key".to_vec(), 2);
        profile.components.push(TaggedComponent {
            tag: 0,
            data: vec![0, 0, 0, 1],
        });
        for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
            let tagged = profile.encode(order).unwrap();
            assert_eq!(IiopProfile::decode(&tagged).unwrap(), profile);
        }
    }

    #[test]
    fn test_iiop_1_0_has_no_components() {
        let profile = IiopProfile::new(&Endpoint::new("h", 1), vec![1], 0);
        let decoded = IiopProfile::decode(&profile.encode(ByteOrder::BigEndian).unwrap()).unwrap();
        assert!(decoded.components.is_empty());
        assert_eq!(decoded.minor, 0);
    }

    #[test]
    fn test_stringified_ior() {
        let ior = Ior::iiop("IDL:test/Thing:1.0", &Endpoint::new("host", 4000), b"obj".to_vec(), 2)
            .unwrap();
        for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
            let text = ior.to_ior_string(order).unwrap();
            assert!(text.starts_with("IOR:"));
            assert_eq!(Ior::from_ior_string(&text).unwrap(), ior);
            assert_eq!(Ior::from_ior_string(&text.to_uppercase().replacen("IOR:", "ior:", 1)).unwrap(), ior);
        }
    }

    #[test]
    fn test_bad_ior_strings() {
        assert!(Ior::from_ior_string("IOR:0").is_err());
        assert!(Ior::from_ior_string("IOR:zz").is_err());
        assert!(Ior::from_ior_string("corbaloc::h/k").is_err());
    }

    #[test]
    fn test_nil_reference() {
        let nil = ObjectRef::nil();
        assert!(nil.is_nil());
        assert!(nil.endpoint().is_none());
        let text = nil.ior().to_ior_string(ByteOrder::BigEndian).unwrap();
        assert!(Ior::from_ior_string(&text).unwrap().is_nil());
    }

    #[test]
    fn test_corbaloc_parse() {
        let loc = Corbaloc::parse("corbaloc::localhost:2809/NameService").unwrap();
        assert_eq!(loc.key, b"NameService");
        assert_eq!(
            loc.addresses,
            vec![CorbalocAddress::Iiop {
                minor: 0,
                endpoint: Endpoint::new("localhost", 2809)
            }]
        );

        let loc = Corbaloc::parse("corbaloc:iiop:1.2@host,:other:900/a%2Fb").unwrap();
        assert_eq!(loc.key, b"a/b");
        assert_eq!(loc.addresses.len(), 2);
        assert_eq!(
            loc.addresses[0],
            CorbalocAddress::Iiop {
                minor: 2,
                endpoint: Endpoint::new("host", DEFAULT_NAMING_PORT)
            }
        );

        let loc = Corbaloc::parse("corbaloc:iiop:[::1]:7000/k").unwrap();
        assert_eq!(
            loc.addresses[0],
            CorbalocAddress::Iiop {
                minor: 0,
                endpoint: Endpoint::new("::1", 7000)
            }
        );

        let loc = Corbaloc::parse("corbaloc:rir:/NameService").unwrap();
        assert_eq!(loc.addresses, vec![CorbalocAddress::Rir]);
    }

    #[test]
    fn test_corbaloc_errors() {
        assert!(Corbaloc::parse("corbaloc::host").is_err());
        assert!(Corbaloc::parse("corbaloc:http:host/k").is_err());
        assert!(Corbaloc::parse("corbaloc::host:notaport/k").is_err());
        assert!(Corbaloc::parse("corbaloc::host/%zz").is_err());
        assert!(Corbaloc::parse("corbaloc:rir:,:host/k").is_err());
    }

    #[test]
    fn test_corbaloc_to_ior() {
        let loc = Corbaloc::parse("corbaloc::a:1,:b:2/key").unwrap();
        let ior = loc.to_ior(OBJECT_ID).unwrap();
        let profiles = ior.iiop_profiles();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].endpoint(), Endpoint::new("b", 2));
        assert_eq!(profiles[0].object_key, b"key");
    }

    #[test]
    fn test_key_escaping() {
        let key = b"Name Service\x01";
        let escaped = escape_key(key);
        assert_eq!(escaped, "Name%20Service%01");
        assert_eq!(unescape_key(&escaped).unwrap(), key);
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::new("host", 1).to_string(), "host:1");
        assert_eq!(Endpoint::new("::1", 2).to_string(), "[::1]:2");
    }
}
