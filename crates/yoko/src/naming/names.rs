// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stringified names (`a.kind/b/c`) and `corbaname` URLs.
//!
//! `/` separates components, the first unescaped `.` separates id from
//! kind and `\` escapes either of them (or itself). A lone `.` is the
//! component with empty id and kind.

use super::types::{InvalidAddress, InvalidName, NameComponent, NamingError};
use crate::ior::Corbaloc;

/// Stringified form of `name`.
pub fn to_string(name: &[NameComponent]) -> Result<String, NamingError> {
    if name.is_empty() {
        return Err(NamingError::InvalidName(InvalidName));
    }
    let mut out = String::new();
    for (i, component) in name.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        if component.id.is_empty() && component.kind.is_empty() {
            out.push('.');
            continue;
        }
        escape_into(&mut out, &component.id);
        if !component.kind.is_empty() {
            out.push('.');
            escape_into(&mut out, &component.kind);
        }
    }
    Ok(out)
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        if matches!(c, '/' | '.' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Parse a stringified name.
pub fn to_name(text: &str) -> Result<Vec<NameComponent>, NamingError> {
    let invalid = || NamingError::InvalidName(InvalidName);
    if text.is_empty() {
        return Err(invalid());
    }

    let mut name = Vec::new();
    let mut id = String::new();
    let mut kind = String::new();
    let mut in_kind = false;
    let mut raw_len = 0usize;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next().ok_or_else(invalid)?;
                raw_len += 1;
                if in_kind { &mut kind } else { &mut id }.push(escaped);
            }
            '/' => {
                if raw_len == 0 {
                    return Err(invalid());
                }
                name.push(finish_component(&mut id, &mut kind, in_kind, raw_len)?);
                in_kind = false;
                raw_len = 0;
            }
            '.' => {
                if in_kind {
                    return Err(invalid());
                }
                in_kind = true;
                raw_len += 1;
            }
            other => {
                raw_len += 1;
                if in_kind { &mut kind } else { &mut id }.push(other);
            }
        }
    }
    if raw_len == 0 {
        return Err(invalid());
    }
    name.push(finish_component(&mut id, &mut kind, in_kind, raw_len)?);
    Ok(name)
}

fn finish_component(
    id: &mut String,
    kind: &mut String,
    had_dot: bool,
    raw_len: usize,
) -> Result<NameComponent, NamingError> {
    // ".x" is an empty id with kind x; "x." is an error
    if had_dot && kind.is_empty() && raw_len > 1 {
        return Err(NamingError::InvalidName(InvalidName));
    }
    Ok(NameComponent::new(std::mem::take(id), std::mem::take(kind)))
}

/// `corbaname:<address>#<escaped name>`.
///
/// `address` is the corbaloc address list (`:host:2809`, `iiop:1.2@host`).
pub fn to_url(address: &str, string_name: &str) -> Result<String, NamingError> {
    if address.is_empty() || Corbaloc::parse(&format!("corbaloc:{}/NameService", address)).is_err() {
        return Err(NamingError::InvalidAddress(InvalidAddress));
    }
    to_name(string_name)?;

    let mut url = format!("corbaname:{}#", address);
    for byte in string_name.bytes() {
        if byte.is_ascii_alphanumeric() || b";/:?@&=+$,-_.!~*'()".contains(&byte) {
            url.push(char::from(byte));
        } else {
            url.push_str(&format!("%{:02x}", byte));
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nc(id: &str, kind: &str) -> NameComponent {
        NameComponent::new(id, kind)
    }

    #[test]
    fn test_to_string_simple() {
        let name = vec![nc("a", "b"), nc("c", ""), nc("", "d")];
        assert_eq!(to_string(&name).unwrap(), "a.b/c/.d");
        assert_eq!(to_string(&[nc("", "")]).unwrap(), ".");
    }

    #[test]
    fn test_to_string_escapes() {
        let name = vec![nc("a/b", "c.d"), nc("x\\y", "")];
        assert_eq!(to_string(&name).unwrap(), "a\\/b.c\\.d/x\\\\y");
    }

    #[test]
    fn test_roundtrip_through_text() {
        let name = vec![nc("a/b", "c.d"), nc("plain", ""), nc("", "k"), nc("", "")];
        let text = to_string(&name).unwrap();
        assert_eq!(to_name(&text).unwrap(), name);
    }

    #[test]
    fn test_to_name_parses_components() {
        assert_eq!(
            to_name("printers.dir/laser").unwrap(),
            vec![nc("printers", "dir"), nc("laser", "")]
        );
        assert_eq!(to_name(".").unwrap(), vec![nc("", "")]);
    }

    #[test]
    fn test_to_name_rejects_malformed() {
        for bad in ["", "/", "a//b", "a/", "/a", "a.b.c", "a\\", "a."] {
            assert!(
                matches!(to_name(bad), Err(NamingError::InvalidName(_))),
                "{:?} should be invalid",
                bad
            );
        }
        assert!(matches!(to_string(&[]), Err(NamingError::InvalidName(_))));
    }

    #[test]
    fn test_to_url() {
        assert_eq!(
            to_url(":myhost:2809", "a.b/c d").unwrap(),
            "corbaname::myhost:2809#a.b/c%20d"
        );
        assert!(matches!(to_url("", "a"), Err(NamingError::InvalidAddress(_))));
        assert!(matches!(to_url("bogus:x", "a"), Err(NamingError::InvalidAddress(_))));
        assert!(matches!(to_url(":host", ""), Err(NamingError::InvalidName(_))));
    }
}
