//! Transport-native variable-binding values.
//!
//! `WireValue` is the value half of a varbind exactly as the SNMP transport
//! delivers it: one variant per wire tag, no schema knowledge attached. The
//! typed layer ([`crate::types::TypedValue`]) decodes these against a schema
//! node; the session layer intercepts the three exception variants before
//! decode.

use crate::error::ExceptionKind;
use crate::oid::Oid;
use bytes::Bytes;
use std::fmt;

/// An SNMP value as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WireValue {
    /// INTEGER (signed 32-bit).
    Integer(i32),
    /// OCTET STRING.
    OctetString(Bytes),
    /// NULL (used in request varbinds).
    Null,
    /// OBJECT IDENTIFIER.
    ObjectIdentifier(Oid),
    /// IpAddress (4 bytes).
    IpAddress([u8; 4]),
    /// Counter32 (unsigned 32-bit, wraps).
    Counter32(u32),
    /// Gauge32/Unsigned32.
    Gauge32(u32),
    /// TimeTicks (hundredths of a second).
    TimeTicks(u32),
    /// Opaque (legacy wrapped encoding).
    Opaque(Bytes),
    /// Counter64 (unsigned 64-bit, wraps).
    Counter64(u64),
    /// noSuchObject exception (v2c/v3 response).
    NoSuchObject,
    /// noSuchInstance exception (v2c/v3 response).
    NoSuchInstance,
    /// endOfMibView exception (v2c/v3 response).
    EndOfMibView,
}

impl WireValue {
    /// Get integer value if this is an Integer.
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Get bytes if this is an OctetString.
    pub fn as_octet_string(&self) -> Option<&Bytes> {
        match self {
            Self::OctetString(v) => Some(v),
            _ => None,
        }
    }

    /// Get OID if this is an ObjectIdentifier.
    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Self::ObjectIdentifier(v) => Some(v),
            _ => None,
        }
    }

    /// Get the unsigned 32-bit payload of Counter32/Gauge32/TimeTicks.
    pub fn as_unsigned32(&self) -> Option<u32> {
        match self {
            Self::Counter32(v) | Self::Gauge32(v) | Self::TimeTicks(v) => Some(*v),
            _ => None,
        }
    }

    /// Get Counter64 value.
    pub fn as_counter64(&self) -> Option<u64> {
        match self {
            Self::Counter64(v) => Some(*v),
            _ => None,
        }
    }

    /// Check if this is one of the three exception markers.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView
        )
    }

    /// Exception kind, if this value is an exception marker.
    pub fn exception_kind(&self) -> Option<ExceptionKind> {
        match self {
            Self::NoSuchObject => Some(ExceptionKind::NoSuchObject),
            Self::NoSuchInstance => Some(ExceptionKind::NoSuchInstance),
            Self::EndOfMibView => Some(ExceptionKind::EndOfMibView),
            _ => None,
        }
    }

    /// Name of the wire tag, for diagnostics.
    pub fn tag_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "Integer",
            Self::OctetString(_) => "OctetString",
            Self::Null => "Null",
            Self::ObjectIdentifier(_) => "ObjectIdentifier",
            Self::IpAddress(_) => "IpAddress",
            Self::Counter32(_) => "Counter32",
            Self::Gauge32(_) => "Gauge32",
            Self::TimeTicks(_) => "TimeTicks",
            Self::Opaque(_) => "Opaque",
            Self::Counter64(_) => "Counter64",
            Self::NoSuchObject => "noSuchObject",
            Self::NoSuchInstance => "noSuchInstance",
            Self::EndOfMibView => "endOfMibView",
        }
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::OctetString(bytes) => {
                // Printable ASCII as text, otherwise hex
                if bytes.iter().all(|&b| (0x20..0x7F).contains(&b)) {
                    write!(f, "{}", String::from_utf8_lossy(bytes))
                } else {
                    for (i, b) in bytes.iter().enumerate() {
                        if i > 0 {
                            write!(f, " ")?;
                        }
                        write!(f, "{:02X}", b)?;
                    }
                    Ok(())
                }
            }
            Self::Null => write!(f, "NULL"),
            Self::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Self::IpAddress(octets) => write!(
                f,
                "{}.{}.{}.{}",
                octets[0], octets[1], octets[2], octets[3]
            ),
            Self::Counter32(v) => write!(f, "{}", v),
            Self::Gauge32(v) => write!(f, "{}", v),
            Self::TimeTicks(v) => write!(f, "{}", v),
            Self::Opaque(bytes) => write!(f, "Opaque({} bytes)", bytes.len()),
            Self::Counter64(v) => write!(f, "{}", v),
            Self::NoSuchObject => write!(f, "noSuchObject"),
            Self::NoSuchInstance => write!(f, "noSuchInstance"),
            Self::EndOfMibView => write!(f, "endOfMibView"),
        }
    }
}

impl From<i32> for WireValue {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        Self::OctetString(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<Bytes> for WireValue {
    fn from(v: Bytes) -> Self {
        Self::OctetString(v)
    }
}

impl From<Vec<u8>> for WireValue {
    fn from(v: Vec<u8>) -> Self {
        Self::OctetString(Bytes::from(v))
    }
}

impl From<Oid> for WireValue {
    fn from(v: Oid) -> Self {
        Self::ObjectIdentifier(v)
    }
}

impl From<[u8; 4]> for WireValue {
    fn from(v: [u8; 4]) -> Self {
        Self::IpAddress(v)
    }
}
