//! Schema-validated typed values.
//!
//! [`TypedValue`] is the bridge between the wire representation
//! ([`crate::wire::WireValue`]) and application values. Every `TypedValue`
//! carries the schema node it was validated against; the SET path cannot
//! construct one without passing range, length, and enumeration checks.

pub mod hint;

use crate::error::{
    DecodeErrorKind, Error, Result, ValidationErrorKind,
};
use crate::oid::Oid;
use crate::schema::{NodeRef, SmiType, ValueKind};
use crate::wire::WireValue;
use bytes::Bytes;
use std::fmt;

/// TimeTicks value in centiseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timeticks(pub u32);

impl Timeticks {
    pub fn days(&self) -> u32 {
        self.0 / 8_640_000
    }

    pub fn hours(&self) -> u32 {
        (self.0 / 360_000) % 24
    }

    pub fn minutes(&self) -> u32 {
        (self.0 / 6_000) % 60
    }

    pub fn seconds(&self) -> u32 {
        (self.0 / 100) % 60
    }

    pub fn hundredths(&self) -> u32 {
        self.0 % 100
    }

    /// Raw tick count (centiseconds).
    pub fn ticks(&self) -> u32 {
        self.0
    }

    pub fn as_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::from(self.0) * 10)
    }
}

impl fmt::Display for Timeticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days() > 0 {
            write!(f, "{} days, ", self.days())?;
        }
        write!(
            f,
            "{}:{:02}:{:02}.{:02}",
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.hundredths()
        )
    }
}

/// A plain Rust value offered to or extracted from a [`TypedValue`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NativeValue {
    Int(i64),
    UInt(u64),
    Bytes(Vec<u8>),
    Text(String),
    Oid(Oid),
    Ip([u8; 4]),
    Bool(bool),
    /// Named bits of a BITS construct.
    Names(Vec<String>),
}

impl From<i64> for NativeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for NativeValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u64> for NativeValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<u32> for NativeValue {
    fn from(v: u32) -> Self {
        Self::UInt(v.into())
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for NativeValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Oid> for NativeValue {
    fn from(v: Oid) -> Self {
        Self::Oid(v)
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<[u8; 4]> for NativeValue {
    fn from(v: [u8; 4]) -> Self {
        Self::Ip(v)
    }
}

/// Payload of a [`TypedValue`], one variant per resolved [`ValueKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Repr {
    Integer(i64),
    Unsigned(u64),
    OctetString(Bytes),
    /// Octet string with its display-hint rendering.
    String { bytes: Bytes, pretty: String },
    Oid(Oid),
    IpAddress([u8; 4]),
    /// `label` is `None` only for loose-mode decodes of unmapped values.
    Enum { value: i64, label: Option<Box<str>> },
    Bool(bool),
    /// Raw BITS octets, msb-first within each octet.
    Bits(Bytes),
    Timeticks(Timeticks),
}

/// How an index element maps onto OID arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStyle {
    /// Fixed-width element: exactly this many arcs, no length prefix.
    Fixed(usize),
    /// Variable-length element: a length arc followed by that many arcs.
    LengthPrefixed,
    /// Final IMPLIED element: consumes the remainder, no length prefix.
    Implied,
}

/// A value validated against a schema node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedValue {
    node: NodeRef,
    repr: Repr,
}

impl TypedValue {
    /// The schema node this value was validated against.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// The resolved kind of this value.
    pub fn kind(&self) -> ValueKind {
        match &self.repr {
            Repr::Integer(_) => ValueKind::Integer,
            Repr::Unsigned(_) => ValueKind::Unsigned,
            Repr::OctetString(_) => ValueKind::OctetString,
            Repr::String { .. } => ValueKind::String,
            Repr::Oid(_) => ValueKind::Oid,
            Repr::IpAddress(_) => ValueKind::IpAddress,
            Repr::Enum { .. } => ValueKind::Enum,
            Repr::Bool(_) => ValueKind::Bool,
            Repr::Bits(_) => ValueKind::Bits,
            Repr::Timeticks(_) => ValueKind::Timeticks,
        }
    }

    /// Decode a wire value against a schema node.
    ///
    /// `loose` relaxes enumeration decoding only: an unmapped integer is
    /// surfaced with no label instead of failing. Exception varbinds are
    /// intercepted before this point by the session layer and are a decode
    /// error here.
    pub fn decode(node: NodeRef, wire: WireValue, loose: bool) -> Result<Self> {
        let kind = node.value_kind().ok_or_else(|| {
            Error::schema_in(
                node.module.clone(),
                crate::error::SchemaErrorKind::WrongKind { expected: "leaf" },
            )
        })?;

        if wire.is_exception() {
            return Err(Error::decode(DecodeErrorKind::WireTypeMismatch {
                expected: kind.as_str(),
            }));
        }

        let mismatch = || {
            Error::decode(DecodeErrorKind::WireTypeMismatch {
                expected: kind.as_str(),
            })
        };

        let repr = match kind {
            ValueKind::Integer => match wire {
                WireValue::Integer(v) => Repr::Integer(v.into()),
                _ => return Err(mismatch()),
            },
            ValueKind::Unsigned => match wire {
                WireValue::Counter32(v) | WireValue::Gauge32(v) => Repr::Unsigned(v.into()),
                WireValue::Counter64(v) => Repr::Unsigned(v),
                _ => return Err(mismatch()),
            },
            ValueKind::Timeticks => match wire {
                WireValue::TimeTicks(v) => Repr::Timeticks(Timeticks(v)),
                // TimeStamp conventions ride on Unsigned32 base types
                WireValue::Gauge32(v) => Repr::Timeticks(Timeticks(v)),
                _ => return Err(mismatch()),
            },
            ValueKind::OctetString => match wire {
                WireValue::OctetString(bytes) | WireValue::Opaque(bytes) => {
                    Repr::OctetString(bytes)
                }
                _ => return Err(mismatch()),
            },
            ValueKind::String => match wire {
                WireValue::OctetString(bytes) => {
                    // Lenient on the read path: a malformed hint degrades to
                    // hex, the strict check belongs to the SET path.
                    let pretty = match node.hint.as_deref() {
                        Some(h) => hint::apply(h, &bytes),
                        None => String::from_utf8_lossy(&bytes).into_owned(),
                    };
                    Repr::String { bytes, pretty }
                }
                _ => return Err(mismatch()),
            },
            ValueKind::Oid => match wire {
                WireValue::ObjectIdentifier(oid) => Repr::Oid(oid),
                _ => return Err(mismatch()),
            },
            ValueKind::IpAddress => match wire {
                WireValue::IpAddress(octets) => Repr::IpAddress(octets),
                WireValue::OctetString(bytes) => {
                    let octets: [u8; 4] = bytes.as_ref().try_into().map_err(|_| {
                        Error::decode(DecodeErrorKind::InvalidIpAddressLength {
                            length: bytes.len(),
                        })
                    })?;
                    Repr::IpAddress(octets)
                }
                _ => return Err(mismatch()),
            },
            ValueKind::Enum => match wire {
                WireValue::Integer(v) => {
                    let value = i64::from(v);
                    let label = node
                        .named
                        .as_ref()
                        .and_then(|named| named.label(value))
                        .map(Box::from);
                    if label.is_none() && !loose {
                        return Err(Error::validation(
                            node.qualified_name(),
                            ValidationErrorKind::UnknownEnumValue { value },
                        ));
                    }
                    Repr::Enum { value, label }
                }
                _ => return Err(mismatch()),
            },
            ValueKind::Bool => match wire {
                // TruthValue: 1 true, 2 false
                WireValue::Integer(1) => Repr::Bool(true),
                WireValue::Integer(2) => Repr::Bool(false),
                WireValue::Integer(v) => {
                    return Err(Error::validation(
                        node.qualified_name(),
                        ValidationErrorKind::UnknownEnumValue { value: v.into() },
                    ));
                }
                _ => return Err(mismatch()),
            },
            ValueKind::Bits => match wire {
                WireValue::OctetString(bytes) => Repr::Bits(bytes),
                _ => return Err(mismatch()),
            },
        };

        Ok(Self { node, repr })
    }

    /// Encode for the SET path. Revalidates before producing the wire form.
    pub fn encode(&self) -> Result<WireValue> {
        self.validate()?;
        Ok(match &self.repr {
            Repr::Integer(v) => WireValue::Integer(*v as i32),
            Repr::Unsigned(v) => match self.node.smi_type {
                Some(SmiType::Counter64) => WireValue::Counter64(*v),
                Some(SmiType::Counter32) => WireValue::Counter32(*v as u32),
                _ => WireValue::Gauge32(*v as u32),
            },
            Repr::OctetString(bytes) => WireValue::OctetString(bytes.clone()),
            Repr::String { bytes, .. } => WireValue::OctetString(bytes.clone()),
            Repr::Oid(oid) => WireValue::ObjectIdentifier(oid.clone()),
            Repr::IpAddress(octets) => match self.node.smi_type {
                Some(SmiType::IpAddress) => WireValue::IpAddress(*octets),
                _ => WireValue::OctetString(Bytes::copy_from_slice(octets)),
            },
            Repr::Enum { value, .. } => WireValue::Integer(*value as i32),
            Repr::Bool(b) => WireValue::Integer(if *b { 1 } else { 2 }),
            Repr::Bits(bytes) => WireValue::OctetString(bytes.clone()),
            Repr::Timeticks(t) => WireValue::TimeTicks(t.0),
        })
    }

    /// Build a value from a native Rust value, validating against the node.
    pub fn from_native(node: NodeRef, native: impl Into<NativeValue>) -> Result<Self> {
        let native = native.into();
        let kind = node.value_kind().ok_or_else(|| {
            Error::schema_in(
                node.module.clone(),
                crate::error::SchemaErrorKind::WrongKind { expected: "leaf" },
            )
        })?;

        let mismatch = |expected: &'static str| {
            Error::validation(
                node.qualified_name(),
                ValidationErrorKind::TypeMismatch { expected },
            )
        };

        let repr = match kind {
            ValueKind::Integer => match native {
                NativeValue::Int(v) => Repr::Integer(v),
                NativeValue::UInt(v) => Repr::Integer(
                    i64::try_from(v).map_err(|_| mismatch("signed integer"))?,
                ),
                _ => return Err(mismatch("integer")),
            },
            ValueKind::Unsigned => match native {
                NativeValue::UInt(v) => Repr::Unsigned(v),
                NativeValue::Int(v) if v >= 0 => Repr::Unsigned(v as u64),
                _ => return Err(mismatch("unsigned integer")),
            },
            ValueKind::Timeticks => match native {
                NativeValue::UInt(v) => Repr::Timeticks(Timeticks(
                    u32::try_from(v).map_err(|_| mismatch("32-bit tick count"))?,
                )),
                NativeValue::Int(v) if v >= 0 => Repr::Timeticks(Timeticks(
                    u32::try_from(v).map_err(|_| mismatch("32-bit tick count"))?,
                )),
                _ => return Err(mismatch("tick count")),
            },
            ValueKind::OctetString => match native {
                NativeValue::Bytes(v) => Repr::OctetString(Bytes::from(v)),
                NativeValue::Text(v) => Repr::OctetString(Bytes::from(v.into_bytes())),
                _ => return Err(mismatch("octet string")),
            },
            ValueKind::String => {
                let bytes = match native {
                    NativeValue::Text(text) => {
                        let spec = node
                            .hint
                            .as_deref()
                            .ok_or_else(|| mismatch("display string"))?;
                        let parsed = hint::OctetHint::parse(spec)
                            .map_err(|kind| Error::validation(node.qualified_name(), kind))?;
                        Bytes::from(
                            parsed
                                .parse_pretty(&text)
                                .map_err(|kind| Error::validation(node.qualified_name(), kind))?,
                        )
                    }
                    NativeValue::Bytes(v) => Bytes::from(v),
                    _ => return Err(mismatch("display string")),
                };
                let pretty = match node.hint.as_deref() {
                    Some(h) => hint::apply(h, &bytes),
                    None => String::from_utf8_lossy(&bytes).into_owned(),
                };
                Repr::String { bytes, pretty }
            }
            ValueKind::Oid => match native {
                NativeValue::Oid(oid) => Repr::Oid(oid),
                NativeValue::Text(text) => Repr::Oid(Oid::parse(&text)?),
                _ => return Err(mismatch("OID")),
            },
            ValueKind::IpAddress => match native {
                NativeValue::Ip(octets) => Repr::IpAddress(octets),
                NativeValue::Text(text) => {
                    let mut octets = [0u8; 4];
                    let mut count = 0;
                    for part in text.split('.') {
                        if count == 4 {
                            return Err(mismatch("dotted IPv4 address"));
                        }
                        octets[count] = part
                            .parse()
                            .map_err(|_| mismatch("dotted IPv4 address"))?;
                        count += 1;
                    }
                    if count != 4 {
                        return Err(mismatch("dotted IPv4 address"));
                    }
                    Repr::IpAddress(octets)
                }
                _ => return Err(mismatch("IPv4 address")),
            },
            ValueKind::Enum => {
                let named = node
                    .named
                    .as_ref()
                    .ok_or_else(|| mismatch("enumeration"))?;
                match native {
                    NativeValue::Int(value) => {
                        let label = named.label(value).map(Box::from).ok_or_else(|| {
                            Error::validation(
                                node.qualified_name(),
                                ValidationErrorKind::UnknownEnumValue { value },
                            )
                        })?;
                        Repr::Enum {
                            value,
                            label: Some(label),
                        }
                    }
                    NativeValue::Text(text) => {
                        let value = named.value(&text).ok_or_else(|| {
                            Error::validation(
                                node.qualified_name(),
                                ValidationErrorKind::UnknownEnumLabel {
                                    label: text.clone().into(),
                                },
                            )
                        })?;
                        Repr::Enum {
                            value,
                            label: Some(text.into()),
                        }
                    }
                    _ => return Err(mismatch("enumeration label or value")),
                }
            }
            ValueKind::Bool => match native {
                NativeValue::Bool(b) => Repr::Bool(b),
                _ => return Err(mismatch("boolean")),
            },
            ValueKind::Bits => match native {
                NativeValue::Names(names) => {
                    let named = node.named.as_ref().ok_or_else(|| mismatch("named bits"))?;
                    let mut positions = Vec::with_capacity(names.len());
                    for name in &names {
                        let bit = named.value(name).ok_or_else(|| {
                            Error::validation(
                                node.qualified_name(),
                                ValidationErrorKind::UnknownBitName {
                                    name: name.clone().into(),
                                },
                            )
                        })?;
                        positions.push(bit as usize);
                    }
                    Repr::Bits(Bytes::from(pack_bits(&positions)))
                }
                NativeValue::Bytes(v) => Repr::Bits(Bytes::from(v)),
                _ => return Err(mismatch("bit names")),
            },
        };

        let value = Self { node, repr };
        value.validate()?;
        Ok(value)
    }

    /// Extract the plain Rust form of this value.
    pub fn to_native(&self) -> NativeValue {
        match &self.repr {
            Repr::Integer(v) => NativeValue::Int(*v),
            Repr::Unsigned(v) => NativeValue::UInt(*v),
            Repr::OctetString(bytes) => NativeValue::Bytes(bytes.to_vec()),
            Repr::String { pretty, .. } => NativeValue::Text(pretty.clone()),
            Repr::Oid(oid) => NativeValue::Oid(oid.clone()),
            Repr::IpAddress(octets) => NativeValue::Ip(*octets),
            Repr::Enum { value, label } => match label {
                Some(label) => NativeValue::Text(label.to_string()),
                None => NativeValue::Int(*value),
            },
            Repr::Bool(b) => NativeValue::Bool(*b),
            Repr::Bits(bytes) => {
                let named = self.node.named.as_ref();
                NativeValue::Names(
                    unpack_bits(bytes)
                        .into_iter()
                        .map(|bit| {
                            named
                                .and_then(|n| n.label(bit as i64))
                                .map(str::to_string)
                                .unwrap_or_else(|| bit.to_string())
                        })
                        .collect(),
                )
            }
            Repr::Timeticks(t) => NativeValue::UInt(t.0.into()),
        }
    }

    /// Check the payload against the node's refinements.
    fn validate(&self) -> Result<()> {
        let restriction = &self.node.restriction;
        let fail = |kind| Err(Error::validation(self.node.qualified_name(), kind));
        match &self.repr {
            Repr::Integer(v) => {
                if i32::try_from(*v).is_err() || !restriction.permits_value(i128::from(*v)) {
                    return fail(ValidationErrorKind::OutOfRange { value: (*v).into() });
                }
            }
            Repr::Unsigned(v) => {
                let fits = match self.node.smi_type {
                    Some(SmiType::Counter64) => true,
                    _ => u32::try_from(*v).is_ok(),
                };
                if !fits || !restriction.permits_value(i128::from(*v)) {
                    return fail(ValidationErrorKind::OutOfRange { value: (*v).into() });
                }
            }
            Repr::OctetString(bytes) | Repr::String { bytes, .. } | Repr::Bits(bytes) => {
                if !restriction.permits_length(bytes.len()) {
                    return fail(ValidationErrorKind::BadLength {
                        length: bytes.len(),
                    });
                }
            }
            Repr::Enum { value, label } => {
                if label.is_none() {
                    return fail(ValidationErrorKind::UnknownEnumValue { value: *value });
                }
            }
            Repr::Oid(_) | Repr::IpAddress(_) | Repr::Bool(_) | Repr::Timeticks(_) => {}
        }
        Ok(())
    }

    /// Signed integer payload of Integer/Enum/Bool values.
    pub fn as_i64(&self) -> Option<i64> {
        match &self.repr {
            Repr::Integer(v) => Some(*v),
            Repr::Enum { value, .. } => Some(*value),
            Repr::Bool(b) => Some(if *b { 1 } else { 2 }),
            _ => None,
        }
    }

    /// Unsigned payload of Unsigned/Timeticks values.
    pub fn as_u64(&self) -> Option<u64> {
        match &self.repr {
            Repr::Unsigned(v) => Some(*v),
            Repr::Timeticks(t) => Some(t.0.into()),
            _ => None,
        }
    }

    /// Raw octets of OctetString/String/Bits values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.repr {
            Repr::OctetString(bytes) | Repr::String { bytes, .. } | Repr::Bits(bytes) => {
                Some(bytes)
            }
            _ => None,
        }
    }

    /// Pretty form of a String value, or an Enum label.
    pub fn as_str(&self) -> Option<&str> {
        match &self.repr {
            Repr::String { pretty, .. } => Some(pretty),
            Repr::Enum {
                label: Some(label), ..
            } => Some(label),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.repr {
            Repr::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&Oid> {
        match &self.repr {
            Repr::Oid(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn as_ip(&self) -> Option<[u8; 4]> {
        match &self.repr {
            Repr::IpAddress(octets) => Some(*octets),
            _ => None,
        }
    }

    pub fn as_ticks(&self) -> Option<Timeticks> {
        match &self.repr {
            Repr::Timeticks(t) => Some(*t),
            _ => None,
        }
    }

    /// Set bit positions of a Bits value, in ascending order.
    pub fn bits_set(&self) -> Option<Vec<u16>> {
        match &self.repr {
            Repr::Bits(bytes) => Some(unpack_bits(bytes)),
            _ => None,
        }
    }

    /// Enum label, when one is mapped.
    pub fn enum_label(&self) -> Option<&str> {
        match &self.repr {
            Repr::Enum { label, .. } => label.as_deref(),
            _ => None,
        }
    }

    /// Convert this value into the OID arcs of a table index element.
    pub fn to_index_arcs(&self, style: IndexStyle) -> Result<Vec<u32>> {
        let fail = |kind| Err(Error::decode_at(self.node.oid.clone(), kind));
        match &self.repr {
            Repr::Integer(v) | Repr::Enum { value: v, .. } => match u32::try_from(*v) {
                Ok(arc) => Ok(vec![arc]),
                Err(_) => fail(DecodeErrorKind::UnindexableType),
            },
            Repr::Unsigned(v) => match u32::try_from(*v) {
                Ok(arc) => Ok(vec![arc]),
                Err(_) => fail(DecodeErrorKind::UnindexableType),
            },
            Repr::Timeticks(t) => Ok(vec![t.0]),
            Repr::Bool(b) => Ok(vec![if *b { 1 } else { 2 }]),
            Repr::IpAddress(octets) => Ok(octets.iter().map(|&b| u32::from(b)).collect()),
            Repr::OctetString(bytes) | Repr::String { bytes, .. } => {
                let body = bytes.iter().map(|&b| u32::from(b));
                match style {
                    IndexStyle::Fixed(len) => {
                        if bytes.len() != len {
                            return Err(Error::validation(
                                self.node.qualified_name(),
                                ValidationErrorKind::BadLength {
                                    length: bytes.len(),
                                },
                            ));
                        }
                        Ok(body.collect())
                    }
                    IndexStyle::LengthPrefixed => {
                        let mut arcs = Vec::with_capacity(bytes.len() + 1);
                        arcs.push(bytes.len() as u32);
                        arcs.extend(body);
                        Ok(arcs)
                    }
                    IndexStyle::Implied => Ok(body.collect()),
                }
            }
            Repr::Oid(oid) => match style {
                // Fixed-length OID indexes are rejected at schema level
                IndexStyle::Fixed(_) => fail(DecodeErrorKind::UnindexableType),
                IndexStyle::LengthPrefixed => {
                    let mut arcs = Vec::with_capacity(oid.len() + 1);
                    arcs.push(oid.len() as u32);
                    arcs.extend_from_slice(oid.arcs());
                    Ok(arcs)
                }
                IndexStyle::Implied => Ok(oid.arcs().to_vec()),
            },
            Repr::Bits(_) => fail(DecodeErrorKind::UnindexableType),
        }
    }

    /// Decode one index element from OID arcs, returning the value and the
    /// number of arcs consumed.
    pub fn from_index_arcs(node: NodeRef, arcs: &[u32], style: IndexStyle) -> Result<(Self, usize)> {
        let kind = node.value_kind().ok_or_else(|| {
            Error::schema_in(
                node.module.clone(),
                crate::error::SchemaErrorKind::WrongKind { expected: "column" },
            )
        })?;

        let short = || Error::decode_at(node.oid.clone(), DecodeErrorKind::IndexTooShort);

        let take_bytes = |count: usize| -> Result<(Vec<u8>, usize)> {
            if arcs.len() < count {
                return Err(short());
            }
            let mut bytes = Vec::with_capacity(count);
            for &arc in &arcs[..count] {
                bytes.push(u8::try_from(arc).map_err(|_| {
                    Error::decode_at(
                        node.oid.clone(),
                        DecodeErrorKind::IndexArcOverflow { arc },
                    )
                })?);
            }
            Ok((bytes, count))
        };

        let take_string = |style: IndexStyle| -> Result<(Vec<u8>, usize)> {
            match style {
                IndexStyle::Fixed(len) => take_bytes(len),
                IndexStyle::Implied => take_bytes(arcs.len()),
                IndexStyle::LengthPrefixed => {
                    let declared = *arcs.first().ok_or_else(short)? as usize;
                    if arcs.len() - 1 < declared {
                        return Err(Error::decode_at(
                            node.oid.clone(),
                            DecodeErrorKind::IndexLengthPrefix {
                                declared,
                                available: arcs.len() - 1,
                            },
                        ));
                    }
                    let mut bytes = Vec::with_capacity(declared);
                    for &arc in &arcs[1..=declared] {
                        bytes.push(u8::try_from(arc).map_err(|_| {
                            Error::decode_at(
                                node.oid.clone(),
                                DecodeErrorKind::IndexArcOverflow { arc },
                            )
                        })?);
                    }
                    Ok((bytes, declared + 1))
                }
            }
        };

        let (repr, consumed) = match kind {
            ValueKind::Integer | ValueKind::Enum | ValueKind::Bool | ValueKind::Unsigned
            | ValueKind::Timeticks => {
                let arc = *arcs.first().ok_or_else(short)?;
                let repr = match kind {
                    ValueKind::Integer => Repr::Integer(arc.into()),
                    ValueKind::Unsigned => Repr::Unsigned(arc.into()),
                    ValueKind::Timeticks => Repr::Timeticks(Timeticks(arc)),
                    ValueKind::Bool => match arc {
                        1 => Repr::Bool(true),
                        2 => Repr::Bool(false),
                        _ => {
                            return Err(Error::validation(
                                node.qualified_name(),
                                ValidationErrorKind::UnknownEnumValue { value: arc.into() },
                            ));
                        }
                    },
                    ValueKind::Enum => {
                        let value = i64::from(arc);
                        let label = node
                            .named
                            .as_ref()
                            .and_then(|named| named.label(value))
                            .map(Box::from);
                        Repr::Enum { value, label }
                    }
                    _ => unreachable!(),
                };
                (repr, 1)
            }
            ValueKind::IpAddress => {
                let (bytes, consumed) = take_bytes(4)?;
                let octets: [u8; 4] = bytes.as_slice().try_into().map_err(|_| short())?;
                (Repr::IpAddress(octets), consumed)
            }
            ValueKind::OctetString => {
                let (bytes, consumed) = take_string(style)?;
                (Repr::OctetString(Bytes::from(bytes)), consumed)
            }
            ValueKind::String => {
                let (bytes, consumed) = take_string(style)?;
                let bytes = Bytes::from(bytes);
                let pretty = match node.hint.as_deref() {
                    Some(h) => hint::apply(h, &bytes),
                    None => String::from_utf8_lossy(&bytes).into_owned(),
                };
                (Repr::String { bytes, pretty }, consumed)
            }
            ValueKind::Oid => match style {
                IndexStyle::Fixed(_) => {
                    return Err(Error::schema_in(
                        node.module.clone(),
                        crate::error::SchemaErrorKind::FixedLengthOidIndex,
                    ));
                }
                IndexStyle::Implied => {
                    (Repr::Oid(Oid::from_slice(arcs)), arcs.len())
                }
                IndexStyle::LengthPrefixed => {
                    let declared = *arcs.first().ok_or_else(short)? as usize;
                    if arcs.len() - 1 < declared {
                        return Err(Error::decode_at(
                            node.oid.clone(),
                            DecodeErrorKind::IndexLengthPrefix {
                                declared,
                                available: arcs.len() - 1,
                            },
                        ));
                    }
                    (Repr::Oid(Oid::from_slice(&arcs[1..=declared])), declared + 1)
                }
            },
            ValueKind::Bits => {
                return Err(Error::decode_at(
                    node.oid.clone(),
                    DecodeErrorKind::UnindexableType,
                ));
            }
        };

        Ok((Self { node, repr }, consumed))
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Integer(v) => {
                // INTEGER hints (d-N, x, o, b) apply on display
                if let Some(text) = self
                    .node
                    .hint
                    .as_deref()
                    .and_then(|h| hint::apply_integer(h, *v))
                {
                    write!(f, "{}", text)
                } else {
                    write!(f, "{}", v)
                }
            }
            Repr::Unsigned(v) => write!(f, "{}", v),
            Repr::OctetString(bytes) => {
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
            Repr::String { pretty, .. } => write!(f, "{}", pretty),
            Repr::Oid(oid) => write!(f, "{}", oid),
            Repr::IpAddress(o) => write!(f, "{}.{}.{}.{}", o[0], o[1], o[2], o[3]),
            Repr::Enum { value, label } => match label {
                Some(label) => write!(f, "{}({})", label, value),
                None => write!(f, "{}", value),
            },
            Repr::Bool(b) => write!(f, "{}", b),
            Repr::Bits(bytes) => {
                let named = self.node.named.as_ref();
                let mut first = true;
                for bit in unpack_bits(bytes) {
                    if !first {
                        write!(f, " ")?;
                    }
                    match named.and_then(|n| n.label(bit as i64)) {
                        Some(label) => write!(f, "{}", label)?,
                        None => write!(f, "{}", bit)?,
                    }
                    first = false;
                }
                Ok(())
            }
            Repr::Timeticks(t) => write!(f, "{}", t),
        }
    }
}

/// Pack bit positions into octets, msb-first within each octet.
fn pack_bits(positions: &[usize]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &bit in positions {
        let byte_idx = bit / 8;
        if byte_idx >= bytes.len() {
            bytes.resize(byte_idx + 1, 0);
        }
        bytes[byte_idx] |= 0x80 >> (bit % 8);
    }
    bytes
}

/// Unpack octets into ascending bit positions, msb-first within each octet.
fn unpack_bits(bytes: &[u8]) -> Vec<u16> {
    let mut positions = Vec::new();
    for (byte_idx, &byte) in bytes.iter().enumerate() {
        for bit in 0..8 {
            if byte & (0x80 >> bit) != 0 {
                positions.push((byte_idx * 8 + bit) as u16);
            }
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::schema::{NamedValues, Restriction, SchemaNode};
    use std::sync::Arc;

    fn node(smi: SmiType) -> NodeRef {
        Arc::new(SchemaNode::scalar(
            "testValue",
            oid!(1, 3, 6, 1, 4, 1, 999, 1),
            smi,
        ))
    }

    fn enum_node() -> NodeRef {
        Arc::new(
            SchemaNode::scalar(
                "ifAdminStatus",
                oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 7),
                SmiType::Integer32,
            )
            .with_named(NamedValues::new([(1i64, "up"), (2, "down"), (3, "testing")])),
        )
    }

    #[test]
    fn decode_encode_integer() {
        let n = node(SmiType::Integer32);
        let v = TypedValue::decode(n, WireValue::Integer(-42), false).unwrap();
        assert_eq!(v.as_i64(), Some(-42));
        assert_eq!(v.encode().unwrap(), WireValue::Integer(-42));
    }

    #[test]
    fn decode_wire_mismatch() {
        let n = node(SmiType::Integer32);
        let err = TypedValue::decode(n, WireValue::from("nope"), false).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::WireTypeMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn decode_counter64() {
        let n = node(SmiType::Counter64);
        let v = TypedValue::decode(n, WireValue::Counter64(u64::MAX), false).unwrap();
        assert_eq!(v.as_u64(), Some(u64::MAX));
        assert_eq!(v.encode().unwrap(), WireValue::Counter64(u64::MAX));
    }

    #[test]
    fn enum_strict_rejects_unmapped() {
        let err = TypedValue::decode(enum_node(), WireValue::Integer(7), false).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                kind: ValidationErrorKind::UnknownEnumValue { value: 7 },
                ..
            }
        ));
    }

    #[test]
    fn enum_loose_surfaces_raw_integer() {
        let v = TypedValue::decode(enum_node(), WireValue::Integer(7), true).unwrap();
        assert_eq!(v.as_i64(), Some(7));
        assert_eq!(v.enum_label(), None);
        assert_eq!(v.to_native(), NativeValue::Int(7));
        // Loose decodes are read-only: re-encoding revalidates and fails
        assert!(v.encode().is_err());
    }

    #[test]
    fn enum_from_native_by_label_and_value() {
        let v = TypedValue::from_native(enum_node(), "testing").unwrap();
        assert_eq!(v.as_i64(), Some(3));
        assert_eq!(v.encode().unwrap(), WireValue::Integer(3));

        let v = TypedValue::from_native(enum_node(), 2i64).unwrap();
        assert_eq!(v.enum_label(), Some("down"));

        assert!(TypedValue::from_native(enum_node(), "sideways").is_err());
        assert!(TypedValue::from_native(enum_node(), 9i64).is_err());
    }

    #[test]
    fn truthvalue_bool() {
        let n: NodeRef = Arc::new(
            SchemaNode::scalar("testBool", oid!(1, 3, 6, 1, 4, 1, 999, 2), SmiType::Integer32)
                .with_convention("TruthValue")
                .with_named(NamedValues::new([(1i64, "true"), (2, "false")])),
        );
        let v = TypedValue::decode(n.clone(), WireValue::Integer(2), false).unwrap();
        assert_eq!(v.as_bool(), Some(false));
        assert_eq!(
            TypedValue::from_native(n, true).unwrap().encode().unwrap(),
            WireValue::Integer(1)
        );
    }

    #[test]
    fn range_validation_union_semantics() {
        let n: NodeRef = Arc::new(
            SchemaNode::scalar("testRange", oid!(1, 3, 6, 1, 4, 1, 999, 3), SmiType::Integer32)
                .with_restriction(Restriction::Ranges(vec![(1, 10), (100, 200)])),
        );
        assert!(TypedValue::from_native(n.clone(), 5i64).is_ok());
        assert!(TypedValue::from_native(n.clone(), 150i64).is_ok());
        let err = TypedValue::from_native(n, 50i64).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                kind: ValidationErrorKind::OutOfRange { value: 50 },
                ..
            }
        ));
    }

    #[test]
    fn length_validation() {
        let n: NodeRef = Arc::new(
            SchemaNode::scalar("testStr", oid!(1, 3, 6, 1, 4, 1, 999, 4), SmiType::OctetString)
                .with_restriction(Restriction::Ranges(vec![(0, 4)])),
        );
        assert!(TypedValue::from_native(n.clone(), b"abcd".to_vec()).is_ok());
        assert!(TypedValue::from_native(n, b"abcde".to_vec()).is_err());
    }

    #[test]
    fn string_hint_strict_on_write() {
        let n: NodeRef = Arc::new(
            SchemaNode::scalar("testMac", oid!(1, 3, 6, 1, 4, 1, 999, 5), SmiType::OctetString)
                .with_hint("1x:"),
        );
        let v = TypedValue::from_native(n.clone(), "00:1a:2b:3c:4d:5e").unwrap();
        assert_eq!(
            v.as_bytes(),
            Some(&[0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e][..])
        );
        assert_eq!(v.to_string(), "00:1a:2b:3c:4d:5e");

        let err = TypedValue::from_native(n, "not a mac").unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                kind: ValidationErrorKind::HintMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn ip_address_from_octet_string() {
        let n: NodeRef = Arc::new(
            SchemaNode::scalar("testIp", oid!(1, 3, 6, 1, 4, 1, 999, 6), SmiType::OctetString)
                .with_convention("IpAddress"),
        );
        let v = TypedValue::decode(
            n.clone(),
            WireValue::OctetString(Bytes::from_static(&[10, 0, 0, 1])),
            false,
        )
        .unwrap();
        assert_eq!(v.as_ip(), Some([10, 0, 0, 1]));
        // Convention keeps the base encoding
        assert_eq!(
            v.encode().unwrap(),
            WireValue::OctetString(Bytes::from_static(&[10, 0, 0, 1]))
        );

        let err = TypedValue::decode(
            n,
            WireValue::OctetString(Bytes::from_static(&[10, 0, 0])),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::InvalidIpAddressLength { length: 3 },
                ..
            }
        ));
    }

    #[test]
    fn timeticks_decomposition() {
        let t = Timeticks(8_675_309);
        assert_eq!(t.days(), 1);
        assert_eq!(t.hours(), 0);
        assert_eq!(t.minutes(), 5);
        assert_eq!(t.seconds(), 53);
        assert_eq!(t.hundredths(), 9);
        assert_eq!(t.to_string(), "1 days, 0:05:53.09");
        assert!(Timeticks(100) < Timeticks(200));
    }

    #[test]
    fn bits_pack_and_unpack() {
        let n: NodeRef = Arc::new(
            SchemaNode::scalar("testBits", oid!(1, 3, 6, 1, 4, 1, 999, 7), SmiType::Bits)
                .with_named(NamedValues::new([(0i64, "first"), (7, "eighth"), (9, "tenth")])),
        );
        let v = TypedValue::from_native(
            n.clone(),
            NativeValue::Names(vec!["first".into(), "tenth".into()]),
        )
        .unwrap();
        // Bit 0 is the msb of octet 0, bit 9 the second bit of octet 1
        assert_eq!(v.as_bytes(), Some(&[0x80, 0x40][..]));
        assert_eq!(v.bits_set(), Some(vec![0, 9]));

        let err = TypedValue::from_native(n, NativeValue::Names(vec!["ghost".into()])).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                kind: ValidationErrorKind::UnknownBitName { .. },
                ..
            }
        ));
    }

    #[test]
    fn index_arcs_numeric_and_ip() {
        let v = TypedValue::from_native(node(SmiType::Integer32), 42i64).unwrap();
        assert_eq!(v.to_index_arcs(IndexStyle::Fixed(1)).unwrap(), vec![42]);

        let n: NodeRef = Arc::new(SchemaNode::scalar(
            "testIp",
            oid!(1, 3, 6, 1, 4, 1, 999, 8),
            SmiType::IpAddress,
        ));
        let v = TypedValue::from_native(n, [10u8, 0, 0, 1]).unwrap();
        assert_eq!(
            v.to_index_arcs(IndexStyle::Fixed(4)).unwrap(),
            vec![10, 0, 0, 1]
        );
    }

    #[test]
    fn index_arcs_variable_string_roundtrip() {
        let n = node(SmiType::OctetString);
        let v = TypedValue::from_native(n.clone(), b"eth0".to_vec()).unwrap();
        let arcs = v.to_index_arcs(IndexStyle::LengthPrefixed).unwrap();
        assert_eq!(arcs, vec![4, 0x65, 0x74, 0x68, 0x30]);

        let (decoded, consumed) =
            TypedValue::from_index_arcs(n, &arcs, IndexStyle::LengthPrefixed).unwrap();
        assert_eq!(consumed, 5);
        assert_eq!(decoded.as_bytes(), Some(&b"eth0"[..]));
    }

    #[test]
    fn index_arcs_implied_string_eats_remainder() {
        let n = node(SmiType::OctetString);
        let arcs = [0x65, 0x74, 0x68, 0x30];
        let (decoded, consumed) =
            TypedValue::from_index_arcs(n, &arcs, IndexStyle::Implied).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(decoded.as_bytes(), Some(&b"eth0"[..]));
    }

    #[test]
    fn index_arcs_length_prefix_overruns() {
        let n = node(SmiType::OctetString);
        let err =
            TypedValue::from_index_arcs(n, &[5, 1, 2], IndexStyle::LengthPrefixed).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::IndexLengthPrefix {
                    declared: 5,
                    available: 2
                },
                ..
            }
        ));
    }

    #[test]
    fn index_arc_overflow_rejected() {
        let n = node(SmiType::OctetString);
        let err =
            TypedValue::from_index_arcs(n, &[1, 300], IndexStyle::LengthPrefixed).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::IndexArcOverflow { arc: 300 },
                ..
            }
        ));
    }

    #[test]
    fn fixed_length_oid_index_rejected() {
        let n = node(SmiType::ObjectIdentifier);
        let err = TypedValue::from_index_arcs(n, &[1, 2, 3], IndexStyle::Fixed(3)).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema {
                kind: crate::error::SchemaErrorKind::FixedLengthOidIndex,
                ..
            }
        ));
    }

    #[test]
    fn integer_display_hint() {
        let n: NodeRef = Arc::new(
            SchemaNode::scalar(
                "testCentiVolts",
                oid!(1, 3, 6, 1, 4, 1, 999, 9),
                SmiType::Integer32,
            )
            .with_hint("d-2"),
        );
        let v = TypedValue::decode(n, WireValue::Integer(1234), false).unwrap();
        assert_eq!(v.to_string(), "12.34");
    }
}
