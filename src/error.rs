//! Error types for typed-snmp.
//!
//! All errors are `#[non_exhaustive]` to allow adding new variants without breaking changes.

use std::time::Duration;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Schema lookup and conformance error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// Module is not loaded.
    NoSuchModule,
    /// Module is loaded but does not define this node.
    NoSuchNode,
    /// Name does not resolve to any node in any loaded module.
    NoSuchAttribute,
    /// Module failed the conformance check (major SMI errors, unresolved imports).
    Conformance { detail: Box<str> },
    /// Table hierarchy is malformed (child not a row, index not a column, ...).
    MalformedTable { detail: Box<str> },
    /// AUGMENTS clause points at a row that cannot be resolved.
    UnresolvableAugments,
    /// Node kind does not support the requested operation.
    WrongKind { expected: &'static str },
    /// Fixed-length OBJECT IDENTIFIER index element (not representable).
    FixedLengthOidIndex,
}

impl std::fmt::Display for SchemaErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSuchModule => write!(f, "module not loaded"),
            Self::NoSuchNode => write!(f, "no such node in module"),
            Self::NoSuchAttribute => write!(f, "name not found in any loaded module"),
            Self::Conformance { detail } => {
                write!(f, "module contains major SMI errors: {}", detail)
            }
            Self::MalformedTable { detail } => write!(f, "malformed table: {}", detail),
            Self::UnresolvableAugments => write!(f, "cannot resolve AUGMENTS target row"),
            Self::WrongKind { expected } => write!(f, "node is not a {}", expected),
            Self::FixedLengthOidIndex => {
                write!(f, "fixed-length OBJECT IDENTIFIER index is not supported")
            }
        }
    }
}

/// Value validation error kinds (SET path and native conversions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Integer value outside every declared range.
    OutOfRange { value: i128 },
    /// Octet string length outside every declared length restriction.
    BadLength { length: usize },
    /// Integer has no label in the enumeration.
    UnknownEnumValue { value: i64 },
    /// Label is not a member of the enumeration.
    UnknownEnumLabel { label: Box<str> },
    /// Bit name is not a member of the BITS construct.
    UnknownBitName { name: Box<str> },
    /// Native value shape does not fit the schema type.
    TypeMismatch { expected: &'static str },
    /// Pretty string does not match the DISPLAY-HINT format.
    HintMismatch { detail: Box<str> },
    /// DISPLAY-HINT specification itself is malformed.
    MalformedHint,
}

impl std::fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { value } => write!(f, "value {} out of declared range", value),
            Self::BadLength { length } => {
                write!(f, "length {} violates length restriction", length)
            }
            Self::UnknownEnumValue { value } => {
                write!(f, "integer {} has no label in enumeration", value)
            }
            Self::UnknownEnumLabel { label } => {
                write!(f, "{:?} is not a label of the enumeration", label)
            }
            Self::UnknownBitName { name } => write!(f, "{:?} is not a named bit", name),
            Self::TypeMismatch { expected } => write!(f, "expected {}", expected),
            Self::HintMismatch { detail } => {
                write!(f, "value does not match display hint: {}", detail)
            }
            Self::MalformedHint => write!(f, "malformed DISPLAY-HINT specification"),
        }
    }
}

/// Wire and index decode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Wire value tag disagrees with the schema type.
    WireTypeMismatch { expected: &'static str },
    /// IP address payload is not 4 octets.
    InvalidIpAddressLength { length: usize },
    /// Index suffix ended before all index columns were decoded.
    IndexTooShort,
    /// Arcs remain after the final index column.
    TrailingIndexArcs { remaining: usize },
    /// Index arc does not fit the target type (e.g. octet > 255).
    IndexArcOverflow { arc: u32 },
    /// Length prefix in a variable-length index exceeds the remaining arcs.
    IndexLengthPrefix { declared: usize, available: usize },
    /// Type cannot appear in a table index (e.g. Counter64, Bits).
    UnindexableType,
    /// Response varbind OID does not match the request.
    UnexpectedOid,
    /// Response carried no varbinds.
    EmptyResponse,
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WireTypeMismatch { expected } => {
                write!(f, "wire value does not match schema type {}", expected)
            }
            Self::InvalidIpAddressLength { length } => {
                write!(f, "IP address must be 4 bytes, got {}", length)
            }
            Self::IndexTooShort => write!(f, "index suffix too short"),
            Self::TrailingIndexArcs { remaining } => {
                write!(f, "{} arcs left over after index decode", remaining)
            }
            Self::IndexArcOverflow { arc } => write!(f, "index arc {} overflows target type", arc),
            Self::IndexLengthPrefix {
                declared,
                available,
            } => write!(
                f,
                "index length prefix {} exceeds {} remaining arcs",
                declared, available
            ),
            Self::UnindexableType => write!(f, "type cannot be used as a table index"),
            Self::UnexpectedOid => write!(f, "response OID does not match request"),
            Self::EmptyResponse => write!(f, "empty response"),
        }
    }
}

/// OID validation error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidErrorKind {
    /// Empty OID string.
    Empty,
    /// Invalid arc value.
    InvalidArc,
    /// OID has too many arcs (exceeds MAX_OID_LEN).
    TooManyArcs { count: usize, max: usize },
}

impl std::fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty OID"),
            Self::InvalidArc => write!(f, "invalid arc value"),
            Self::TooManyArcs { count, max } => {
                write!(f, "OID has {} arcs, exceeds maximum {}", count, max)
            }
        }
    }
}

/// SNMP error status codes (RFC 3416).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// Unknown/future error status code.
    Unknown(i32),
}

impl ErrorStatus {
    /// Create from raw status code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            other => Self::Unknown(other),
        }
    }

    /// Convert to raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::Unknown(code) => *code,
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => write!(f, "noError"),
            Self::TooBig => write!(f, "tooBig"),
            Self::NoSuchName => write!(f, "noSuchName"),
            Self::BadValue => write!(f, "badValue"),
            Self::ReadOnly => write!(f, "readOnly"),
            Self::GenErr => write!(f, "genErr"),
            Self::NoAccess => write!(f, "noAccess"),
            Self::WrongType => write!(f, "wrongType"),
            Self::WrongLength => write!(f, "wrongLength"),
            Self::WrongEncoding => write!(f, "wrongEncoding"),
            Self::WrongValue => write!(f, "wrongValue"),
            Self::NoCreation => write!(f, "noCreation"),
            Self::InconsistentValue => write!(f, "inconsistentValue"),
            Self::ResourceUnavailable => write!(f, "resourceUnavailable"),
            Self::CommitFailed => write!(f, "commitFailed"),
            Self::UndoFailed => write!(f, "undoFailed"),
            Self::AuthorizationError => write!(f, "authorizationError"),
            Self::NotWritable => write!(f, "notWritable"),
            Self::InconsistentName => write!(f, "inconsistentName"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// Exception varbind kinds (RFC 3416 §4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// Object does not exist under this view.
    NoSuchObject,
    /// Object exists but this instance does not.
    NoSuchInstance,
    /// Walk ran past the end of the agent's MIB view.
    EndOfMibView,
}

impl std::fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSuchObject => write!(f, "noSuchObject"),
            Self::NoSuchInstance => write!(f, "noSuchInstance"),
            Self::EndOfMibView => write!(f, "endOfMibView"),
        }
    }
}

/// Library error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Schema lookup or module load failure.
    #[error("schema error{}: {kind}", module.as_deref().map(|m| format!(" in {}", m)).unwrap_or_default())]
    Schema {
        module: Option<Box<str>>,
        kind: SchemaErrorKind,
    },

    /// Value rejected by schema validation.
    #[error("validation error for {node}: {kind}")]
    Validation {
        node: Box<str>,
        kind: ValidationErrorKind,
    },

    /// Wire or index decode failure.
    #[error("decode error{}: {kind}", oid.as_ref().map(|o| format!(" at {}", o)).unwrap_or_default())]
    Decode {
        oid: Option<crate::oid::Oid>,
        kind: DecodeErrorKind,
    },

    /// Invalid OID format.
    #[error("invalid OID: {kind}")]
    InvalidOid {
        kind: OidErrorKind,
        input: Option<Box<str>>, // Only allocated when parsing string input
    },

    /// SNMP protocol error returned by agent.
    #[error("SNMP error: {status} at index {index}")]
    Agent {
        status: ErrorStatus,
        index: u32,
        oid: Option<crate::oid::Oid>,
    },

    /// Exception varbind in a response (strict mode).
    #[error("{kind} for {oid}")]
    Exception {
        oid: crate::oid::Oid,
        kind: ExceptionKind,
    },

    /// I/O error during communication.
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },

    /// Request timed out (after retries if configured).
    #[error("timeout after {elapsed:?} (retries={retries})")]
    Timeout { elapsed: Duration, retries: u32 },

    /// Operation not available for the configured protocol version.
    #[error("{operation} not supported by {version}")]
    Unsupported {
        operation: &'static str,
        version: crate::snmp::Version,
    },
}

impl Error {
    /// Create a schema error without module attribution.
    pub fn schema(kind: SchemaErrorKind) -> Self {
        Self::Schema { module: None, kind }
    }

    /// Create a schema error attributed to a module.
    pub fn schema_in(module: impl Into<Box<str>>, kind: SchemaErrorKind) -> Self {
        Self::Schema {
            module: Some(module.into()),
            kind,
        }
    }

    /// Create a validation error attributed to a schema node.
    pub fn validation(node: impl Into<Box<str>>, kind: ValidationErrorKind) -> Self {
        Self::Validation {
            node: node.into(),
            kind,
        }
    }

    /// Create a decode error without OID attribution.
    pub fn decode(kind: DecodeErrorKind) -> Self {
        Self::Decode { oid: None, kind }
    }

    /// Create a decode error attributed to an OID.
    pub fn decode_at(oid: crate::oid::Oid, kind: DecodeErrorKind) -> Self {
        Self::Decode {
            oid: Some(oid),
            kind,
        }
    }

    /// Create an invalid OID error from a kind (no input string).
    pub fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid { kind, input: None }
    }

    /// Create an invalid OID error with the input string that failed.
    pub fn invalid_oid_with_input(kind: OidErrorKind, input: impl Into<Box<str>>) -> Self {
        Self::InvalidOid {
            kind,
            input: Some(input.into()),
        }
    }

    /// True when the error is the agent-side status `status`.
    pub fn is_status(&self, status: ErrorStatus) -> bool {
        matches!(self, Self::Agent { status: s, .. } if *s == status)
    }

    /// Exception kind, if this error wraps an exception varbind.
    pub fn exception_kind(&self) -> Option<ExceptionKind> {
        match self {
            Self::Exception { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_roundtrip() {
        for code in 0..=18 {
            assert_eq!(ErrorStatus::from_i32(code).as_i32(), code);
        }
        assert_eq!(ErrorStatus::from_i32(42), ErrorStatus::Unknown(42));
        assert_eq!(ErrorStatus::Unknown(42).as_i32(), 42);
    }

    #[test]
    fn error_status_display() {
        assert_eq!(ErrorStatus::NotWritable.to_string(), "notWritable");
        assert_eq!(
            ErrorStatus::InconsistentName.to_string(),
            "inconsistentName"
        );
        assert_eq!(ErrorStatus::Unknown(99).to_string(), "unknown(99)");
    }

    #[test]
    fn schema_error_display_names_module() {
        let err = Error::schema_in("IF-MIB", SchemaErrorKind::NoSuchNode);
        assert_eq!(
            err.to_string(),
            "schema error in IF-MIB: no such node in module"
        );
    }

    #[test]
    fn is_status_matches_agent_errors_only() {
        let err = Error::Agent {
            status: ErrorStatus::NotWritable,
            index: 1,
            oid: None,
        };
        assert!(err.is_status(ErrorStatus::NotWritable));
        assert!(!err.is_status(ErrorStatus::NoSuchName));
        assert!(!Error::decode(DecodeErrorKind::IndexTooShort).is_status(ErrorStatus::GenErr));
    }
}
