//! PDU types handed across the transport seam.
//!
//! The transport owns BER and message security; this layer only describes the
//! request semantics (operation, varbinds, bulk parameters) and the decoded
//! response (status, index, varbinds).

use crate::error::ErrorStatus;
use crate::oid::Oid;
use crate::wire::WireValue;

/// SNMP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1,
    V2c,
    V3,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => write!(f, "SNMPv1"),
            Self::V2c => write!(f, "SNMPv2c"),
            Self::V3 => write!(f, "SNMPv3"),
        }
    }
}

/// A single variable binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: WireValue,
}

impl VarBind {
    pub fn new(oid: Oid, value: WireValue) -> Self {
        Self { oid, value }
    }

    /// Request binding with a NULL placeholder value.
    pub fn null(oid: Oid) -> Self {
        Self {
            oid,
            value: WireValue::Null,
        }
    }
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}

/// Request operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduKind {
    Get,
    GetNext,
    GetBulk {
        non_repeaters: u32,
        max_repetitions: u32,
    },
    Set,
}

impl PduKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::GetNext => "GETNEXT",
            Self::GetBulk { .. } => "GETBULK",
            Self::Set => "SET",
        }
    }
}

/// An outbound request PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub kind: PduKind,
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    pub fn get(oids: impl IntoIterator<Item = Oid>) -> Self {
        Self {
            kind: PduKind::Get,
            varbinds: oids.into_iter().map(VarBind::null).collect(),
        }
    }

    pub fn get_next(oids: impl IntoIterator<Item = Oid>) -> Self {
        Self {
            kind: PduKind::GetNext,
            varbinds: oids.into_iter().map(VarBind::null).collect(),
        }
    }

    pub fn get_bulk(
        oids: impl IntoIterator<Item = Oid>,
        non_repeaters: u32,
        max_repetitions: u32,
    ) -> Self {
        Self {
            kind: PduKind::GetBulk {
                non_repeaters,
                max_repetitions,
            },
            varbinds: oids.into_iter().map(VarBind::null).collect(),
        }
    }

    pub fn set(bindings: impl IntoIterator<Item = (Oid, WireValue)>) -> Self {
        Self {
            kind: PduKind::Set,
            varbinds: bindings
                .into_iter()
                .map(|(oid, value)| VarBind::new(oid, value))
                .collect(),
        }
    }
}

/// A decoded response PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduResponse {
    pub error_status: i32,
    /// 1-based index of the varbind the status refers to; 0 when unset.
    pub error_index: u32,
    pub varbinds: Vec<VarBind>,
}

impl PduResponse {
    /// Successful response carrying varbinds.
    pub fn ok(varbinds: Vec<VarBind>) -> Self {
        Self {
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// Error response echoing the request varbinds, as agents do.
    pub fn error(status: ErrorStatus, index: u32, varbinds: Vec<VarBind>) -> Self {
        Self {
            error_status: status.as_i32(),
            error_index: index,
            varbinds,
        }
    }

    pub fn status(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }
}
