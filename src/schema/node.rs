//! Schema node data model.
//!
//! A [`SchemaNode`] is the immutable description of one OBJECT-TYPE (or
//! structural node) as loaded from an SMI module: its position in the OID
//! tree, its base type, and the refinements layered on top (textual
//! convention, display hint, ranges, named values). Nodes are shared behind
//! `Arc` and never mutated after module load.

use crate::oid::Oid;
use std::sync::Arc;

/// Structural role of a node in the OID tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Interior node (OBJECT IDENTIFIER, MODULE-IDENTITY, ...).
    Node,
    /// Leaf object with a single instance at `<oid>.0`.
    Scalar,
    /// Conceptual table.
    Table,
    /// Conceptual row (entry) under a table.
    Row,
    /// Columnar object under a row.
    Column,
    /// NOTIFICATION-TYPE definition.
    Notification,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Scalar => "scalar",
            Self::Table => "table",
            Self::Row => "row",
            Self::Column => "column",
            Self::Notification => "notification",
        }
    }
}

/// SMI base type of a leaf object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmiType {
    /// INTEGER / Integer32 (enumerations included; see [`SchemaNode::named`]).
    Integer32,
    /// Unsigned32 / Gauge32.
    Unsigned32,
    /// Counter32.
    Counter32,
    /// Counter64.
    Counter64,
    /// TimeTicks.
    TimeTicks,
    /// OCTET STRING.
    OctetString,
    /// OBJECT IDENTIFIER.
    ObjectIdentifier,
    /// IpAddress.
    IpAddress,
    /// BITS construct.
    Bits,
    /// Opaque.
    Opaque,
}

impl SmiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer32 => "Integer32",
            Self::Unsigned32 => "Unsigned32",
            Self::Counter32 => "Counter32",
            Self::Counter64 => "Counter64",
            Self::TimeTicks => "TimeTicks",
            Self::OctetString => "OCTET STRING",
            Self::ObjectIdentifier => "OBJECT IDENTIFIER",
            Self::IpAddress => "IpAddress",
            Self::Bits => "BITS",
            Self::Opaque => "Opaque",
        }
    }
}

/// Runtime value kind a node resolves to.
///
/// Resolution is two-tier: a recognized textual convention overrides the
/// plain base-type mapping (TruthValue over an enumeration, TimeTicks over
/// Unsigned32, IpAddress over OCTET STRING), and an OCTET STRING carrying a
/// display hint resolves to the formatted [`ValueKind::String`] kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Signed integer without named values.
    Integer,
    /// Unsigned integer (Unsigned32, Gauge32, Counter32, Counter64).
    Unsigned,
    /// Raw octet string.
    OctetString,
    /// Octet string rendered through a display hint.
    String,
    /// OBJECT IDENTIFIER.
    Oid,
    /// IPv4 address.
    IpAddress,
    /// Enumerated integer.
    Enum,
    /// TruthValue.
    Bool,
    /// BITS construct.
    Bits,
    /// TimeTicks / TimeStamp (centiseconds).
    Timeticks,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::Unsigned => "Unsigned",
            Self::OctetString => "OctetString",
            Self::String => "String",
            Self::Oid => "Oid",
            Self::IpAddress => "IpAddress",
            Self::Enum => "Enum",
            Self::Bool => "Bool",
            Self::Bits => "Bits",
            Self::Timeticks => "Timeticks",
        }
    }
}

/// Size or value refinement on a leaf type.
///
/// Ranges have union semantics: a value (or length) is valid when it falls
/// inside any declared pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Restriction {
    /// No refinement.
    #[default]
    None,
    /// SIZE(n) with a single fixed value.
    FixedLength(u64),
    /// Value ranges (integers) or length ranges (octet strings), inclusive.
    Ranges(Vec<(i128, i128)>),
}

impl Restriction {
    /// Check an integer value against the refinement.
    pub fn permits_value(&self, value: i128) -> bool {
        match self {
            Self::None => true,
            Self::FixedLength(n) => value == *n as i128,
            Self::Ranges(ranges) => ranges.iter().any(|&(lo, hi)| value >= lo && value <= hi),
        }
    }

    /// Check an octet-string length against the refinement.
    pub fn permits_length(&self, length: usize) -> bool {
        self.permits_value(length as i128)
    }

    /// The fixed length, if the refinement pins one.
    pub fn fixed_length(&self) -> Option<u64> {
        match self {
            Self::FixedLength(n) => Some(*n),
            Self::Ranges(ranges) => match ranges.as_slice() {
                [(lo, hi)] if lo == hi && *lo >= 0 => Some(*lo as u64),
                _ => None,
            },
            Self::None => None,
        }
    }
}

/// Named values of an enumeration or BITS construct.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamedValues {
    entries: Vec<(i64, Box<str>)>,
}

impl NamedValues {
    pub fn new(entries: impl IntoIterator<Item = (i64, impl Into<Box<str>>)>) -> Self {
        Self {
            entries: entries.into_iter().map(|(v, l)| (v, l.into())).collect(),
        }
    }

    /// Label for a value, if one is declared.
    pub fn label(&self, value: i64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, l)| l.as_ref())
    }

    /// Value for a label, if one is declared.
    pub fn value(&self, label: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(_, l)| l.as_ref() == label)
            .map(|(v, _)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.entries.iter().map(|(v, l)| (*v, l.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Max-access level of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    NotAccessible,
    ReadOnly,
    ReadWrite,
    ReadCreate,
}

impl Access {
    pub fn is_readable(&self) -> bool {
        !matches!(self, Self::NotAccessible)
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Self::ReadWrite | Self::ReadCreate)
    }
}

/// Index declaration of a row node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIndex {
    /// INDEX clause: ordered column names, last element possibly IMPLIED.
    Columns { names: Vec<Box<str>>, implied: bool },
    /// AUGMENTS clause: this row extends another row and shares its index.
    Augments { row: Box<str> },
}

/// One OBJECT-TYPE (or structural node) from a loaded module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    /// Descriptor, e.g. `ifDescr`.
    pub name: Box<str>,
    /// Defining module, e.g. `IF-MIB`.
    pub module: Box<str>,
    /// Registration OID (column OID for columns, without instance suffix).
    pub oid: Oid,
    pub kind: NodeKind,
    pub smi_type: Option<SmiType>,
    /// Textual convention name this type is derived through, if any.
    pub convention: Option<Box<str>>,
    /// DISPLAY-HINT specification, if any.
    pub hint: Option<Box<str>>,
    pub restriction: Restriction,
    /// Enumeration labels (INTEGER) or bit names (BITS).
    pub named: Option<NamedValues>,
    pub access: Access,
    /// Index declaration; present on Row nodes only.
    pub row: Option<RowIndex>,
}

impl SchemaNode {
    /// Qualified `MODULE::name` form used in diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }

    /// Resolve the runtime value kind of this node.
    ///
    /// Convention overrides first, then the plain base-type mapping. Interior
    /// nodes, tables, and rows have no value kind.
    pub fn value_kind(&self) -> Option<ValueKind> {
        let smi = self.smi_type?;

        if let Some(convention) = self.convention.as_deref() {
            match convention {
                "TimeTicks" | "TimeStamp" | "TimeInterval" if smi == SmiType::Unsigned32 => {
                    return Some(ValueKind::Timeticks);
                }
                "TruthValue" => return Some(ValueKind::Bool),
                "IpAddress" if smi == SmiType::OctetString => {
                    return Some(ValueKind::IpAddress);
                }
                _ => {}
            }
        }

        Some(match smi {
            SmiType::Integer32 => {
                if self.named.is_some() {
                    ValueKind::Enum
                } else {
                    ValueKind::Integer
                }
            }
            SmiType::Unsigned32 | SmiType::Counter32 | SmiType::Counter64 => ValueKind::Unsigned,
            SmiType::TimeTicks => ValueKind::Timeticks,
            SmiType::OctetString => {
                if self.hint.is_some() {
                    ValueKind::String
                } else {
                    ValueKind::OctetString
                }
            }
            SmiType::ObjectIdentifier => ValueKind::Oid,
            SmiType::IpAddress => ValueKind::IpAddress,
            SmiType::Bits => ValueKind::Bits,
            SmiType::Opaque => ValueKind::OctetString,
        })
    }
}

/// Shared handle to a schema node.
pub type NodeRef = Arc<SchemaNode>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn leaf(smi: SmiType) -> SchemaNode {
        SchemaNode {
            name: "testLeaf".into(),
            module: "TEST-MIB".into(),
            oid: oid!(1, 3, 6, 1, 4, 1, 999, 1),
            kind: NodeKind::Scalar,
            smi_type: Some(smi),
            convention: None,
            hint: None,
            restriction: Restriction::None,
            named: None,
            access: Access::ReadWrite,
            row: None,
        }
    }

    #[test]
    fn base_type_mapping() {
        assert_eq!(leaf(SmiType::Integer32).value_kind(), Some(ValueKind::Integer));
        assert_eq!(leaf(SmiType::Counter64).value_kind(), Some(ValueKind::Unsigned));
        assert_eq!(
            leaf(SmiType::OctetString).value_kind(),
            Some(ValueKind::OctetString)
        );
        assert_eq!(leaf(SmiType::TimeTicks).value_kind(), Some(ValueKind::Timeticks));
        assert_eq!(leaf(SmiType::IpAddress).value_kind(), Some(ValueKind::IpAddress));
    }

    #[test]
    fn convention_overrides_base_type() {
        let mut node = leaf(SmiType::Unsigned32);
        node.convention = Some("TimeStamp".into());
        assert_eq!(node.value_kind(), Some(ValueKind::Timeticks));

        let mut node = leaf(SmiType::Integer32);
        node.convention = Some("TruthValue".into());
        node.named = Some(NamedValues::new([(1i64, "true"), (2, "false")]));
        assert_eq!(node.value_kind(), Some(ValueKind::Bool));

        let mut node = leaf(SmiType::OctetString);
        node.convention = Some("IpAddress".into());
        assert_eq!(node.value_kind(), Some(ValueKind::IpAddress));
    }

    #[test]
    fn named_values_make_an_enum() {
        let mut node = leaf(SmiType::Integer32);
        node.named = Some(NamedValues::new([(1i64, "up"), (2, "down")]));
        assert_eq!(node.value_kind(), Some(ValueKind::Enum));
    }

    #[test]
    fn display_hint_promotes_octet_string() {
        let mut node = leaf(SmiType::OctetString);
        node.hint = Some("1x:".into());
        assert_eq!(node.value_kind(), Some(ValueKind::String));
    }

    #[test]
    fn restriction_union_semantics() {
        let r = Restriction::Ranges(vec![(0, 9), (100, 199)]);
        assert!(r.permits_value(5));
        assert!(r.permits_value(150));
        assert!(!r.permits_value(50));
        assert!(Restriction::None.permits_value(i128::MAX));
        assert_eq!(Restriction::FixedLength(6).fixed_length(), Some(6));
        assert_eq!(Restriction::Ranges(vec![(4, 4)]).fixed_length(), Some(4));
        assert_eq!(Restriction::Ranges(vec![(0, 4)]).fixed_length(), None);
    }

    #[test]
    fn named_values_lookup() {
        let named = NamedValues::new([(1i64, "up"), (2, "down"), (3, "testing")]);
        assert_eq!(named.label(2), Some("down"));
        assert_eq!(named.value("testing"), Some(3));
        assert_eq!(named.label(4), None);
        assert_eq!(named.value("unknown"), None);
    }
}
