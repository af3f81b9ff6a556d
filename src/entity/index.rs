//! Table index codec.
//!
//! A table row is addressed by the OID suffix after a column OID. The suffix
//! is the concatenation of the row's index elements in declared order:
//! fixed-width elements contribute exactly their width in arcs,
//! variable-length elements a length arc followed by the payload arcs, and a
//! final IMPLIED element the bare payload with no length arc.

use crate::error::{DecodeErrorKind, Error, Result, SchemaErrorKind};
use crate::schema::{NodeRef, SchemaNode, SchemaRegistry, ValueKind};
use crate::types::{IndexStyle, TypedValue};
use std::fmt;

/// A decoded row index: one [`TypedValue`] per index column, in declared
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    values: Vec<TypedValue>,
}

impl Index {
    pub fn new(values: Vec<TypedValue>) -> Self {
        Self { values }
    }

    pub fn single(value: TypedValue) -> Self {
        Self {
            values: vec![value],
        }
    }

    pub fn values(&self) -> &[TypedValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<TypedValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.values {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
            first = false;
        }
        Ok(())
    }
}

/// Determine how one index column maps onto arcs.
///
/// `is_final` marks the last declared index column; only there can the
/// IMPLIED rule apply.
pub(crate) fn index_style(
    column: &SchemaNode,
    is_final: bool,
    implied: bool,
) -> Result<IndexStyle> {
    let kind = column.value_kind().ok_or_else(|| {
        Error::schema_in(
            column.module.clone(),
            SchemaErrorKind::WrongKind { expected: "column" },
        )
    })?;
    Ok(match kind {
        ValueKind::Integer
        | ValueKind::Unsigned
        | ValueKind::Enum
        | ValueKind::Bool
        | ValueKind::Timeticks => IndexStyle::Fixed(1),
        ValueKind::IpAddress => IndexStyle::Fixed(4),
        ValueKind::OctetString | ValueKind::String => {
            match column.restriction.fixed_length() {
                Some(len) => IndexStyle::Fixed(len as usize),
                None if is_final && implied => IndexStyle::Implied,
                None => IndexStyle::LengthPrefixed,
            }
        }
        ValueKind::Oid => {
            if column.restriction.fixed_length().is_some() {
                return Err(Error::schema_in(
                    column.module.clone(),
                    SchemaErrorKind::FixedLengthOidIndex,
                ));
            }
            if is_final && implied {
                IndexStyle::Implied
            } else {
                IndexStyle::LengthPrefixed
            }
        }
        ValueKind::Bits => {
            return Err(Error::decode_at(
                column.oid.clone(),
                DecodeErrorKind::UnindexableType,
            ));
        }
    })
}

/// Encode a full index into OID arcs, in declared column order.
pub fn encode_index(
    registry: &SchemaRegistry,
    table: &SchemaNode,
    values: &[TypedValue],
) -> Result<Vec<u32>> {
    let (columns, implied) = registry.table_index(table)?;
    if values.len() != columns.len() {
        return Err(Error::schema_in(
            table.module.clone(),
            SchemaErrorKind::MalformedTable {
                detail: format!(
                    "{} expects {} index values, got {}",
                    table.name,
                    columns.len(),
                    values.len()
                )
                .into(),
            },
        ));
    }
    encode_prefix(&columns, implied, values)
}

/// Encode a partial index prefix (walk narrowing). Accepts fewer values than
/// declared columns; a non-final variable-length element keeps its length
/// prefix so the result stays a valid subtree prefix.
pub fn encode_index_prefix(
    registry: &SchemaRegistry,
    table: &SchemaNode,
    values: &[TypedValue],
) -> Result<Vec<u32>> {
    let (columns, implied) = registry.table_index(table)?;
    if values.len() > columns.len() {
        return Err(Error::schema_in(
            table.module.clone(),
            SchemaErrorKind::MalformedTable {
                detail: format!(
                    "{} expects at most {} index values, got {}",
                    table.name,
                    columns.len(),
                    values.len()
                )
                .into(),
            },
        ));
    }
    encode_prefix(&columns[..values.len()], implied && values.len() == columns.len(), values)
}

fn encode_prefix(columns: &[NodeRef], implied: bool, values: &[TypedValue]) -> Result<Vec<u32>> {
    let mut arcs = Vec::new();
    for (pos, (column, value)) in columns.iter().zip(values).enumerate() {
        let is_final = pos + 1 == columns.len();
        let style = index_style(column, is_final, implied)?;
        arcs.extend(value.to_index_arcs(style)?);
    }
    Ok(arcs)
}

/// Decode an OID suffix into a row index.
///
/// The suffix must be consumed exactly: too few arcs is
/// [`DecodeErrorKind::IndexTooShort`], leftovers are
/// [`DecodeErrorKind::TrailingIndexArcs`].
pub fn decode_index(
    registry: &SchemaRegistry,
    table: &SchemaNode,
    suffix: &[u32],
) -> Result<Index> {
    let (columns, implied) = registry.table_index(table)?;
    let mut values = Vec::with_capacity(columns.len());
    let mut pos = 0;
    for (col_pos, column) in columns.iter().enumerate() {
        let is_final = col_pos + 1 == columns.len();
        let style = index_style(column, is_final, implied)?;
        let (value, consumed) =
            TypedValue::from_index_arcs(column.clone(), &suffix[pos..], style)?;
        values.push(value);
        pos += consumed;
    }
    if pos != suffix.len() {
        return Err(Error::decode(DecodeErrorKind::TrailingIndexArcs {
            remaining: suffix.len() - pos,
        }));
    }
    Ok(Index::new(values))
}
