//! Entity resolution.
//!
//! An [`Entity`] classifies a resolved schema node by the operations it
//! supports: scalars answer `get`/`set` on `<oid>.0`, columns are addressed by
//! a row index, tables iterate rows. Name lookup is deterministic: modules are
//! searched in load order and the first match wins, unless resolution is
//! scoped to a single module.

pub mod index;

pub use index::{decode_index, encode_index, encode_index_prefix, Index};

use crate::error::{Error, Result, SchemaErrorKind};
use crate::schema::{NodeKind, NodeRef, SchemaRegistry};

/// A resolved managed-object handle.
#[derive(Debug, Clone)]
pub enum Entity {
    /// Scalar object; instance lives at `<oid>.0`.
    Scalar(NodeRef),
    /// Columnar object together with its owning table.
    Column { node: NodeRef, table: NodeRef },
    /// Conceptual table.
    Table(NodeRef),
    /// Structural node (interior node, row, notification).
    Node(NodeRef),
}

impl Entity {
    /// Resolve a name against the registry.
    ///
    /// `scope` restricts resolution to one module; without it, loaded modules
    /// are searched in load order and the first match wins.
    pub fn resolve(registry: &SchemaRegistry, name: &str, scope: Option<&str>) -> Result<Self> {
        let node = registry.find_node(name, scope)?;
        Self::classify(registry, node)
    }

    /// Classify an already-resolved node.
    pub fn classify(registry: &SchemaRegistry, node: NodeRef) -> Result<Self> {
        Ok(match node.kind {
            NodeKind::Scalar => Self::Scalar(node),
            NodeKind::Table => Self::Table(node),
            NodeKind::Column => {
                let table = column_table(registry, &node)?;
                Self::Column { node, table }
            }
            NodeKind::Node | NodeKind::Row | NodeKind::Notification => Self::Node(node),
        })
    }

    /// The underlying schema node.
    pub fn node(&self) -> &NodeRef {
        match self {
            Self::Scalar(node)
            | Self::Table(node)
            | Self::Node(node)
            | Self::Column { node, .. } => node,
        }
    }

    /// The owning table of a column entity.
    pub fn table(&self) -> Option<&NodeRef> {
        match self {
            Self::Column { table, .. } => Some(table),
            Self::Table(node) => Some(node),
            _ => None,
        }
    }
}

/// Walk a column up to its table through the row node.
fn column_table(registry: &SchemaRegistry, column: &NodeRef) -> Result<NodeRef> {
    let malformed = |detail: String| {
        Error::schema_in(
            column.module.clone(),
            SchemaErrorKind::MalformedTable {
                detail: detail.into(),
            },
        )
    };

    let row_oid = column
        .oid
        .parent()
        .ok_or_else(|| malformed(format!("column {} has no parent", column.name)))?;
    let row = registry
        .node_by_oid(&row_oid)
        .filter(|n| n.oid == row_oid)
        .ok_or_else(|| malformed(format!("column {} has no row node", column.name)))?;
    if row.kind != NodeKind::Row {
        return Err(malformed(format!(
            "parent of column {} is not a row",
            column.name
        )));
    }

    let table_oid = row
        .oid
        .parent()
        .ok_or_else(|| malformed(format!("row {} has no parent", row.name)))?;
    let table = registry
        .node_by_oid(&table_oid)
        .filter(|n| n.oid == table_oid)
        .ok_or_else(|| malformed(format!("row {} has no table node", row.name)))?;
    if table.kind != NodeKind::Table {
        return Err(malformed(format!(
            "parent of row {} is not a table",
            row.name
        )));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::schema::{MibDump, ModuleBuilder, RowIndex, SchemaNode, SmiType};

    fn fixture() -> SchemaRegistry {
        let base = oid!(1, 3, 6, 1, 2, 1, 2);
        let module = ModuleBuilder::new("IF-MIB")
            .node(SchemaNode::interior("interfaces", base.clone()))
            .node(SchemaNode::scalar(
                "ifNumber",
                base.child(1),
                SmiType::Integer32,
            ))
            .node(SchemaNode::table("ifTable", base.child(2)))
            .node(SchemaNode::row(
                "ifEntry",
                base.child(2).child(1),
                RowIndex::Columns {
                    names: vec!["ifIndex".into()],
                    implied: false,
                },
            ))
            .node(SchemaNode::column(
                "ifIndex",
                base.child(2).child(1).child(1),
                SmiType::Integer32,
            ))
            .node(SchemaNode::column(
                "ifDescr",
                base.child(2).child(1).child(2),
                SmiType::OctetString,
            ))
            .build();
        let mut registry = SchemaRegistry::new(MibDump::new().with(module));
        registry.load_module("IF-MIB").unwrap();
        registry
    }

    #[test]
    fn resolve_classifies_kinds() {
        let registry = fixture();
        assert!(matches!(
            Entity::resolve(&registry, "ifNumber", None).unwrap(),
            Entity::Scalar(_)
        ));
        assert!(matches!(
            Entity::resolve(&registry, "ifTable", None).unwrap(),
            Entity::Table(_)
        ));
        assert!(matches!(
            Entity::resolve(&registry, "interfaces", None).unwrap(),
            Entity::Node(_)
        ));
        assert!(matches!(
            Entity::resolve(&registry, "ifEntry", None).unwrap(),
            Entity::Node(_)
        ));
    }

    #[test]
    fn column_knows_its_table() {
        let registry = fixture();
        let entity = Entity::resolve(&registry, "ifDescr", None).unwrap();
        match &entity {
            Entity::Column { node, table } => {
                assert_eq!(node.name.as_ref(), "ifDescr");
                assert_eq!(table.name.as_ref(), "ifTable");
            }
            other => panic!("expected column, got {:?}", other),
        }
        assert_eq!(entity.table().unwrap().name.as_ref(), "ifTable");
    }

    #[test]
    fn unknown_name_is_no_such_attribute() {
        let registry = fixture();
        let err = Entity::resolve(&registry, "ifGhost", None).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema {
                kind: SchemaErrorKind::NoSuchAttribute,
                ..
            }
        ));
    }
}
