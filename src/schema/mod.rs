//! Schema registry.
//!
//! [`SchemaRegistry`] owns every loaded module and answers the lookups the
//! rest of the crate needs: node by name, node by OID, table structure, index
//! declarations. Loading is additive and requires `&mut self`; once a registry
//! is shared it is effectively frozen, which is what makes the `Arc<SchemaNode>`
//! handles safe to pass around.

pub mod node;
pub mod source;

pub use node::{
    Access, NamedValues, NodeKind, NodeRef, Restriction, RowIndex, SchemaNode, SmiType, ValueKind,
};
pub use source::{MibDump, MibSource, ModuleBuilder, ModuleDef};

use crate::error::{Error, Result, SchemaErrorKind};
use crate::oid::Oid;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

// AUGMENTS chains longer than this are treated as cyclic.
const MAX_AUGMENTS_DEPTH: usize = 8;

struct LoadedModule {
    name: Box<str>,
    // Declaration order, as reported by the source.
    nodes: Vec<NodeRef>,
    by_name: HashMap<Box<str>, NodeRef>,
}

/// Registry of loaded SMI modules.
pub struct SchemaRegistry {
    source: Box<dyn MibSource + Send + Sync>,
    // Load order; name resolution ties break on first loaded.
    modules: Vec<LoadedModule>,
    by_oid: HashMap<Oid, NodeRef>,
}

impl SchemaRegistry {
    /// Create an empty registry over a MIB source.
    pub fn new(source: impl MibSource + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
            modules: Vec::new(),
            by_oid: HashMap::new(),
        }
    }

    /// Load a module by name or path.
    ///
    /// The registry performs its own conformance check on top of whatever the
    /// parser accepted: a module graded at conformance level 1 or below, or
    /// one with unresolved imports, is rejected outright. Returns the module
    /// name on success.
    pub fn load_module(&mut self, name_or_path: &str) -> Result<String> {
        let def = self.source.load(name_or_path)?;

        if let Some(level) = def.conformance {
            if level <= 1 {
                return Err(Error::schema_in(
                    def.name.clone(),
                    SchemaErrorKind::Conformance {
                        detail: format!("conformance level {}", level).into(),
                    },
                ));
            }
        }
        if !def.unresolved_imports.is_empty() {
            return Err(Error::schema_in(
                def.name.clone(),
                SchemaErrorKind::Conformance {
                    detail: format!(
                        "unresolved imports: {}",
                        def.unresolved_imports.join(", ")
                    )
                    .into(),
                },
            ));
        }

        // Reloading a module replaces its previous contents.
        if let Some(pos) = self.modules.iter().position(|m| m.name == def.name) {
            let old = self.modules.remove(pos);
            for node in &old.nodes {
                self.by_oid.remove(&node.oid);
            }
        }

        let mut nodes = Vec::with_capacity(def.nodes.len());
        let mut by_name = HashMap::with_capacity(def.nodes.len());
        for node in def.nodes {
            let node: NodeRef = Arc::new(node);
            by_name.insert(node.name.clone(), node.clone());
            self.by_oid.insert(node.oid.clone(), node.clone());
            nodes.push(node);
        }

        debug!(
            target: "typed_snmp::schema",
            module = %def.name,
            nodes = nodes.len(),
            "module loaded"
        );

        let name = def.name.to_string();
        self.modules.push(LoadedModule {
            name: def.name,
            nodes,
            by_name,
        });
        Ok(name)
    }

    /// Discard all loaded modules.
    pub fn reset(&mut self) {
        self.modules.clear();
        self.by_oid.clear();
        debug!(target: "typed_snmp::schema", "registry reset");
    }

    /// Names of loaded modules, in load order.
    pub fn loaded_modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_ref())
    }

    /// Look up a node by module and name.
    ///
    /// A missing module and a missing node are distinct errors.
    pub fn get_node(&self, module: &str, name: &str) -> Result<NodeRef> {
        let loaded = self
            .modules
            .iter()
            .find(|m| m.name.as_ref() == module)
            .ok_or_else(|| Error::schema_in(module, SchemaErrorKind::NoSuchModule))?;
        loaded
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| Error::schema_in(module, SchemaErrorKind::NoSuchNode))
    }

    /// Look up a name across loaded modules, in load order (first wins).
    ///
    /// `scope` restricts resolution to one module.
    pub fn find_node(&self, name: &str, scope: Option<&str>) -> Result<NodeRef> {
        match scope {
            Some(module) => self.get_node(module, name).map_err(|err| match err {
                Error::Schema {
                    kind: SchemaErrorKind::NoSuchNode,
                    module,
                } => Error::Schema {
                    module,
                    kind: SchemaErrorKind::NoSuchAttribute,
                },
                other => other,
            }),
            None => self
                .modules
                .iter()
                .find_map(|m| m.by_name.get(name).cloned())
                .ok_or_else(|| Error::schema(SchemaErrorKind::NoSuchAttribute)),
        }
    }

    /// All nodes of a module, in declaration order.
    pub fn module_nodes(&self, module: &str) -> Result<&[NodeRef]> {
        self.modules
            .iter()
            .find(|m| m.name.as_ref() == module)
            .map(|m| m.nodes.as_slice())
            .ok_or_else(|| Error::schema_in(module, SchemaErrorKind::NoSuchModule))
    }

    /// Longest-prefix lookup of a node covering `oid`.
    ///
    /// An instance OID (`ifDescr.42`) resolves to its column node.
    pub fn node_by_oid(&self, oid: &Oid) -> Option<NodeRef> {
        let arcs = oid.arcs();
        for len in (1..=arcs.len()).rev() {
            if let Some(node) = self.by_oid.get(&Oid::from_slice(&arcs[..len])) {
                return Some(node.clone());
            }
        }
        None
    }

    /// Resolve the runtime value kind of a leaf node.
    pub fn resolve_kind(&self, node: &SchemaNode) -> Result<ValueKind> {
        node.value_kind().ok_or_else(|| {
            Error::schema_in(
                node.module.clone(),
                SchemaErrorKind::WrongKind { expected: "leaf" },
            )
        })
    }

    /// The row node of a table.
    pub fn table_row(&self, table: &SchemaNode) -> Result<NodeRef> {
        if table.kind != NodeKind::Table {
            return Err(Error::schema_in(
                table.module.clone(),
                SchemaErrorKind::WrongKind { expected: "table" },
            ));
        }
        let loaded = self
            .modules
            .iter()
            .find(|m| m.name == table.module)
            .ok_or_else(|| Error::schema_in(table.module.clone(), SchemaErrorKind::NoSuchModule))?;
        let row = loaded
            .nodes
            .iter()
            .find(|n| n.oid.parent().as_ref() == Some(&table.oid))
            .ok_or_else(|| {
                Error::schema_in(
                    table.module.clone(),
                    SchemaErrorKind::MalformedTable {
                        detail: format!("{} has no entry node", table.name).into(),
                    },
                )
            })?;
        if row.kind != NodeKind::Row {
            return Err(Error::schema_in(
                table.module.clone(),
                SchemaErrorKind::MalformedTable {
                    detail: format!("child of {} is not a row", table.name).into(),
                },
            ));
        }
        Ok(row.clone())
    }

    /// The columns of a table, in OID order.
    pub fn table_columns(&self, table: &SchemaNode) -> Result<Vec<NodeRef>> {
        let row = self.table_row(table)?;
        let loaded = self
            .modules
            .iter()
            .find(|m| m.name == table.module)
            .ok_or_else(|| Error::schema_in(table.module.clone(), SchemaErrorKind::NoSuchModule))?;
        let mut columns: Vec<NodeRef> = loaded
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Column && n.oid.parent().as_ref() == Some(&row.oid))
            .cloned()
            .collect();
        columns.sort_by(|a, b| a.oid.cmp(&b.oid));
        if columns.is_empty() {
            return Err(Error::schema_in(
                table.module.clone(),
                SchemaErrorKind::MalformedTable {
                    detail: format!("{} has no columns", table.name).into(),
                },
            ));
        }
        Ok(columns)
    }

    /// The index columns of a table and the IMPLIED flag, following AUGMENTS
    /// chains to the base row.
    pub fn table_index(&self, table: &SchemaNode) -> Result<(Vec<NodeRef>, bool)> {
        let row = self.table_row(table)?;
        self.row_index(&row, 0)
    }

    fn row_index(&self, row: &SchemaNode, depth: usize) -> Result<(Vec<NodeRef>, bool)> {
        if depth > MAX_AUGMENTS_DEPTH {
            return Err(Error::schema_in(
                row.module.clone(),
                SchemaErrorKind::UnresolvableAugments,
            ));
        }
        let index = row.row.as_ref().ok_or_else(|| {
            Error::schema_in(
                row.module.clone(),
                SchemaErrorKind::MalformedTable {
                    detail: format!("{} has no index declaration", row.name).into(),
                },
            )
        })?;
        match index {
            RowIndex::Columns { names, implied } => {
                if names.is_empty() {
                    return Err(Error::schema_in(
                        row.module.clone(),
                        SchemaErrorKind::MalformedTable {
                            detail: format!("{} declares an empty index", row.name).into(),
                        },
                    ));
                }
                let mut columns = Vec::with_capacity(names.len());
                for name in names {
                    // Index columns may live in another module (shared index
                    // types), so fall back to a global lookup.
                    let column = self
                        .get_node(&row.module, name)
                        .or_else(|_| self.find_node(name, None))
                        .map_err(|_| {
                            Error::schema_in(
                                row.module.clone(),
                                SchemaErrorKind::MalformedTable {
                                    detail: format!("index column {} not found", name).into(),
                                },
                            )
                        })?;
                    if column.kind != NodeKind::Column {
                        return Err(Error::schema_in(
                            row.module.clone(),
                            SchemaErrorKind::MalformedTable {
                                detail: format!("index element {} is not a column", name).into(),
                            },
                        ));
                    }
                    columns.push(column);
                }
                Ok((columns, *implied))
            }
            RowIndex::Augments { row: base_name } => {
                let base = self
                    .find_node(base_name, None)
                    .map_err(|_| {
                        Error::schema_in(row.module.clone(), SchemaErrorKind::UnresolvableAugments)
                    })?;
                if base.kind != NodeKind::Row {
                    return Err(Error::schema_in(
                        row.module.clone(),
                        SchemaErrorKind::UnresolvableAugments,
                    ));
                }
                self.row_index(&base, depth + 1)
            }
        }
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field(
                "modules",
                &self.modules.iter().map(|m| &m.name).collect::<Vec<_>>(),
            )
            .field("nodes", &self.by_oid.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn if_mib() -> ModuleDef {
        let base = oid!(1, 3, 6, 1, 2, 1, 2);
        ModuleBuilder::new("IF-MIB")
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
            .build()
    }

    fn registry_with(defs: Vec<ModuleDef>) -> SchemaRegistry {
        let mut dump = MibDump::new();
        let names: Vec<String> = defs.iter().map(|d| d.name.to_string()).collect();
        for def in defs {
            dump.register(def);
        }
        let mut registry = SchemaRegistry::new(dump);
        for name in names {
            registry.load_module(&name).unwrap();
        }
        registry
    }

    #[test]
    fn load_and_lookup() {
        let registry = registry_with(vec![if_mib()]);
        let node = registry.get_node("IF-MIB", "ifDescr").unwrap();
        assert_eq!(node.kind, NodeKind::Column);

        let err = registry.get_node("IF-MIB", "nope").unwrap_err();
        assert!(matches!(
            err,
            Error::Schema {
                kind: SchemaErrorKind::NoSuchNode,
                ..
            }
        ));
        let err = registry.get_node("NOPE-MIB", "ifDescr").unwrap_err();
        assert!(matches!(
            err,
            Error::Schema {
                kind: SchemaErrorKind::NoSuchModule,
                ..
            }
        ));
    }

    #[test]
    fn conformance_level_rejected() {
        let mut dump = MibDump::new();
        dump.register(ModuleBuilder::new("BROKEN-MIB").conformance(1).build());
        let mut registry = SchemaRegistry::new(dump);
        let err = registry.load_module("BROKEN-MIB").unwrap_err();
        assert!(matches!(
            err,
            Error::Schema {
                kind: SchemaErrorKind::Conformance { .. },
                ..
            }
        ));
        assert_eq!(registry.loaded_modules().count(), 0);
    }

    #[test]
    fn unresolved_import_rejected_and_named() {
        let mut dump = MibDump::new();
        dump.register(
            ModuleBuilder::new("NEEDY-MIB")
                .unresolved_import("MISSING-TC")
                .build(),
        );
        let mut registry = SchemaRegistry::new(dump);
        let err = registry.load_module("NEEDY-MIB").unwrap_err();
        assert!(err.to_string().contains("MISSING-TC"));
    }

    #[test]
    fn find_node_first_module_wins() {
        let other = ModuleBuilder::new("OTHER-MIB")
            .node(SchemaNode::scalar(
                "ifNumber",
                oid!(1, 3, 6, 1, 4, 1, 999, 1),
                SmiType::Integer32,
            ))
            .build();
        let registry = registry_with(vec![if_mib(), other]);
        let node = registry.find_node("ifNumber", None).unwrap();
        assert_eq!(node.module.as_ref(), "IF-MIB");

        let scoped = registry.find_node("ifNumber", Some("OTHER-MIB")).unwrap();
        assert_eq!(scoped.module.as_ref(), "OTHER-MIB");

        let err = registry.find_node("missingThing", None).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema {
                kind: SchemaErrorKind::NoSuchAttribute,
                ..
            }
        ));
    }

    #[test]
    fn table_structure() {
        let registry = registry_with(vec![if_mib()]);
        let table = registry.get_node("IF-MIB", "ifTable").unwrap();

        let columns = registry.table_columns(&table).unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_ref()).collect();
        assert_eq!(names, ["ifIndex", "ifDescr"]);

        let (index, implied) = registry.table_index(&table).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].name.as_ref(), "ifIndex");
        assert!(!implied);
    }

    #[test]
    fn augments_resolves_to_base_index() {
        let ext_base = oid!(1, 3, 6, 1, 4, 1, 999, 7);
        let ext = ModuleBuilder::new("IF-EXT-MIB")
            .node(SchemaNode::table("ifXTable", ext_base.clone()))
            .node(SchemaNode::row(
                "ifXEntry",
                ext_base.child(1),
                RowIndex::Augments {
                    row: "ifEntry".into(),
                },
            ))
            .node(SchemaNode::column(
                "ifName",
                ext_base.child(1).child(1),
                SmiType::OctetString,
            ))
            .build();
        let registry = registry_with(vec![if_mib(), ext]);
        let table = registry.get_node("IF-EXT-MIB", "ifXTable").unwrap();
        let (index, implied) = registry.table_index(&table).unwrap();
        assert_eq!(index[0].name.as_ref(), "ifIndex");
        assert!(!implied);
    }

    #[test]
    fn augments_to_missing_row_fails() {
        let base = oid!(1, 3, 6, 1, 4, 1, 999, 8);
        let broken = ModuleBuilder::new("DANGLING-MIB")
            .node(SchemaNode::table("dTable", base.clone()))
            .node(SchemaNode::row(
                "dEntry",
                base.child(1),
                RowIndex::Augments {
                    row: "ghostEntry".into(),
                },
            ))
            .node(SchemaNode::column(
                "dValue",
                base.child(1).child(1),
                SmiType::Integer32,
            ))
            .build();
        let registry = registry_with(vec![broken]);
        let table = registry.get_node("DANGLING-MIB", "dTable").unwrap();
        let err = registry.table_index(&table).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema {
                kind: SchemaErrorKind::UnresolvableAugments,
                ..
            }
        ));
    }

    #[test]
    fn node_by_oid_longest_prefix() {
        let registry = registry_with(vec![if_mib()]);
        let instance = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 42);
        let node = registry.node_by_oid(&instance).unwrap();
        assert_eq!(node.name.as_ref(), "ifDescr");
        assert!(registry.node_by_oid(&oid!(1, 3, 6, 1, 9)).is_none());
    }

    #[test]
    fn reset_discards_everything() {
        let mut registry = registry_with(vec![if_mib()]);
        registry.reset();
        assert_eq!(registry.loaded_modules().count(), 0);
        assert!(registry.get_node("IF-MIB", "ifDescr").is_err());
    }
}
