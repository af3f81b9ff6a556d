//! MIB source seam.
//!
//! [`MibSource`] is the narrow query interface an SMI-compliant parser
//! implements; the registry never touches MIB files itself. [`MibDump`] is the
//! in-memory implementation shipped with the crate, fed by [`ModuleBuilder`];
//! it backs the test fixtures and lets applications declare schema
//! programmatically.

use crate::error::{Error, Result, SchemaErrorKind};
use crate::oid::Oid;
use crate::schema::node::{
    Access, NodeKind, Restriction, RowIndex, SchemaNode, SmiType,
};
use std::collections::HashMap;

/// A loaded module as reported by the parser.
#[derive(Debug, Clone)]
pub struct ModuleDef {
    pub name: Box<str>,
    /// Parser conformance level; `Some(level)` with `level <= 1` marks major
    /// SMI errors. `None` means the parser does not grade conformance.
    pub conformance: Option<u8>,
    /// Imports the parser could not resolve.
    pub unresolved_imports: Vec<Box<str>>,
    pub nodes: Vec<SchemaNode>,
}

/// Query interface over a MIB parser.
pub trait MibSource {
    /// Load a module by name or file path.
    fn load(&self, name_or_path: &str) -> Result<ModuleDef>;
}

/// In-memory module store implementing [`MibSource`].
#[derive(Debug, Default)]
pub struct MibDump {
    modules: HashMap<Box<str>, ModuleDef>,
}

impl MibDump {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module definition under its own name.
    pub fn register(&mut self, def: ModuleDef) {
        self.modules.insert(def.name.clone(), def);
    }

    /// Register and return self, for chained setup.
    pub fn with(mut self, def: ModuleDef) -> Self {
        self.register(def);
        self
    }
}

impl MibSource for MibDump {
    fn load(&self, name_or_path: &str) -> Result<ModuleDef> {
        self.modules
            .get(name_or_path)
            .cloned()
            .ok_or_else(|| Error::schema_in(name_or_path, SchemaErrorKind::NoSuchModule))
    }
}

/// Fluent builder for a [`ModuleDef`].
///
/// Nodes are pushed without a module name; the builder stamps its own name on
/// each at build time.
#[derive(Debug)]
pub struct ModuleBuilder {
    name: Box<str>,
    conformance: Option<u8>,
    unresolved_imports: Vec<Box<str>>,
    nodes: Vec<SchemaNode>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<Box<str>>) -> Self {
        Self {
            name: name.into(),
            conformance: None,
            unresolved_imports: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Set the parser conformance level.
    pub fn conformance(mut self, level: u8) -> Self {
        self.conformance = Some(level);
        self
    }

    /// Mark an import as unresolved.
    pub fn unresolved_import(mut self, name: impl Into<Box<str>>) -> Self {
        self.unresolved_imports.push(name.into());
        self
    }

    /// Add a node. The node's `module` field is overwritten with the
    /// builder's module name.
    pub fn node(mut self, node: SchemaNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn build(self) -> ModuleDef {
        let name = self.name;
        let nodes = self
            .nodes
            .into_iter()
            .map(|mut node| {
                node.module = name.clone();
                node
            })
            .collect();
        ModuleDef {
            name,
            conformance: self.conformance,
            unresolved_imports: self.unresolved_imports,
            nodes,
        }
    }
}

impl SchemaNode {
    /// An interior (structural) node.
    pub fn interior(name: impl Into<Box<str>>, oid: Oid) -> Self {
        Self::bare(name, oid, NodeKind::Node, None)
    }

    /// A scalar leaf.
    pub fn scalar(name: impl Into<Box<str>>, oid: Oid, smi: SmiType) -> Self {
        Self::bare(name, oid, NodeKind::Scalar, Some(smi))
    }

    /// A conceptual table.
    pub fn table(name: impl Into<Box<str>>, oid: Oid) -> Self {
        Self::bare(name, oid, NodeKind::Table, None)
    }

    /// A conceptual row with its index declaration.
    pub fn row(name: impl Into<Box<str>>, oid: Oid, index: RowIndex) -> Self {
        let mut node = Self::bare(name, oid, NodeKind::Row, None);
        node.access = Access::NotAccessible;
        node.row = Some(index);
        node
    }

    /// A columnar leaf.
    pub fn column(name: impl Into<Box<str>>, oid: Oid, smi: SmiType) -> Self {
        Self::bare(name, oid, NodeKind::Column, Some(smi))
    }

    fn bare(name: impl Into<Box<str>>, oid: Oid, kind: NodeKind, smi: Option<SmiType>) -> Self {
        Self {
            name: name.into(),
            module: "".into(),
            oid,
            kind,
            smi_type: smi,
            convention: None,
            hint: None,
            restriction: Restriction::None,
            named: None,
            access: Access::ReadOnly,
            row: None,
        }
    }

    /// Set the textual convention name.
    pub fn with_convention(mut self, convention: impl Into<Box<str>>) -> Self {
        self.convention = Some(convention.into());
        self
    }

    /// Set the DISPLAY-HINT specification.
    pub fn with_hint(mut self, hint: impl Into<Box<str>>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Set the size/value refinement.
    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restriction = restriction;
        self
    }

    /// Set enumeration labels or bit names.
    pub fn with_named(mut self, named: crate::schema::node::NamedValues) -> Self {
        self.named = Some(named);
        self
    }

    /// Set the max-access level.
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}
