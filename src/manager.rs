//! Manager facade.
//!
//! A [`Manager`] ties a loaded [`SchemaRegistry`] to a [`Session`] and hands
//! out typed handles for managed objects: [`Scalar`] for `<oid>.0` instances,
//! [`Column`] for cells addressed by a row index, [`Table`] for row
//! enumeration. Writes can be batched through a [`Transaction`] scope that
//! sends one SET PDU on commit and discards staged values on drop.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::entity::{Entity, Index, decode_index, encode_index, encode_index_prefix};
use crate::error::{Error, ErrorStatus, ExceptionKind, Result, SchemaErrorKind};
use crate::oid::Oid;
use crate::schema::{NodeRef, SchemaRegistry};
use crate::snmp::{Session, SessionConfig, Transport, Version};
use crate::types::{NativeValue, TypedValue};
use crate::wire::WireValue;

/// v3 security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

/// v3 authentication protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProtocol {
    Md5,
    Sha,
}

/// v3 privacy protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivProtocol {
    Des,
    Aes,
}

/// v3 credential bundle, consumed by transport implementations.
#[derive(Debug, Clone)]
pub struct V3Credentials {
    pub secname: String,
    pub level: SecurityLevel,
    pub auth: Option<(AuthProtocol, String)>,
    pub privacy: Option<(PrivProtocol, String)>,
    pub context: Option<String>,
}

/// Target parameters owned by the transport: community, timing, v3 security.
///
/// The manager carries these so transport constructors can consume them from
/// one place; the session itself never reads them.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub community: Bytes,
    pub timeout: Duration,
    pub retries: u32,
    pub v3: Option<V3Credentials>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            community: Bytes::from_static(b"public"),
            timeout: Duration::from_secs(5),
            retries: 3,
            v3: None,
        }
    }
}

/// Builder for [`Manager`].
#[derive(Debug, Clone)]
pub struct ManagerBuilder {
    version: Version,
    target: TargetConfig,
    bulk: Option<u32>,
    none_values: bool,
    loose: bool,
    cache_ttl: Option<Duration>,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            target: TargetConfig::default(),
            bulk: Some(crate::snmp::DEFAULT_MAX_REPETITIONS),
            none_values: false,
            loose: false,
            cache_ttl: None,
        }
    }
}

impl ManagerBuilder {
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn community(mut self, community: impl Into<Bytes>) -> Self {
        self.target.community = community.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.target.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.target.retries = retries;
        self
    }

    /// v3 credentials; implies [`Version::V3`].
    pub fn v3(mut self, credentials: V3Credentials) -> Self {
        self.version = Version::V3;
        self.target.v3 = Some(credentials);
        self
    }

    /// GETBULK page size for walks.
    pub fn bulk(mut self, max_repetitions: u32) -> Self {
        self.bulk = Some(max_repetitions);
        self
    }

    /// Disable GETBULK; walks fall back to GETNEXT.
    pub fn no_bulk(mut self) -> Self {
        self.bulk = None;
        self
    }

    /// Map exception varbinds to absent values instead of erroring.
    /// Incompatible with v1, which has no exception varbinds.
    pub fn none_values(mut self, enabled: bool) -> Self {
        self.none_values = enabled;
        self
    }

    /// Surface unmapped enumeration integers on decode.
    pub fn loose(mut self, enabled: bool) -> Self {
        self.loose = enabled;
        self
    }

    /// Enable the response cache with the given TTL.
    pub fn cache(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn build<T: Transport + 'static>(
        self,
        transport: T,
        registry: SchemaRegistry,
    ) -> Result<Manager<T>> {
        if self.version == Version::V1 && self.none_values {
            return Err(Error::Unsupported {
                operation: "none mode",
                version: Version::V1,
            });
        }
        let config = SessionConfig {
            version: self.version,
            bulk: self.bulk,
            none_values: self.none_values,
            loose: self.loose,
            cache_ttl: self.cache_ttl,
        };
        Ok(Manager {
            session: Session::new(transport, config),
            registry: Arc::new(registry),
            target: Arc::new(self.target),
        })
    }
}

/// MIB-driven SNMP manager.
///
/// Cheaply cloneable; handles hold their own clone.
pub struct Manager<T: Transport> {
    session: Session<T>,
    registry: Arc<SchemaRegistry>,
    target: Arc<TargetConfig>,
}

impl<T: Transport> Clone for Manager<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            registry: Arc::clone(&self.registry),
            target: Arc::clone(&self.target),
        }
    }
}

impl<T: Transport + 'static> Manager<T> {
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::default()
    }

    /// Manager with default policy (v2c, bulk walks, strict decode).
    pub fn new(transport: T, registry: SchemaRegistry) -> Self {
        Self {
            session: Session::new(transport, SessionConfig::default()),
            registry: Arc::new(registry),
            target: Arc::new(TargetConfig::default()),
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    /// Resolve a name to a scalar handle.
    pub fn scalar(&self, name: &str) -> Result<Scalar<T>> {
        self.scoped_scalar(name, None)
    }

    /// Resolve a name to a column handle.
    pub fn column(&self, name: &str) -> Result<Column<T>> {
        self.scoped_column(name, None)
    }

    /// Resolve a name to a table handle.
    pub fn table(&self, name: &str) -> Result<Table<T>> {
        self.scoped_table(name, None)
    }

    /// View restricting name resolution to one loaded module.
    pub fn module(&self, name: &str) -> Result<ModuleView<T>> {
        // Fails early when the module is not loaded.
        self.registry.module_nodes(name)?;
        Ok(ModuleView {
            manager: self.clone(),
            module: name.to_owned(),
        })
    }

    /// Open a batched-SET scope.
    pub fn transaction(&self) -> Transaction<T> {
        Transaction {
            manager: self.clone(),
            staged: Vec::new(),
        }
    }

    fn scoped_scalar(&self, name: &str, scope: Option<&str>) -> Result<Scalar<T>> {
        match Entity::resolve(&self.registry, name, scope)? {
            Entity::Scalar(node) => Ok(Scalar {
                manager: self.clone(),
                node,
            }),
            _ => Err(Error::schema(SchemaErrorKind::WrongKind {
                expected: "scalar",
            })),
        }
    }

    fn scoped_column(&self, name: &str, scope: Option<&str>) -> Result<Column<T>> {
        match Entity::resolve(&self.registry, name, scope)? {
            Entity::Column { node, table } => Ok(Column {
                manager: self.clone(),
                node,
                table,
            }),
            _ => Err(Error::schema(SchemaErrorKind::WrongKind {
                expected: "column",
            })),
        }
    }

    fn scoped_table(&self, name: &str, scope: Option<&str>) -> Result<Table<T>> {
        match Entity::resolve(&self.registry, name, scope)? {
            Entity::Table(node) => Ok(Table {
                manager: self.clone(),
                node,
            }),
            _ => Err(Error::schema(SchemaErrorKind::WrongKind {
                expected: "table",
            })),
        }
    }

    async fn fetch_instance(&self, node: &NodeRef, instance: Oid) -> Result<Option<TypedValue>> {
        let mut results = self.session.get(std::slice::from_ref(&instance)).await?;
        match results.pop() {
            Some((_, Some(wire))) => Ok(Some(TypedValue::decode(
                node.clone(),
                wire,
                self.session.loose(),
            )?)),
            Some((_, None)) => Ok(None),
            None => Ok(None),
        }
    }

    async fn write_instance(
        &self,
        node: &NodeRef,
        instance: Oid,
        value: NativeValue,
    ) -> Result<()> {
        let typed = TypedValue::from_native(node.clone(), value)?;
        let wire = typed.encode()?;
        self.session.set(vec![(instance, wire)]).await?;
        Ok(())
    }
}

impl<T: Transport> std::fmt::Debug for Manager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("modules", &self.registry.loaded_modules().count())
            .finish_non_exhaustive()
    }
}

/// Handle for a scalar object; operates on the `<oid>.0` instance.
#[derive(Clone)]
pub struct Scalar<T: Transport> {
    manager: Manager<T>,
    node: NodeRef,
}

impl<T: Transport + 'static> Scalar<T> {
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn instance_oid(&self) -> Oid {
        self.node.oid.child(0)
    }

    /// Read the scalar. `None` only in `none` mode, when the agent answered
    /// with an exception varbind.
    pub async fn get(&self) -> Result<Option<TypedValue>> {
        self.manager
            .fetch_instance(&self.node, self.instance_oid())
            .await
    }

    /// Validate and write the scalar.
    pub async fn set(&self, value: impl Into<NativeValue>) -> Result<()> {
        self.manager
            .write_instance(&self.node, self.instance_oid(), value.into())
            .await
    }
}

impl<T: Transport> std::fmt::Debug for Scalar<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scalar")
            .field("node", &self.node.name)
            .finish_non_exhaustive()
    }
}

/// Handle for a columnar object.
#[derive(Clone)]
pub struct Column<T: Transport> {
    manager: Manager<T>,
    node: NodeRef,
    table: NodeRef,
}

impl<T: Transport + 'static> Column<T> {
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn table_node(&self) -> &NodeRef {
        &self.table
    }

    /// Build a full row index from native values, in declared index order.
    pub fn index(&self, values: Vec<NativeValue>) -> Result<Index> {
        let (columns, _) = self.manager.registry.table_index(&self.table)?;
        if values.len() != columns.len() {
            return Err(Error::schema_in(
                self.table.module.clone(),
                SchemaErrorKind::MalformedTable {
                    detail: format!(
                        "{} expects {} index values, got {}",
                        self.table.name,
                        columns.len(),
                        values.len()
                    )
                    .into(),
                },
            ));
        }
        let typed = columns
            .iter()
            .zip(values)
            .map(|(column, value)| TypedValue::from_native(column.clone(), value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Index::new(typed))
    }

    /// Instance OID for a row index.
    pub fn instance_oid(&self, index: &Index) -> Result<Oid> {
        let arcs = encode_index(&self.manager.registry, &self.table, index.values())?;
        Ok(self.node.oid.extend(&arcs))
    }

    /// Read one cell.
    pub async fn get(&self, index: &Index) -> Result<Option<TypedValue>> {
        self.manager
            .fetch_instance(&self.node, self.instance_oid(index)?)
            .await
    }

    /// Validate and write one cell.
    pub async fn set(&self, index: &Index, value: impl Into<NativeValue>) -> Result<()> {
        self.manager
            .write_instance(&self.node, self.instance_oid(index)?, value.into())
            .await
    }

    /// Whether the instance exists on the agent.
    pub async fn contains(&self, index: &Index) -> Result<bool> {
        let instance = self.instance_oid(index)?;
        match self.manager.session.get_raw(&[instance]).await {
            Ok(varbinds) => Ok(varbinds.first().is_some_and(|vb| !vb.value.is_exception())),
            Err(e) if e.is_status(ErrorStatus::NoSuchName) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Walk every cell of the column, yielding (row index, value) in
    /// retrieval order.
    pub async fn iter(&self) -> Result<Vec<(Index, TypedValue)>> {
        let base = self.node.oid.clone();
        self.walk_cells(&base).await
    }

    /// Walk the cells under a partial index prefix (subtree narrowing).
    pub async fn iter_prefix(&self, values: Vec<NativeValue>) -> Result<Vec<(Index, TypedValue)>> {
        let (columns, _) = self.manager.registry.table_index(&self.table)?;
        let typed = columns
            .iter()
            .zip(values)
            .map(|(column, value)| TypedValue::from_native(column.clone(), value))
            .collect::<Result<Vec<_>>>()?;
        let arcs = encode_index_prefix(&self.manager.registry, &self.table, &typed)?;
        let base = self.node.oid.extend(&arcs);
        self.walk_cells(&base).await
    }

    async fn walk_cells(&self, base: &Oid) -> Result<Vec<(Index, TypedValue)>> {
        let results = self.manager.session.walk_collect(base).await?;
        if results.is_empty() {
            self.probe_empty().await?;
            return Ok(Vec::new());
        }

        let mut cells = Vec::with_capacity(results.len());
        for (oid, wire) in results {
            let suffix = oid
                .suffix_after(&self.node.oid)
                .ok_or_else(|| {
                    Error::decode_at(oid.clone(), crate::error::DecodeErrorKind::UnexpectedOid)
                })?
                .to_vec();
            let index = decode_index(&self.manager.registry, &self.table, &suffix)?;
            let value = TypedValue::decode(self.node.clone(), wire, self.manager.session.loose())?;
            cells.push((index, value));
        }
        Ok(cells)
    }

    /// Disambiguate an empty walk: noSuchInstance means the column exists
    /// and has no rows; noSuchObject means the agent does not know the
    /// column at all; noSuchName (v1) cannot distinguish the two and is
    /// treated as empty.
    async fn probe_empty(&self) -> Result<()> {
        match self
            .manager
            .session
            .get_raw(std::slice::from_ref(&self.node.oid))
            .await
        {
            Ok(varbinds) => {
                match varbinds.first().and_then(|vb| vb.value.exception_kind()) {
                    Some(ExceptionKind::NoSuchObject) => Err(Error::Exception {
                        oid: self.node.oid.clone(),
                        kind: ExceptionKind::NoSuchObject,
                    }),
                    _ => Ok(()),
                }
            }
            Err(e) if e.is_status(ErrorStatus::NoSuchName) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<T: Transport> std::fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("node", &self.node.name)
            .field("table", &self.table.name)
            .finish_non_exhaustive()
    }
}

/// Handle for a conceptual table.
#[derive(Clone)]
pub struct Table<T: Transport> {
    manager: Manager<T>,
    node: NodeRef,
}

impl<T: Transport + 'static> Table<T> {
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Columns of the table in OID order.
    pub fn columns(&self) -> Result<Vec<NodeRef>> {
        self.manager.registry.table_columns(&self.node)
    }

    /// Handle for one of this table's columns.
    pub fn column(&self, name: &str) -> Result<Column<T>> {
        let column = self.manager.scoped_column(name, None)?;
        if column.table.oid != self.node.oid {
            return Err(Error::schema_in(
                self.node.module.clone(),
                SchemaErrorKind::MalformedTable {
                    detail: format!("{} is not a column of {}", name, self.node.name).into(),
                },
            ));
        }
        Ok(column)
    }

    /// Enumerate row indices by walking the first readable column.
    pub async fn indices(&self) -> Result<Vec<Index>> {
        let columns = self.columns()?;
        let probe = columns
            .iter()
            .find(|c| c.access.is_readable())
            .or(columns.first())
            .ok_or_else(|| {
                Error::schema_in(
                    self.node.module.clone(),
                    SchemaErrorKind::MalformedTable {
                        detail: format!("{} has no columns", self.node.name).into(),
                    },
                )
            })?
            .clone();
        let column = Column {
            manager: self.manager.clone(),
            node: probe,
            table: self.node.clone(),
        };
        let cells = column.iter().await?;
        Ok(cells.into_iter().map(|(index, _)| index).collect())
    }
}

impl<T: Transport> std::fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("node", &self.node.name)
            .finish_non_exhaustive()
    }
}

/// Name resolution restricted to one module.
pub struct ModuleView<T: Transport> {
    manager: Manager<T>,
    module: String,
}

impl<T: Transport + 'static> ModuleView<T> {
    pub fn name(&self) -> &str {
        &self.module
    }

    pub fn scalar(&self, name: &str) -> Result<Scalar<T>> {
        self.manager.scoped_scalar(name, Some(&self.module))
    }

    pub fn column(&self, name: &str) -> Result<Column<T>> {
        self.manager.scoped_column(name, Some(&self.module))
    }

    pub fn table(&self, name: &str) -> Result<Table<T>> {
        self.manager.scoped_table(name, Some(&self.module))
    }

    /// All nodes the module declares.
    pub fn nodes(&self) -> Result<&[NodeRef]> {
        self.manager.registry.module_nodes(&self.module)
    }
}

/// Batched-SET scope.
///
/// Assignments staged here are validated immediately but sent as a single
/// SET PDU on [`commit`](Self::commit). Dropping the scope uncommitted
/// discards the staged writes.
pub struct Transaction<T: Transport> {
    manager: Manager<T>,
    staged: Vec<(Oid, WireValue)>,
}

impl<T: Transport + 'static> Transaction<T> {
    /// Stage a scalar write.
    pub fn stage(&mut self, scalar: &Scalar<T>, value: impl Into<NativeValue>) -> Result<()> {
        let typed = TypedValue::from_native(scalar.node.clone(), value.into())?;
        self.staged.push((scalar.instance_oid(), typed.encode()?));
        Ok(())
    }

    /// Stage a column cell write.
    pub fn stage_cell(
        &mut self,
        column: &Column<T>,
        index: &Index,
        value: impl Into<NativeValue>,
    ) -> Result<()> {
        let typed = TypedValue::from_native(column.node.clone(), value.into())?;
        self.staged
            .push((column.instance_oid(index)?, typed.encode()?));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Send all staged writes as one SET PDU. A no-op when nothing is staged.
    pub async fn commit(mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        if staged.is_empty() {
            return Ok(());
        }
        self.manager.session.set(staged).await?;
        Ok(())
    }
}

impl<T: Transport> Drop for Transaction<T> {
    fn drop(&mut self) {
        if !self.staged.is_empty() {
            tracing::debug!(
                target: "typed_snmp::manager",
                staged = self.staged.len(),
                "transaction dropped uncommitted, discarding staged writes"
            );
        }
    }
}
