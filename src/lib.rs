//! MIB-driven, typed SNMP manager library.
//!
//! `typed-snmp` loads SMI schema definitions and exposes managed objects as
//! typed handles: scalars answer `get`/`set` on their `<oid>.0` instance,
//! columns are addressed by a row index, tables enumerate rows. Values cross
//! the wire as plain [`WireValue`]s and are validated against the schema
//! (ranges, lengths, enumerations, display hints) on both the read and the
//! write path.
//!
//! The crate deliberately stops at two seams:
//!
//! - [`schema::MibSource`] is the query interface an SMI parser implements.
//!   The in-memory [`schema::ModuleBuilder`]/[`schema::MibDump`] implementation
//!   serves tests and applications that declare schema programmatically.
//! - [`snmp::Transport`] owns sockets, message encoding, timeouts, retries,
//!   and v3 security. A scripted `MockTransport` ships behind the `testing`
//!   feature.
//!
//! # Example
//!
//! ```rust,no_run
//! use typed_snmp::prelude::*;
//! use typed_snmp::schema::{MibDump, ModuleBuilder, SchemaNode, SmiType};
//!
//! # fn main() -> typed_snmp::Result<()> {
//! let module = ModuleBuilder::new("TOY-MIB")
//!     .node(SchemaNode::scalar(
//!         "toyCount",
//!         oid!(1, 3, 6, 1, 4, 1, 9999, 1),
//!         SmiType::Integer32,
//!     ))
//!     .build();
//!
//! let mut registry = SchemaRegistry::new(MibDump::new().with(module));
//! registry.load_module("TOY-MIB")?;
//! # Ok(())
//! # }
//! ```
//!
//! With a transport in hand, a [`Manager`] binds the registry to a session:
//! `manager.scalar("toyCount")?.get().await?`.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod entity;
pub mod error;
pub mod manager;
pub mod oid;
pub mod prelude;
pub mod schema;
pub mod snmp;
pub mod types;
pub mod wire;

pub use entity::{Entity, Index};
pub use error::{Error, ErrorStatus, ExceptionKind, Result};
pub use manager::{Manager, ManagerBuilder};
pub use oid::Oid;
pub use schema::SchemaRegistry;
pub use snmp::{Session, SessionConfig, Transport, Version};
pub use types::{NativeValue, Timeticks, TypedValue};
pub use wire::WireValue;
