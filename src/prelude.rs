//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use typed_snmp::prelude::*;
//! ```
//!
//! This imports:
//! - Core types: [`Manager`], [`Session`], [`Oid`], [`WireValue`], [`TypedValue`]
//! - Schema access: [`SchemaRegistry`], the [`MibSource`] trait
//! - Error handling: [`Error`], [`Result`]
//! - The [`oid!`] macro for compile-time OID construction

pub use crate::entity::Index;
pub use crate::error::{Error, Result};
pub use crate::manager::{Manager, ManagerBuilder};
pub use crate::oid::Oid;
pub use crate::schema::{MibSource, SchemaRegistry};
pub use crate::snmp::{Session, SessionConfig, Transport, VarBind, Version};
pub use crate::types::{NativeValue, TypedValue};
pub use crate::wire::WireValue;

#[doc(no_inline)]
pub use crate::oid;
