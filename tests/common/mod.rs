//! Shared test utilities for typed-snmp integration tests.

// Allow dead code since not all test files use all utilities
#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;

use futures::{Stream, StreamExt};
use typed_snmp::Result;
use typed_snmp::snmp::VarBind;

/// Pull at most `limit` varbinds off a walk stream. A shorter result means
/// the walk ended before the limit was reached.
pub async fn take_walk_items<S>(walk: &mut S, limit: usize) -> Vec<Result<VarBind>>
where
    S: Stream<Item = Result<VarBind>> + Unpin,
{
    let mut items = Vec::new();
    while items.len() < limit {
        match walk.next().await {
            Some(item) => items.push(item),
            None => break,
        }
    }
    items
}
