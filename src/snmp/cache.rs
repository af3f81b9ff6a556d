//! TTL response cache.
//!
//! Memoizes GET and walk results per OID. A walk insertion also seeds one GET
//! entry per returned instance, so a cached walk satisfies later point reads
//! without touching the wire. A SET invalidates the written instance and every
//! cached walk whose subtree covers it. Keys are raw OIDs, so loose and none
//! mode share entries.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::oid::Oid;
use crate::wire::WireValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Get(Oid),
    Walk(Oid),
}

struct CacheEntry {
    value: CachedValue,
    stored_at: Instant,
}

#[derive(Clone)]
enum CachedValue {
    Get(WireValue),
    Walk(Vec<(Oid, WireValue)>),
}

/// TTL-keyed memoization of responses.
///
/// Interior mutability behind a `std::sync::Mutex`; every operation is a
/// short critical section with no await points.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached GET result for an instance OID, if fresh.
    pub fn get(&self, oid: &Oid) -> Option<WireValue> {
        let entries = self.lock();
        let entry = entries.get(&CacheKey::Get(oid.clone()))?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        match &entry.value {
            CachedValue::Get(value) => Some(value.clone()),
            CachedValue::Walk(_) => None,
        }
    }

    /// Cached walk result for a subtree base, if fresh.
    pub fn walk(&self, base: &Oid) -> Option<Vec<(Oid, WireValue)>> {
        let entries = self.lock();
        let entry = entries.get(&CacheKey::Walk(base.clone()))?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        match &entry.value {
            CachedValue::Walk(results) => Some(results.clone()),
            CachedValue::Get(_) => None,
        }
    }

    pub fn put_get(&self, oid: Oid, value: WireValue) {
        let now = Instant::now();
        let mut entries = self.lock();
        Self::purge_expired(&mut entries, now, self.ttl);
        entries.insert(
            CacheKey::Get(oid),
            CacheEntry {
                value: CachedValue::Get(value),
                stored_at: now,
            },
        );
    }

    /// Store a walk result and seed a GET entry per returned instance.
    pub fn put_walk(&self, base: Oid, results: Vec<(Oid, WireValue)>) {
        let now = Instant::now();
        let mut entries = self.lock();
        Self::purge_expired(&mut entries, now, self.ttl);
        for (oid, value) in &results {
            entries.insert(
                CacheKey::Get(oid.clone()),
                CacheEntry {
                    value: CachedValue::Get(value.clone()),
                    stored_at: now,
                },
            );
        }
        entries.insert(
            CacheKey::Walk(base),
            CacheEntry {
                value: CachedValue::Walk(results),
                stored_at: now,
            },
        );
    }

    /// Drop the entry for a written instance and any walk covering it.
    pub fn invalidate(&self, oid: &Oid) {
        let mut entries = self.lock();
        entries.retain(|key, _| match key {
            CacheKey::Get(cached) => cached != oid,
            CacheKey::Walk(base) => !oid.starts_with(base),
        });
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn purge_expired(entries: &mut HashMap<CacheKey, CacheEntry>, now: Instant, ttl: Duration) {
        entries.retain(|_, entry| now.duration_since(entry.stored_at) < ttl);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.lock().len())
            .finish()
    }
}
