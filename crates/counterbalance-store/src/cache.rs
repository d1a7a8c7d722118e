//! Read-through cache in front of an [`OrderStore`].
//!
//! Orders are write-once, so a cached entry can only ever be the durable
//! value or absent. The cache is only filled from values the inner store
//! returned from `get` or accepted through `put_if_absent`; a losing
//! `put_if_absent` caches nothing. The cache is owned by the wrapper, so a
//! fresh process starts cold.
//!
//! Under a TTL policy every insert sweeps expired entries, so the map holds
//! at most the keys touched within the last TTL window.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use counterbalance_core::{CachePolicy, OrderAssignment, OrderKey};
use tracing::debug;

use crate::StoreError;
use crate::traits::OrderStore;

#[derive(Debug, Clone)]
struct Entry {
    value: OrderAssignment,
    cached_at: Instant,
}

#[derive(Debug)]
pub struct CachedOrderStore<S> {
    inner: S,
    policy: CachePolicy,
    entries: Mutex<HashMap<OrderKey, Entry>>,
}

impl<S: OrderStore> CachedOrderStore<S> {
    pub fn new(inner: S, policy: CachePolicy) -> Self {
        Self {
            inner,
            policy: policy.normalized(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Number of cached entries, including expired ones not yet swept.
    pub fn cached_len(&self) -> Result<usize, StoreError> {
        Ok(self.entries.lock().map_err(|_| StoreError::Poisoned)?.len())
    }

    pub fn invalidate(&self, key: &OrderKey) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .remove(key);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .clear();
        Ok(())
    }

    fn lookup(&self, key: &OrderKey) -> Result<Option<OrderAssignment>, StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        let fresh = match (entries.get(key), self.policy.ttl()) {
            (None, _) => return Ok(None),
            (Some(e), Some(ttl)) => e.cached_at.elapsed() < ttl,
            (Some(_), None) => true,
        };
        if fresh {
            Ok(entries.get(key).map(|e| e.value.clone()))
        } else {
            entries.remove(key);
            Ok(None)
        }
    }

    fn remember(&self, value: &OrderAssignment) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(ttl) = self.policy.ttl() {
            let before = entries.len();
            entries.retain(|_, e| e.cached_at.elapsed() < ttl);
            let swept = before - entries.len();
            if swept > 0 {
                debug!(swept, "evicted expired order cache entries");
            }
        }
        entries.insert(
            value.key(),
            Entry {
                value: value.clone(),
                cached_at: Instant::now(),
            },
        );
        Ok(())
    }
}

impl<S: OrderStore> OrderStore for CachedOrderStore<S> {
    fn get(&self, key: &OrderKey) -> Result<Option<OrderAssignment>, StoreError> {
        if !self.policy.is_enabled() {
            return self.inner.get(key);
        }
        if let Some(hit) = self.lookup(key)? {
            debug!(%key, "order cache hit");
            return Ok(Some(hit));
        }
        let durable = self.inner.get(key)?;
        if let Some(value) = &durable {
            self.remember(value)?;
        }
        Ok(durable)
    }

    fn put_if_absent(&self, assignment: &OrderAssignment) -> Result<bool, StoreError> {
        let won = self.inner.put_if_absent(assignment)?;
        if won && self.policy.is_enabled() {
            self.remember(assignment)?;
        }
        Ok(won)
    }
}
