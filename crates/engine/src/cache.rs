// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered TTL cache with single-flight compute.
//!
//! One typed [`TtlCache`] per namespace, each with its own TTL and entry
//! cap. Entries are immutable once published; `get_or_compute` coalesces
//! concurrent producers per key so a hot target is captured at most once
//! at a time.

use crate::health::PaneSnapshot;
use muster_adapters::WindowInfo;
use muster_core::{CacheConfig, CacheNamespaceConfig, HealthStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    last_used: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

struct CacheState<V> {
    entries: HashMap<String, Entry<V>>,
    use_counter: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// TTL + LRU cache for one namespace.
pub struct TtlCache<V> {
    config: CacheNamespaceConfig,
    state: Mutex<CacheState<V>>,
    flights: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(config: CacheNamespaceConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                use_counter: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            flights: Mutex::new(HashMap::new()),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_seconds)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let ttl = self.ttl();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.use_counter += 1;
        let counter = state.use_counter;

        let fresh = match state.entries.get_mut(key) {
            Some(entry) if entry.inserted_at.elapsed() < ttl => {
                entry.last_used = counter;
                Some(entry.value.clone())
            }
            Some(_) => None,
            None => {
                state.misses += 1;
                return None;
            }
        };

        match fresh {
            Some(value) => {
                state.hits += 1;
                Some(value)
            }
            None => {
                state.entries.remove(key);
                state.misses += 1;
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: V) {
        let max_entries = self.config.max_entries;
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.use_counter += 1;
        let counter = state.use_counter;

        // Evict the least recently used entry when at capacity.
        if !state.entries.contains_key(key) && state.entries.len() >= max_entries {
            let lru_key = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(lru_key) = lru_key {
                state.entries.remove(&lru_key);
                state.evictions += 1;
            }
        }

        state.entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: Instant::now(),
                last_used: counter,
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.state.lock().entries.remove(key);
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Get the cached value or run `produce` to fill it.
    ///
    /// Concurrent callers for the same key share one producer run: the
    /// first in takes the per-key flight lock, later callers wait on it and
    /// then read what it published.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, produce: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let flight = {
            let mut flights = self.flights.lock();
            Arc::clone(flights.entry(key.to_string()).or_default())
        };

        let result = {
            let _guard = flight.lock().await;
            // A concurrent producer may have published while we waited.
            if let Some(value) = self.get(key) {
                Ok(value)
            } else {
                let value = produce().await?;
                self.set(key, value.clone());
                Ok(value)
            }
        };

        // Drop the flight entry once nobody else is waiting on it
        // (two refs: ours and the map's).
        {
            let mut flights = self.flights.lock();
            if Arc::strong_count(&flight) <= 2 {
                flights.remove(key);
            }
        }

        result
    }

    pub fn stats(&self) -> NamespaceStats {
        let state = self.state.lock();
        NamespaceStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            entries: state.entries.len(),
        }
    }
}

/// Aggregated stats across namespaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub pane_content: NamespaceStats,
    pub agent_status: NamespaceStats,
    pub session_info: NamespaceStats,
    pub config: NamespaceStats,
}

/// The monitor's cache namespaces with their independent TTLs.
pub struct LayeredCache {
    pub pane_content: TtlCache<PaneSnapshot>,
    pub agent_status: TtlCache<HealthStatus>,
    pub session_info: TtlCache<Vec<WindowInfo>>,
    pub config: TtlCache<serde_json::Value>,
}

impl LayeredCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            pane_content: TtlCache::new(config.pane_content),
            agent_status: TtlCache::new(config.agent_status),
            session_info: TtlCache::new(config.session_info),
            config: TtlCache::new(config.config),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            pane_content: self.pane_content.stats(),
            agent_status: self.agent_status.stats(),
            session_info: self.session_info.stats(),
            config: self.config.stats(),
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
