//! Bounded asynchronous discovery cache.
//!
//! # Responsibilities
//! - Cache compiled single-module route tables by module id
//! - Deduplicate concurrent loads of the same module
//! - Bound memory by entry count and time-to-live
//!
//! # Design Decisions
//! - Each key owns a `OnceCell`; concurrent callers await the same init
//! - Failed loads are not cached; the next caller retries
//! - When full, expired entries go first, then the oldest entry

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::config::DiscoveryCacheConfig;
use crate::discovery::client::{DiscoveryError, DiscoverySource};
use crate::observability::metrics;
use crate::routing::table::RouteTable;

#[derive(Debug, Clone)]
struct CacheSlot {
    created: Instant,
    cell: Arc<OnceCell<Arc<RouteTable>>>,
}

impl CacheSlot {
    fn new(now: Instant) -> Self {
        Self {
            created: now,
            cell: Arc::new(OnceCell::new()),
        }
    }

    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.created) < ttl
    }
}

/// Module id → compiled route table of that module.
pub struct DiscoveryCache {
    entries: DashMap<String, CacheSlot>,
    source: Arc<dyn DiscoverySource>,
    max_entries: usize,
    ttl: Duration,
}

impl DiscoveryCache {
    pub fn new(source: Arc<dyn DiscoverySource>, config: &DiscoveryCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            source,
            max_entries: config.max_entries.max(1),
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }

    /// Return the cached table, loading it once if absent or expired.
    pub async fn get_or_load(&self, module_id: &str) -> Result<Arc<RouteTable>, DiscoveryError> {
        let cell = self.slot_for(module_id);
        if let Some(table) = cell.get() {
            metrics::record_discovery_lookup("hit");
            return Ok(Arc::clone(table));
        }

        let table = cell
            .get_or_try_init(|| async {
                metrics::record_discovery_lookup("miss");
                let discovery = self.source.fetch_discovery(module_id).await?;
                let table = RouteTable::from_discovery(&discovery, None)?;
                tracing::debug!(module_id = %module_id, entries = table.len(), "Loaded module discovery");
                Ok::<_, DiscoveryError>(Arc::new(table))
            })
            .await
            .inspect_err(|e| {
                metrics::record_discovery_lookup("error");
                tracing::warn!(module_id = %module_id, error = %e, "Module discovery load failed");
            })?;
        Ok(Arc::clone(table))
    }

    /// Drop a cached module, e.g. after a discovery change event.
    pub fn invalidate(&self, module_id: &str) {
        self.entries.remove(module_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn slot_for(&self, module_id: &str) -> Arc<OnceCell<Arc<RouteTable>>> {
        let now = Instant::now();
        // The read guard must be released before the map is modified.
        if let Some(slot) = self.entries.get(module_id) {
            if slot.is_fresh(now, self.ttl) {
                return Arc::clone(&slot.cell);
            }
        }

        if !self.entries.contains_key(module_id) && self.entries.len() >= self.max_entries {
            self.evict(now);
        }

        let ttl = self.ttl;
        let slot = self
            .entries
            .entry(module_id.to_string())
            .and_modify(|slot| {
                if !slot.is_fresh(now, ttl) {
                    *slot = CacheSlot::new(now);
                }
            })
            .or_insert_with(|| CacheSlot::new(now));
        Arc::clone(&slot.cell)
    }

    fn evict(&self, now: Instant) {
        let ttl = self.ttl;
        self.entries.retain(|_, slot| slot.is_fresh(now, ttl));

        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|slot| slot.created)
                .map(|slot| slot.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}
