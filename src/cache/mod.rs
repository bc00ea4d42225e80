//! Ephemeral content cache: one TTL-bounded cell per content key.
//!
//! The TTL is renewed on write, never on read: a cell lives at most one TTL
//! past its most recent `put`. Each key has its own async lock, so `put`,
//! `get` and eviction for one key never interleave, while different keys only
//! share the brief map lookup. Every `put` arms its own eviction timer tagged
//! with a deadline generation; a timer that wakes after a later `put` finds a
//! newer generation and does nothing.

pub mod memory;
pub mod sqlite;

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cancellation::{DeadlineGeneration, DeadlineGuard};
use crate::dialog::ContentKey;
use crate::error::WorkflowError;
use crate::metrics::{metric_names, MetricsRegistry};

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Storage under the cells. `write` must be atomic: on error the previously
/// stored value is left as it was.
pub trait CellBackend: Send + Sync {
    fn write(&self, key: &ContentKey, value: &str, ttl: Duration) -> Result<(), WorkflowError>;
    fn read(&self, key: &ContentKey) -> Result<Option<String>, WorkflowError>;
    fn remove(&self, key: &ContentKey) -> Result<(), WorkflowError>;
}

/// Per-key bookkeeping. The value itself lives in the backend.
#[derive(Debug, Default)]
struct Cell {
    /// Some while the cell holds a value.
    deadline: Option<Instant>,
    timer: DeadlineGeneration,
}

type SlotRef = Arc<AsyncMutex<Cell>>;

struct Inner {
    slots: Mutex<HashMap<ContentKey, SlotRef>>,
    backend: Arc<dyn CellBackend>,
    default_ttl: Duration,
    metrics: Arc<MetricsRegistry>,
}

/// Cloneable handle; clones share the same cells.
#[derive(Clone)]
pub struct EphemeralCache {
    inner: Arc<Inner>,
}

impl EphemeralCache {
    pub fn new(
        backend: Arc<dyn CellBackend>,
        default_ttl: Duration,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                backend,
                default_ttl,
                metrics,
            }),
        }
    }

    /// Memory-backed cache with its own metrics registry.
    pub fn in_memory(default_ttl: Duration) -> Self {
        Self::new(
            Arc::new(MemoryBackend::new()),
            default_ttl,
            Arc::new(MetricsRegistry::new()),
        )
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Create or replace the cell for `key` and re-arm its deadline at
    /// `now + ttl`. On a backend fault, or a TTL past the clock's range, the
    /// previous cell and deadline are kept.
    pub async fn put(&self, key: &ContentKey, value: &str, ttl: Duration) -> Result<(), WorkflowError> {
        let span = self.inner.metrics.span(metric_names::CACHE_PUT);
        let Some(deadline) = Instant::now().checked_add(ttl) else {
            warn!(key = %key, ttl_secs = ttl.as_secs(), "cache_ttl_out_of_range");
            return Err(WorkflowError::StorageFault(format!("ttl of {}s is out of range", ttl.as_secs())));
        };
        let slot = self.inner.slot(key);
        let mut cell = slot.lock().await;

        if let Err(e) = self.inner.backend.write(key, value, ttl) {
            warn!(key = %key, error = %e, "cache_put_failed");
            drop(cell);
            self.inner.release_if_idle(key, &slot);
            return Err(e);
        }

        let guard = cell.timer.cancel_and_advance();
        cell.deadline = Some(deadline);
        debug!(
            key = %key,
            generation = guard.generation(),
            ttl_ms = ttl.as_millis() as u64,
            "cache_put"
        );
        spawn_eviction(Arc::downgrade(&self.inner), key.clone(), deadline, guard);
        drop(cell);

        span.finish();
        Ok(())
    }

    /// `put` with the configured TTL.
    pub async fn put_default(&self, key: &ContentKey, value: &str) -> Result<(), WorkflowError> {
        self.put(key, value, self.inner.default_ttl).await
    }

    /// Live value for `key`, or None if never set or past its deadline.
    /// Reads never extend the deadline.
    pub async fn get(&self, key: &ContentKey) -> Result<Option<String>, WorkflowError> {
        let span = self.inner.metrics.span(metric_names::CACHE_GET);
        let Some(slot) = self.inner.existing(key) else {
            span.finish();
            return Ok(None);
        };
        let mut cell = slot.lock().await;

        let result = match cell.deadline {
            None => Ok(None),
            Some(deadline) if Instant::now() >= deadline => {
                // The timer may not have run yet; the deadline is authoritative.
                // A failed backend removal is logged; the content is gone either way.
                let _ = self.inner.clear_cell(key, &mut cell, "expired_on_read");
                Ok(None)
            }
            Some(_) => self.inner.backend.read(key),
        };
        drop(cell);
        self.inner.release_if_idle(key, &slot);

        span.finish();
        result
    }

    /// Remove the cell now and disarm its timer.
    pub async fn clear(&self, key: &ContentKey) -> Result<(), WorkflowError> {
        let Some(slot) = self.inner.existing(key) else {
            return Ok(());
        };
        let mut cell = slot.lock().await;
        let result = if cell.deadline.is_some() {
            self.inner.clear_cell(key, &mut cell, "cleared")
        } else {
            Ok(())
        };
        drop(cell);
        self.inner.release_if_idle(key, &slot);
        result
    }

    /// Number of keys with a tracked slot.
    pub fn tracked_keys(&self) -> usize {
        self.inner.slots.lock().len()
    }
}

impl Inner {
    fn slot(&self, key: &ContentKey) -> SlotRef {
        Arc::clone(self.slots.lock().entry(key.clone()).or_default())
    }

    fn existing(&self, key: &ContentKey) -> Option<SlotRef> {
        self.slots.lock().get(key).cloned()
    }

    /// Drop the map entry for `key` once its cell is empty and nobody else
    /// holds the slot. Callers must have released the cell lock.
    fn release_if_idle(&self, key: &ContentKey, slot: &SlotRef) {
        let mut slots = self.slots.lock();
        let Some(current) = slots.get(key) else {
            return;
        };
        // Map + caller. Any other holder may still write into this slot.
        if !Arc::ptr_eq(current, slot) || Arc::strong_count(slot) > 2 {
            return;
        }
        let vacant = slot
            .try_lock()
            .map(|cell| cell.deadline.is_none())
            .unwrap_or(false);
        if vacant {
            slots.remove(key);
        }
    }

    /// Empty the cell. The cell is vacant afterwards even if the backend
    /// removal fails; the orphaned row is unreachable and is purged later.
    fn clear_cell(&self, key: &ContentKey, cell: &mut Cell, reason: &'static str) -> Result<(), WorkflowError> {
        cell.timer.cancel();
        cell.deadline = None;
        self.metrics.increment(metric_names::CACHE_EVICTIONS);
        info!(key = %key, reason, "cache_evicted");
        self.backend.remove(key).inspect_err(|e| {
            warn!(key = %key, error = %e, "cache_remove_failed");
        })
    }

    /// Timer-driven eviction. No-op if a later write superseded `generation`.
    async fn evict(&self, key: &ContentKey, generation: u64) {
        let Some(slot) = self.existing(key) else {
            return;
        };
        let mut cell = slot.lock().await;
        if !cell.timer.is_current(generation) {
            debug!(
                key = %key,
                generation,
                current = cell.timer.current_generation(),
                "eviction_superseded"
            );
            return;
        }
        let _ = self.clear_cell(key, &mut cell, "ttl_elapsed");
        drop(cell);
        self.release_if_idle(key, &slot);
    }
}

fn spawn_eviction(inner: Weak<Inner>, key: ContentKey, deadline: Instant, guard: DeadlineGuard) {
    tokio::spawn(async move {
        tokio::select! {
            _ = guard.token().cancelled() => {}
            _ = tokio::time::sleep_until(deadline) => {
                if guard.is_cancelled() {
                    return;
                }
                if let Some(inner) = inner.upgrade() {
                    inner.evict(&key, guard.generation()).await;
                }
            }
        }
    });
}
