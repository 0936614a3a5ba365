//! In-flight production registry.
//!
//! Tracks which video identifiers currently have an active
//! download/transcode, guaranteeing at most one producer per identifier.
//! Losers are answered immediately rather than queued behind the active
//! producer; they retry after production completes.

use std::sync::Arc;

use dashmap::DashSet;

use crate::storage::VideoId;

/// Concurrent set of identifiers with an active producer.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    inner: Arc<DashSet<VideoId>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `id` for production.
    ///
    /// Returns `None` when another producer already owns the identifier.
    /// The returned guard releases the slot when dropped, on every exit
    /// path including unwinding.
    pub fn try_acquire(&self, id: &VideoId) -> Option<InFlightGuard> {
        if self.inner.insert(id.clone()) {
            Some(InFlightGuard {
                registry: Arc::clone(&self.inner),
                id: id.clone(),
            })
        } else {
            None
        }
    }

    /// Whether `id` currently has an active producer.
    pub fn contains(&self, id: &VideoId) -> bool {
        self.inner.contains(id)
    }
}

/// Ownership of a registry slot. Dropping releases the slot.
pub struct InFlightGuard {
    registry: Arc<DashSet<VideoId>>,
    id: VideoId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
