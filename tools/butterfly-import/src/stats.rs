//! Progress counters shared by readers and writers

use std::sync::atomic::{AtomicU64, Ordering};

use butterfly_common::EntityKind;

/// Progress contract: called once per element taken off a queue.
pub trait Progress: Send + Sync {
    fn add_processed(&self, kind: EntityKind, count: u64);
}

/// Lock-free per-kind counters
#[derive(Debug, Default)]
pub struct Statistics {
    nodes: AtomicU64,
    ways: AtomicU64,
    relations: AtomicU64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed(&self, kind: EntityKind) -> u64 {
        self.counter(kind).load(Ordering::Relaxed)
    }

    fn counter(&self, kind: EntityKind) -> &AtomicU64 {
        match kind {
            EntityKind::Node => &self.nodes,
            EntityKind::Way => &self.ways,
            EntityKind::Relation => &self.relations,
        }
    }
}

impl Progress for Statistics {
    fn add_processed(&self, kind: EntityKind, count: u64) {
        self.counter(kind).fetch_add(count, Ordering::Relaxed);
    }
}
