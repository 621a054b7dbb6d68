//! Presence-only index of already inserted elements
//!
//! Used to skip elements a previous run (or another writer in this run)
//! has already materialised, e.g. ways consumed as relation members.

use std::path::Path;

use butterfly_common::{ElementRef, EntityKind, Member, Result};
use rocksdb::WriteBatch;

use crate::keys::encode_id;
use crate::store::{CacheOptions, Store};

pub struct ExistenceIndex {
    store: Store,
    kind: EntityKind,
}

impl ExistenceIndex {
    pub fn open<P: AsRef<Path>>(path: P, kind: EntityKind, options: &CacheOptions) -> Result<Self> {
        Ok(Self {
            store: Store::open(path, options)?,
            kind,
        })
    }

    /// Kind of element this index tracks
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Mark all references of the tracked kind in one atomic batch.
    /// References of other kinds are ignored; re-marking is a no-op.
    pub fn mark_batch<I>(&self, refs: I) -> Result<()>
    where
        I: IntoIterator<Item = ElementRef>,
    {
        let mut batch = WriteBatch::default();
        for element in refs {
            if element.kind == self.kind {
                batch.put(encode_id(element.id), b"");
            }
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.store.write(batch)
    }

    pub fn mark(&self, id: i64) -> Result<()> {
        self.mark_batch([ElementRef {
            kind: self.kind,
            id,
        }])
    }

    /// Mark the members of a relation that belong to the tracked kind
    pub fn mark_members(&self, members: &[Member]) -> Result<()> {
        self.mark_batch(members.iter().map(Member::element_ref))
    }

    /// Absence is a valid answer, not an error.
    pub fn contains(&self, id: i64) -> Result<bool> {
        Ok(self.store.get(&encode_id(id))?.is_some())
    }

    pub fn close(self) {
        drop(self);
    }
}
