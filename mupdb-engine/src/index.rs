//! Ordered upload index
//!
//! A sorted associative container mapping upload id to its record, shared
//! between the apply path (exclusive writer) and concurrent readers. The
//! underlying `BTreeMap` is the ordered-map primitive; this wrapper pins
//! down the locking contract: scans hold the read lock for their whole
//! duration so a single scan observes a consistent snapshot, and the apply
//! path takes the write lock so no two commands mutate concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;

use mupdb_core::{Upload, UploadId};
use parking_lot::RwLock;

/// Shared in-memory index keyed by upload id, ascending lexicographic order
#[derive(Default)]
pub struct UploadIndex {
    inner: RwLock<BTreeMap<UploadId, Upload>>,
}

impl UploadIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(UploadIndex::default())
    }

    /// Point lookup, returning a clone of the record
    pub fn get(&self, id: &UploadId) -> Option<Upload> {
        self.inner.read().get(id).cloned()
    }

    /// Insert or replace the record keyed by its id
    pub fn insert(&self, upload: Upload) {
        self.inner.write().insert(upload.id.clone(), upload);
    }

    /// Delete the record; returns whether it was present
    pub fn remove(&self, id: &UploadId) -> bool {
        self.inner.write().remove(id).is_some()
    }

    /// Mutate the record in place under the write lock; returns whether it
    /// was present (absent means nothing was mutated)
    pub fn update<F>(&self, id: &UploadId, mutate: F) -> bool
    where
        F: FnOnce(&mut Upload),
    {
        match self.inner.write().get_mut(id) {
            Some(upload) => {
                mutate(upload);
                true
            }
            None => false,
        }
    }

    /// Ascending scan, starting at `start` (inclusive) when given.
    ///
    /// `visit` returns `false` to stop early. The read lock is held for the
    /// whole scan.
    pub fn scan_from<F>(&self, start: Option<&UploadId>, mut visit: F)
    where
        F: FnMut(&Upload) -> bool,
    {
        let guard = self.inner.read();
        let entries: Box<dyn Iterator<Item = (&UploadId, &Upload)>> = match start {
            Some(from) => Box::new(guard.range(from.clone()..)),
            None => Box::new(guard.iter()),
        };
        for (_, upload) in entries {
            if !visit(upload) {
                break;
            }
        }
    }

    /// Number of tracked uploads
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
