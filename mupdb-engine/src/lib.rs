//! Replicated multipart-upload index engine
//!
//! One metadata partition's multipart slice: the in-memory ordered index,
//! the deterministic state machine that applies replicated commands to it,
//! the read-side query operations, the replication-channel seam, and a
//! fjall-backed snapshot of the index for restarts.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use fjall::{Config, Keyspace, PartitionCreateOptions, PersistMode};
use mupdb_core::*;
use parking_lot::Mutex;

pub mod channel;
pub mod gateway;
pub mod index;
pub mod machine;
pub mod query;

pub use channel::*;
pub use gateway::*;
pub use index::*;
pub use machine::*;

/// Name of the fjall partition holding snapshotted upload records
const RECORDS_PARTITION: &str = "multipart";

/// One partition's multipart state: the shared index plus its snapshot
/// store. Cheap to clone; clones share the same index.
#[derive(Clone)]
pub struct MetaPartition {
    pub(crate) index: Arc<UploadIndex>,
    keyspace: Arc<Keyspace>,
    records: Arc<fjall::Partition>,
    snapshot_order: Arc<Mutex<()>>,
}

impl MetaPartition {
    /// Open the partition at the given path, restoring the index from the
    /// last snapshot if one exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let keyspace = Arc::new(
            Config::new(path)
                .open()
                .map_err(|e| MupdbError::Storage(e.to_string()))?,
        );
        let records = Arc::new(
            keyspace
                .open_partition(RECORDS_PARTITION, PartitionCreateOptions::default())
                .map_err(|e| MupdbError::Storage(e.to_string()))?,
        );

        let partition = MetaPartition {
            index: UploadIndex::new(),
            keyspace,
            records,
            snapshot_order: Arc::new(Mutex::new(())),
        };
        partition.restore()?;
        Ok(partition)
    }

    /// Temporary partition for testing
    #[cfg(any(test, feature = "test-utils"))]
    pub fn temp() -> Result<(Self, tempfile::TempDir)> {
        let temp_dir = tempfile::tempdir()?;
        let partition = Self::open(temp_dir.path())?;
        Ok((partition, temp_dir))
    }

    /// State machine bound to this partition's index
    pub fn machine(&self) -> MultipartMachine {
        MultipartMachine::new(self.index.clone())
    }

    /// Gateway over the in-process single-replica channel
    pub fn gateway(&self) -> CommandGateway<LocalChannel> {
        CommandGateway::new(LocalChannel::new(self.machine()))
    }

    /// Number of tracked uploads
    pub fn upload_count(&self) -> usize {
        self.index.len()
    }

    /// Persist the current index to the snapshot store.
    ///
    /// Writes every record (key = upload id bytes, value = record
    /// encoding), drops stored keys no longer in the index, and syncs.
    /// Snapshots are mutually exclusive end to end: an interleaved pair
    /// could otherwise re-insert a stale capture over the other's delete,
    /// resurrecting a removed upload on restart.
    pub fn snapshot(&self) -> Result<()> {
        let _snapshot = self.snapshot_order.lock();

        let mut uploads = Vec::with_capacity(self.index.len());
        self.index.scan_from(None, |upload| {
            uploads.push(upload.clone());
            true
        });

        let live: HashSet<Vec<u8>> = uploads
            .iter()
            .map(|u| u.id.as_str().as_bytes().to_vec())
            .collect();

        let mut stale = Vec::new();
        for item in self.records.range(Vec::<u8>::new()..) {
            let (key_bytes, _) = item.map_err(|e| MupdbError::Storage(e.to_string()))?;
            if !live.contains(&key_bytes[..]) {
                stale.push(key_bytes.to_vec());
            }
        }
        for key_bytes in stale {
            self.records
                .remove(key_bytes)
                .map_err(|e| MupdbError::Storage(e.to_string()))?;
        }

        for upload in &uploads {
            self.records
                .insert(upload.id.as_str(), upload.to_bytes()?)
                .map_err(|e| MupdbError::Storage(e.to_string()))?;
        }

        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(|e| MupdbError::Storage(e.to_string()))
    }

    /// Rebuild the index from the snapshot store. Decode failures abort the
    /// restore; a half-read snapshot must not pass for a complete one.
    fn restore(&self) -> Result<()> {
        for item in self.records.range(Vec::<u8>::new()..) {
            let (_, value) = item.map_err(|e| MupdbError::Storage(e.to_string()))?;
            let upload = Upload::from_bytes(&value)?;
            self.index.insert(upload);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_on_empty_dir_starts_empty() {
        let (partition, _temp) = MetaPartition::temp().unwrap();
        assert_eq!(partition.upload_count(), 0);
    }

    #[test]
    fn test_clones_share_the_index() {
        let (partition, _temp) = MetaPartition::temp().unwrap();
        let clone = partition.clone();

        partition
            .gateway()
            .create_upload("/shared", 1)
            .unwrap();
        assert_eq!(clone.upload_count(), 1);
    }
}
