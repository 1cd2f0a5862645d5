//! Read-only query operations
//!
//! Point lookup and paginated listing over the local index. Reads bypass
//! replication entirely; a single list scan holds the index read lock so
//! it observes a consistent snapshot.

use mupdb_core::{ListFilter, MupdbError, Result, UploadId, UploadInfo};

use crate::MetaPartition;

impl MetaPartition {
    /// Full record for one upload, parts in ascending part-id order
    pub fn get_upload(&self, id: &UploadId) -> Result<UploadInfo> {
        self.index
            .get(id)
            .map(|upload| UploadInfo::from(&upload))
            .ok_or_else(|| MupdbError::UploadNotFound(id.to_string()))
    }

    /// Up to `filter.max` upload summaries in ascending id order.
    ///
    /// The scan starts at `id_marker` (inclusive) when set. Entries whose
    /// key sorts below `key_marker`, or whose key lacks `prefix`, are
    /// skipped without counting toward `max`. Result order is id order,
    /// not key order.
    pub fn list_uploads(&self, filter: &ListFilter) -> Vec<UploadInfo> {
        let start = if filter.id_marker.is_empty() {
            None
        } else {
            Some(UploadId::from(filter.id_marker.as_str()))
        };

        let mut matches = Vec::new();
        self.index.scan_from(start.as_ref(), |upload| {
            if matches.len() >= filter.max {
                return false;
            }
            if !filter.key_marker.is_empty() && upload.key.as_str() < filter.key_marker.as_str() {
                return true;
            }
            if !filter.prefix.is_empty() && !upload.key.starts_with(&filter.prefix) {
                return true;
            }
            matches.push(UploadInfo::from(upload));
            matches.len() < filter.max
        });
        matches
    }
}
