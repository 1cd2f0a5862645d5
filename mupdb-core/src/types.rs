//! Core data types for mupdb

use serde::{Deserialize, Serialize};

/// Opaque multipart upload identifier.
///
/// Assigned at creation, immutable thereafter. Orders lexicographically over
/// its byte representation; this order is the index's total order and the
/// externally observable pagination order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UploadId(String);

impl UploadId {
    pub fn new(id: impl Into<String>) -> Self {
        UploadId(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UploadId {
    fn from(s: &str) -> Self {
        UploadId(s.to_string())
    }
}

/// One chunk of an upload's content.
///
/// `id` is the caller-assigned sequence number, unique within its parent
/// upload. `inode` is a non-owning reference to the stored content unit;
/// the referenced content's lifecycle is managed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: u16,
    pub inode: u64,
    pub md5: String,
    pub size: u64,
    pub upload_time: i64,
}

/// A tracked in-progress multipart upload.
///
/// `parts` is kept sorted ascending by part id with at most one part per id;
/// [`Upload::insert_part`] preserves that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub id: UploadId,
    pub key: String,
    pub init_time: i64,
    pub parts: Vec<Part>,
}

impl Upload {
    /// Create a new upload with no parts
    pub fn new(id: UploadId, key: impl Into<String>, init_time: i64) -> Self {
        Upload {
            id,
            key: key.into(),
            init_time,
            parts: Vec::new(),
        }
    }

    /// Build the partial record carrying just enough to apply an append:
    /// the upload id plus exactly one part.
    pub fn append_record(id: UploadId, part: Part) -> Self {
        Upload {
            id,
            key: String::new(),
            init_time: 0,
            parts: vec![part],
        }
    }

    /// Insert or replace a part, keyed by part id.
    ///
    /// Re-inserting an existing id replaces the prior part (last-write-wins
    /// merge, not an error). Ascending order by id is maintained.
    pub fn insert_part(&mut self, part: Part) {
        match self.parts.binary_search_by_key(&part.id, |p| p.id) {
            Ok(pos) => self.parts[pos] = part,
            Err(pos) => self.parts.insert(pos, part),
        }
    }

    /// Look up a part by id
    pub fn part(&self, id: u16) -> Option<&Part> {
        self.parts
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|pos| &self.parts[pos])
    }

    /// Parts in ascending id order
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Serialize to the durable record encoding.
    ///
    /// Used both as the replication payload and as the snapshot value
    /// format. Deterministic; exact inverse of [`Upload::from_bytes`].
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(crate::MupdbError::Encoding)
    }

    /// Deserialize from the durable record encoding
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(bytes).map_err(crate::MupdbError::Encoding)
    }
}

/// Operation tag identifying a replicated command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandTag {
    CreateUpload,
    AppendPart,
    RemoveUpload,
}

/// Outcome status of applying a committed command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStatus {
    Ok,
    NotFound,
}

/// Tagged result of the apply step, returned through the replication
/// channel without any runtime type assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub status: ApplyStatus,
}

impl Applied {
    pub fn ok() -> Self {
        Applied {
            status: ApplyStatus::Ok,
        }
    }

    pub fn not_found() -> Self {
        Applied {
            status: ApplyStatus::NotFound,
        }
    }
}

/// Part summary as exposed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInfo {
    pub id: u16,
    pub inode: u64,
    pub md5: String,
    pub size: u64,
    pub upload_time: i64,
}

impl From<&Part> for PartInfo {
    fn from(part: &Part) -> Self {
        PartInfo {
            id: part.id,
            inode: part.inode,
            md5: part.md5.clone(),
            size: part.size,
            upload_time: part.upload_time,
        }
    }
}

impl From<PartInfo> for Part {
    fn from(info: PartInfo) -> Self {
        Part {
            id: info.id,
            inode: info.inode,
            md5: info.md5,
            size: info.size,
            upload_time: info.upload_time,
        }
    }
}

/// Upload summary returned by the query operations: the full record with
/// its parts in ascending part-id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadInfo {
    pub id: String,
    pub path: String,
    pub init_time: i64,
    pub parts: Vec<PartInfo>,
}

impl From<&Upload> for UploadInfo {
    fn from(upload: &Upload) -> Self {
        UploadInfo {
            id: upload.id.to_string(),
            path: upload.key.clone(),
            init_time: upload.init_time,
            parts: upload.parts.iter().map(PartInfo::from).collect(),
        }
    }
}

/// Create request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUploadRequest {
    pub path: String,
}

/// Create response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUploadResponse {
    pub id: String,
    pub path: String,
}

/// List request payload.
///
/// Doubles as the query service's filter: scan starts at `id_marker`
/// (inclusive) when non-empty, entries with `key < key_marker` or a key not
/// starting with `prefix` are skipped, and at most `max` summaries return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFilter {
    pub prefix: String,
    pub key_marker: String,
    pub id_marker: String,
    pub max: usize,
}

/// List response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUploadsResponse {
    pub uploads: Vec<UploadInfo>,
}
