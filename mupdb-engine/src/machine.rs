//! Multipart state machine
//!
//! Deterministic apply logic for committed commands. Every replica runs the
//! same command sequence through [`MultipartMachine::apply`] and converges
//! to an identical index: no clock reads, no randomness, nothing outside
//! the command payload feeds the mutation.

use std::sync::Arc;

use mupdb_core::{Applied, CommandTag, Result, Upload};

use crate::UploadIndex;

/// Applies committed multipart commands to the local ordered index
#[derive(Clone)]
pub struct MultipartMachine {
    index: Arc<UploadIndex>,
}

impl MultipartMachine {
    pub(crate) fn new(index: Arc<UploadIndex>) -> Self {
        MultipartMachine { index }
    }

    /// Apply one committed command.
    ///
    /// The payload is the record encoding of an [`Upload`]: a full record
    /// for create, id plus one part for append, id only for remove. A
    /// decode failure aborts the command with an encoding error; a missing
    /// upload on append is the `NotFound` status, not a fault.
    pub fn apply(&self, tag: CommandTag, payload: &[u8]) -> Result<Applied> {
        let mut record = Upload::from_bytes(payload)?;
        match tag {
            // Id collisions are a failure of the collision-resistant
            // generator; the record is overwritten rather than rejected,
            // since a reject path could not stay deterministic across
            // replicas that already diverged on the generator.
            CommandTag::CreateUpload => {
                self.index.insert(record);
                Ok(Applied::ok())
            }
            CommandTag::AppendPart => {
                let parts = std::mem::take(&mut record.parts);
                let found = self.index.update(&record.id, |upload| {
                    for part in parts {
                        upload.insert_part(part);
                    }
                });
                if found {
                    Ok(Applied::ok())
                } else {
                    Ok(Applied::not_found())
                }
            }
            // Removing an absent upload succeeds: replicated commands may
            // be resubmitted after ambiguous outcomes and must apply twice
            // without erroring.
            CommandTag::RemoveUpload => {
                self.index.remove(&record.id);
                Ok(Applied::ok())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mupdb_core::{ApplyStatus, Part, UploadId};

    fn machine() -> (MultipartMachine, Arc<UploadIndex>) {
        let index = UploadIndex::new();
        (MultipartMachine::new(index.clone()), index)
    }

    fn part(id: u16, size: u64) -> Part {
        Part {
            id,
            inode: 42,
            md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            size,
            upload_time: 1_700_000_000,
        }
    }

    #[test]
    fn test_create_inserts_empty_upload() {
        let (machine, index) = machine();
        let record = Upload::new(UploadId::from("a1"), "/x/y", 7);

        let applied = machine
            .apply(CommandTag::CreateUpload, &record.to_bytes().unwrap())
            .unwrap();
        assert_eq!(applied.status, ApplyStatus::Ok);

        let stored = index.get(&UploadId::from("a1")).unwrap();
        assert!(stored.parts().is_empty());
        assert_eq!(stored.key, "/x/y");
        assert_eq!(stored.init_time, 7);
    }

    #[test]
    fn test_append_to_missing_upload_is_not_found() {
        let (machine, index) = machine();
        let record = Upload::append_record(UploadId::from("zzz"), part(1, 10));

        let applied = machine
            .apply(CommandTag::AppendPart, &record.to_bytes().unwrap())
            .unwrap();
        assert_eq!(applied.status, ApplyStatus::NotFound);
        assert!(index.is_empty());
    }

    #[test]
    fn test_apply_rejects_undecodable_payload() {
        let (machine, _) = machine();
        assert!(machine.apply(CommandTag::CreateUpload, b"{bad").is_err());
    }
}
