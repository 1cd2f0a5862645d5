//! Command submission gateway
//!
//! Translates mutating requests into replicated commands: builds the
//! minimal record payload, serializes it, submits through the replication
//! channel, and maps the tagged apply result back to the caller. The
//! gateway never touches the index itself; all mutation happens in the
//! state machine on the replica.

use mupdb_core::{
    ApplyStatus, CommandTag, MupdbError, Part, Result, Upload, UploadId, UploadIdGenerator,
};

use crate::ReplicationChannel;

/// Submits multipart commands over a replication channel
pub struct CommandGateway<C: ReplicationChannel> {
    channel: C,
    idgen: UploadIdGenerator,
}

impl<C: ReplicationChannel> CommandGateway<C> {
    pub fn new(channel: C) -> Self {
        Self::with_id_generator(channel, UploadIdGenerator::from_entropy())
    }

    pub fn with_id_generator(channel: C, idgen: UploadIdGenerator) -> Self {
        CommandGateway { channel, idgen }
    }

    /// Create a new upload targeting `path`, returning the minted id.
    ///
    /// The id and `init_time` are decided here, once, and carried in the
    /// command payload; the apply step only consumes them.
    pub fn create_upload(&self, path: &str, init_time: i64) -> Result<UploadId> {
        let id = self.idgen.next_id();
        let record = Upload::new(id.clone(), path, init_time);
        self.channel
            .submit(CommandTag::CreateUpload, record.to_bytes()?)?;
        Ok(id)
    }

    /// Record one part against an existing upload
    pub fn append_part(&self, id: &UploadId, part: Part) -> Result<()> {
        let record = Upload::append_record(id.clone(), part);
        let applied = self
            .channel
            .submit(CommandTag::AppendPart, record.to_bytes()?)?;
        match applied.status {
            ApplyStatus::Ok => Ok(()),
            ApplyStatus::NotFound => Err(MupdbError::UploadNotFound(id.to_string())),
        }
    }

    /// Remove an upload. Idempotent: removing an absent upload succeeds.
    pub fn remove_upload(&self, id: &UploadId) -> Result<()> {
        let record = Upload::new(id.clone(), "", 0);
        self.channel
            .submit(CommandTag::RemoveUpload, record.to_bytes()?)?;
        Ok(())
    }
}
