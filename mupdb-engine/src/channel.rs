//! Replication channel seam
//!
//! The consensus engine that orders and durably commits commands lives
//! outside this crate; [`ReplicationChannel`] is the seam it plugs into.
//! `submit` blocks until the command has been applied to the local index
//! and yields the tagged apply result. Channel failures surface as
//! `MupdbError::Replication` with no local retry.

use mupdb_core::{Applied, CommandTag, Result};
use parking_lot::Mutex;

use crate::MultipartMachine;

/// Orders and commits commands, then reports the local apply result
pub trait ReplicationChannel: Send + Sync {
    /// Submit a command and block until it has been applied locally.
    ///
    /// Once submitted a command cannot be withdrawn; commit order is
    /// immutable.
    fn submit(&self, tag: CommandTag, payload: Vec<u8>) -> Result<Applied>;
}

/// Single-replica channel that commits in process.
///
/// Commands are applied immediately in submission order; the mutex fixes
/// the commit order so applies never interleave, matching the total order
/// a real replication engine would impose.
pub struct LocalChannel {
    machine: MultipartMachine,
    commit_order: Mutex<()>,
}

impl LocalChannel {
    pub fn new(machine: MultipartMachine) -> Self {
        LocalChannel {
            machine,
            commit_order: Mutex::new(()),
        }
    }
}

impl ReplicationChannel for LocalChannel {
    fn submit(&self, tag: CommandTag, payload: Vec<u8>) -> Result<Applied> {
        let _commit = self.commit_order.lock();
        self.machine.apply(tag, &payload)
    }
}
