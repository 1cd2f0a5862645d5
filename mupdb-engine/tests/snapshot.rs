//! Integration tests for snapshot persistence and restore

use mupdb_core::*;
use mupdb_engine::*;

fn part(id: u16) -> Part {
    Part {
        id,
        inode: id as u64,
        md5: format!("{:032x}", id),
        size: 1024,
        upload_time: 300,
    }
}

#[test]
fn snapshot_then_reopen_restores_identical_index() {
    let temp = tempfile::tempdir().unwrap();

    let before = {
        let partition = MetaPartition::open(temp.path()).unwrap();
        let gateway = partition.gateway();

        let id1 = gateway.create_upload("/a/b", 11).unwrap();
        let id2 = gateway.create_upload("/c/d", 22).unwrap();
        gateway.append_part(&id1, part(1)).unwrap();
        gateway.append_part(&id1, part(2)).unwrap();
        gateway.remove_upload(&id2).unwrap();

        partition.snapshot().unwrap();
        partition.list_uploads(&ListFilter {
            max: usize::MAX,
            ..Default::default()
        })
        // partition dropped here; fjall releases the directory lock
    };

    let reopened = MetaPartition::open(temp.path()).unwrap();
    let after = reopened.list_uploads(&ListFilter {
        max: usize::MAX,
        ..Default::default()
    });

    assert_eq!(after, before);
    assert_eq!(reopened.upload_count(), 1);
    assert_eq!(after[0].parts.len(), 2);
}

#[test]
fn snapshot_drops_records_removed_since_last_snapshot() {
    let temp = tempfile::tempdir().unwrap();

    {
        let partition = MetaPartition::open(temp.path()).unwrap();
        let gateway = partition.gateway();

        let id = gateway.create_upload("/gone", 1).unwrap();
        gateway.create_upload("/kept", 2).unwrap();
        partition.snapshot().unwrap();

        gateway.remove_upload(&id).unwrap();
        partition.snapshot().unwrap();
    }

    let reopened = MetaPartition::open(temp.path()).unwrap();
    assert_eq!(reopened.upload_count(), 1);
    let page = reopened.list_uploads(&ListFilter {
        max: 10,
        ..Default::default()
    });
    assert_eq!(page[0].path, "/kept");
}

#[test]
fn concurrent_snapshots_reopen_to_the_final_index_state() {
    // Two threads create, remove, and snapshot against the same partition.
    // A stale capture re-inserted over a newer snapshot's delete would
    // resurrect a removed upload (or drop a live one) on reopen.
    let temp = tempfile::tempdir().unwrap();

    let final_state = {
        let partition = MetaPartition::open(temp.path()).unwrap();

        let mut handles = Vec::new();
        for thread in 0..2 {
            let partition = partition.clone();
            handles.push(std::thread::spawn(move || {
                let gateway = partition.gateway();
                for i in 0..20 {
                    let id = gateway
                        .create_upload(&format!("/t{}/{}", thread, i), i)
                        .unwrap();
                    partition.snapshot().unwrap();
                    if i % 2 == 0 {
                        gateway.remove_upload(&id).unwrap();
                        partition.snapshot().unwrap();
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        partition.snapshot().unwrap();
        partition.list_uploads(&ListFilter {
            max: usize::MAX,
            ..Default::default()
        })
    };
    assert_eq!(final_state.len(), 20);

    let reopened = MetaPartition::open(temp.path()).unwrap();
    let after = reopened.list_uploads(&ListFilter {
        max: usize::MAX,
        ..Default::default()
    });
    assert_eq!(after, final_state);
}

#[test]
fn snapshot_of_empty_index_reopens_empty() {
    let temp = tempfile::tempdir().unwrap();

    {
        let partition = MetaPartition::open(temp.path()).unwrap();
        partition.snapshot().unwrap();
    }

    let reopened = MetaPartition::open(temp.path()).unwrap();
    assert_eq!(reopened.upload_count(), 0);
}
