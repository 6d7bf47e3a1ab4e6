//! The access controller under concurrent reads and writes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use hyfocus_core::{AccessController, SessionFlags};

const SET_A: [i64; 3] = [1, 2, 3];
const SET_B: [i64; 3] = [4, 5, 6];

#[test]
fn test_block_decisions_never_observe_torn_sets() {
    let flags = SessionFlags::new();
    flags.set_session_active(true);
    let acl = Arc::new(AccessController::new(flags));
    acl.set_allowed_workspaces(SET_A);

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let acl = Arc::clone(&acl);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut flip = false;
            while !done.load(Ordering::SeqCst) {
                if flip {
                    acl.set_allowed_workspaces(SET_A);
                } else {
                    acl.set_allowed_workspaces(SET_B);
                }
                flip = !flip;
            }
        })
    };

    let readers: Vec<_> = (0..10)
        .map(|_| {
            let acl = Arc::clone(&acl);
            thread::spawn(move || {
                for _ in 0..100 {
                    // Workspace 7 is never allowed, whatever set is current.
                    assert!(acl.should_block_switch(7));

                    // A snapshot is always exactly one of the two sets.
                    let snapshot = acl.allowed_workspaces();
                    assert!(
                        snapshot == SET_A || snapshot == SET_B,
                        "torn read: {snapshot:?}"
                    );

                    // Negative ids are always allowed.
                    assert!(!acl.should_block_switch(-98));
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    writer.join().unwrap();
}
