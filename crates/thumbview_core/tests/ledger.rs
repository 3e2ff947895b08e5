use std::sync::{Arc, Barrier};
use std::thread;

use thumbview_core::{Epoch, PendingLedger, ThumbStatus};

fn init_logging() {
    thumbview_logging::initialize_for_tests();
}

#[test]
fn claim_is_refused_while_pending_or_ready() {
    init_logging();
    let ledger = PendingLedger::new();

    let epoch = ledger.try_claim("a", ThumbStatus::Pending).expect("first claim");
    assert_eq!(ledger.try_claim("a", ThumbStatus::Generating), None);
    assert_eq!(ledger.try_claim("b", ThumbStatus::Ready), None);
    assert!(!ledger.is_pending("b"));

    assert!(ledger.release("a", epoch));
    assert_eq!(ledger.try_claim("a", ThumbStatus::Failed), Some(epoch));
}

#[test]
fn first_claim_marks_updates_in_progress() {
    init_logging();
    let ledger = PendingLedger::new();
    assert!(ledger.is_stopped());

    let epoch = ledger.try_claim("a", ThumbStatus::Pending).unwrap();
    assert!(!ledger.is_stopped());
    assert!(ledger.is_current(epoch));
}

#[test]
fn stop_sweeps_claims_and_bumps_epoch() {
    init_logging();
    let ledger = PendingLedger::new();
    let old = ledger.try_claim("a", ThumbStatus::Pending).unwrap();
    ledger.try_claim("b", ThumbStatus::Pending).unwrap();

    let new = ledger.stop();
    assert_eq!(new, Epoch(old.0 + 1));
    assert_eq!(ledger.pending_len(), 0);
    assert!(ledger.is_stopped());
    assert!(!ledger.is_current(old));
    assert!(!ledger.is_current(new));

    // Late release from the old epoch must not disturb a fresh claim.
    let fresh = ledger.try_claim("a", ThumbStatus::Generating).unwrap();
    assert!(!ledger.release("a", old));
    assert!(ledger.is_pending("a"));
    assert!(ledger.release("a", fresh));
    assert_eq!(ledger.pending_len(), 0);
}

#[test]
fn start_reenables_without_claiming() {
    let ledger = PendingLedger::new();
    let epoch = ledger.stop();
    ledger.start();
    assert!(ledger.is_current(epoch));
    assert_eq!(ledger.snapshot().pending.len(), 0);
}

#[test]
fn rejecting_the_only_claim_leaves_updates_stopped() {
    let ledger = PendingLedger::new();
    let epoch = ledger.try_claim("a", ThumbStatus::Pending).unwrap();
    assert!(ledger.reject("a", epoch));
    assert!(ledger.is_stopped());
    assert_eq!(ledger.current_epoch(), epoch);
    assert_eq!(ledger.pending_len(), 0);
}

#[test]
fn rejecting_one_of_several_claims_keeps_updates_running() {
    let ledger = PendingLedger::new();
    let epoch = ledger.try_claim("a", ThumbStatus::Pending).unwrap();
    ledger.try_claim("b", ThumbStatus::Pending).unwrap();
    assert!(ledger.reject("b", epoch));
    assert!(!ledger.is_stopped());
    assert!(ledger.is_current(epoch));

    // A stale rejection is ignored like a stale release.
    let new = ledger.stop();
    assert!(!ledger.reject("a", epoch));
    assert_eq!(ledger.current_epoch(), new);
}

#[test]
#[should_panic(expected = "released twice")]
fn double_release_is_fatal() {
    let ledger = PendingLedger::new();
    let epoch = ledger.try_claim("a", ThumbStatus::Pending).unwrap();
    ledger.release("a", epoch);
    ledger.release("a", epoch);
}

#[test]
fn racing_claims_grant_each_uid_once() {
    init_logging();
    let ledger = Arc::new(PendingLedger::new());
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let ledger = ledger.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                (0..200)
                    .filter(|i| {
                        ledger
                            .try_claim(&format!("item-{i}"), ThumbStatus::Pending)
                            .is_some()
                    })
                    .count()
            })
        })
        .collect();

    let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(granted, 200);
    assert_eq!(ledger.pending_len(), 200);
}
