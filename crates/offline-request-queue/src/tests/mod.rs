//! Scenario tests for the offline outbox.
//!
//! - `persistence.rs` - queue survives restarts, corrupt state, write failures
//! - `replay.rs`      - FIFO order and existence-probe deduplication
//! - `failures.rs`    - stop-on-failure and reachability loss mid-drain
//! - `concurrency.rs` - single drain pass, submits during a drain
//! - `end_to_end.rs`  - real HTTP transport against a mock server


mod replay;

use crate::{DrainOutcome, RequestMethod, RequestRecord, Submission};
use harness::{open_outbox, persisted, ScriptedTransport};
use outbox_storage::MemoryKeyValueStore;
use reachability_monitor::ReachabilityMonitor;
use serde_json::json;
use std::sync::Arc;

/// Offline submit, reconnect, manual drain.
#[tokio::test]
async fn basic_workflow() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let transport = Arc::new(ScriptedTransport::new());
    let monitor = Arc::new(ReachabilityMonitor::new(false));
    let outbox = open_outbox(store.clone(), transport.clone(), monitor.clone());

    let submission = outbox
        .submit(
            RequestRecord::new(RequestMethod::Post, "https://api.test/users")
                .with_payload(json!({"username": "ada"}))
                .with_object_hint("ada"),
        )
        .await
        .unwrap();
    assert_eq!(submission, Submission::Queued { position: 0 });
    assert_eq!(persisted(&*store).len(), 1);

    monitor.report(true);
    let DrainOutcome::Completed(report) = outbox.drain_now().await else {
        panic!("drain should run");
    };

    assert_eq!(report.sent, 1);
    assert_eq!(report.remaining, 0);
    assert!(persisted(&*store).is_empty());
    assert_eq!(transport.writes().len(), 1);
}
