//! Tests for replay order and existence-probe deduplication.

use super::harness::{open_outbox, persisted, Reply, ScriptedTransport};
use crate::{DrainOutcome, DrainReport, OfflineOutbox, RequestMethod, RequestRecord, StopReason};
use outbox_storage::{KeyValueStore, MemoryKeyValueStore};
use reachability_monitor::ReachabilityMonitor;
use std::sync::Arc;

struct Fixture {
    store: Arc<MemoryKeyValueStore>,
    transport: Arc<ScriptedTransport>,
    monitor: Arc<ReachabilityMonitor>,
    outbox: OfflineOutbox,
}

fn offline_fixture() -> Fixture {
    let store = Arc::new(MemoryKeyValueStore::new());
    let transport = Arc::new(ScriptedTransport::new());
    let monitor = Arc::new(ReachabilityMonitor::new(false));
    let outbox = open_outbox(store.clone(), transport.clone(), monitor.clone());
    Fixture {
        store,
        transport,
        monitor,
        outbox,
    }
}

impl Fixture {
    async fn queue(&self, record: RequestRecord) {
        self.outbox.submit(record).await.unwrap();
    }

    async fn reconnect_and_drain(&self) -> DrainReport {
        self.monitor.report(true);
        match self.outbox.drain_now().await {
            DrainOutcome::Completed(report) => report,
            DrainOutcome::AlreadyDraining => panic!("no other drain should be running"),
        }
    }
}

#[tokio::test]
async fn full_drain_preserves_fifo() {
    let fx = offline_fixture();
    let targets = [
        "https://api.test/users/1",
        "https://api.test/users/2",
        "https://api.test/users/3",
        "https://api.test/users/4",
    ];
    for target in targets {
        fx.queue(RequestRecord::new(RequestMethod::Put, target)).await;
    }

    let report = fx.reconnect_and_drain().await;

    assert_eq!(report.sent, 4);
    assert_eq!(report.stop, StopReason::Emptied);
    let sent: Vec<_> = fx.transport.writes().into_iter().map(|c| c.address).collect();
    assert_eq!(sent, targets);
    assert!(persisted(&*fx.store).is_empty());
}

#[tokio::test]
async fn create_already_present_is_not_duplicated() {
    let fx = offline_fixture();
    fx.transport
        .respond("https://api.test/clocks/5", 200, r#"{"id":5}"#);
    fx.queue(
        RequestRecord::new(RequestMethod::Post, "https://api.test/clocks").with_object_hint("5"),
    )
    .await;

    let report = fx.reconnect_and_drain().await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.sent, 0);
    assert!(fx.transport.writes().is_empty());
    assert_eq!(fx.outbox.pending_count().await, 0);
    assert!(persisted(&*fx.store).is_empty());
}

#[tokio::test]
async fn create_absent_is_sent() {
    let fx = offline_fixture();
    fx.queue(
        RequestRecord::new(RequestMethod::Post, "https://api.test/clocks").with_object_hint("5"),
    )
    .await;

    let report = fx.reconnect_and_drain().await;

    assert_eq!(report.sent, 1);
    let calls = fx.transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, RequestMethod::Get);
    assert_eq!(calls[0].address, "https://api.test/clocks/5");
    assert_eq!(calls[1].method, RequestMethod::Post);
    assert_eq!(calls[1].address, "https://api.test/clocks");
}

#[tokio::test]
async fn create_probe_server_error_still_sends() {
    let fx = offline_fixture();
    fx.transport
        .reply_to(RequestMethod::Get, "https://api.test/clocks/5", Reply::Status(500, String::new()));
    fx.queue(
        RequestRecord::new(RequestMethod::Post, "https://api.test/clocks").with_object_hint("5"),
    )
    .await;

    let report = fx.reconnect_and_drain().await;
    assert_eq!(report.sent, 1);
    assert_eq!(fx.transport.writes().len(), 1);
}

#[tokio::test]
async fn create_without_hint_is_sent_without_probe() {
    let fx = offline_fixture();
    fx.queue(RequestRecord::new(RequestMethod::Post, "https://api.test/clocks")).await;

    let report = fx.reconnect_and_drain().await;

    assert_eq!(report.sent, 1);
    let calls = fx.transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, RequestMethod::Post);
}

#[tokio::test]
async fn delete_of_missing_object_is_skipped() {
    let fx = offline_fixture();
    fx.queue(RequestRecord::new(RequestMethod::Delete, "https://api.test/teams/3")).await;

    // Unscripted GET answers 404.
    let report = fx.reconnect_and_drain().await;

    assert_eq!(report.skipped, 1);
    assert!(fx.transport.writes().is_empty());
    assert_eq!(fx.outbox.pending_count().await, 0);
}

#[tokio::test]
async fn delete_of_present_object_is_sent() {
    let fx = offline_fixture();
    fx.transport
        .reply_to(RequestMethod::Get, "https://api.test/teams/3", Reply::Status(200, String::new()));
    fx.queue(RequestRecord::new(RequestMethod::Delete, "https://api.test/teams/3")).await;

    let report = fx.reconnect_and_drain().await;

    assert_eq!(report.sent, 1);
    let writes = fx.transport.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].method, RequestMethod::Delete);
    assert_eq!(writes[0].body, None);
}

#[tokio::test]
async fn persisted_read_is_discarded() {
    let fx = offline_fixture();
    fx.store
        .set(
            "offlineRequests",
            r#"[{"url":"https://api.test/users","method":"GET"},{"url":"https://api.test/users/1","method":"PUT","data":{"role":"admin"}}]"#,
        )
        .unwrap();
    let outbox = open_outbox(fx.store.clone(), fx.transport.clone(), fx.monitor.clone());
    assert_eq!(outbox.pending_count().await, 2);

    fx.monitor.report(true);
    let DrainOutcome::Completed(report) = outbox.drain_now().await else {
        panic!("drain should run");
    };

    assert_eq!(report.discarded, 1);
    assert_eq!(report.sent, 1);
    let calls = fx.transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, RequestMethod::Put);
}

#[tokio::test]
async fn mixed_queue_counts() {
    let fx = offline_fixture();
    fx.transport.respond("https://api.test/users/ada", 200, "{}");
    fx.queue(
        RequestRecord::new(RequestMethod::Post, "https://api.test/users").with_object_hint("ada"),
    )
    .await;
    fx.queue(RequestRecord::new(RequestMethod::Delete, "https://api.test/teams/3")).await;
    fx.queue(RequestRecord::new(RequestMethod::Post, "https://api.test/users").with_object_hint("bob"))
        .await;

    let report = fx.reconnect_and_drain().await;

    assert_eq!(
        report,
        DrainReport {
            sent: 1,
            skipped: 2,
            discarded: 0,
            remaining: 0,
            stop: StopReason::Emptied,
        }
    );
}
