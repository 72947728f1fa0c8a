//! Idle/Draining state machine over the in-memory queue.

use crate::{
    OutboxError, OutboxResult, QueueStore, RequestMethod, RequestRecord, Transport,
    TransportResponse,
};
use reachability_monitor::Reachability;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Whether a drain pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatcherState {
    Idle,
    Draining,
}

/// Why a drain pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every record was delivered, skipped or discarded.
    Emptied,
    /// Reachability dropped before the next record.
    Unreachable,
    /// The head record could not be delivered; it stays at the head.
    SendFailed,
    /// The queue mirror could not be written.
    PersistFailed,
}

/// Counters for one drain pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub sent: usize,
    pub skipped: usize,
    pub discarded: usize,
    pub remaining: usize,
    pub stop: StopReason,
}

/// Result of a drain request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another pass was already running; nothing was done.
    AlreadyDraining,
    Completed(DrainReport),
}

/// Result of a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Deferred. `position` is the zero-based index from the head.
    Queued { position: usize },
    /// Sent right away and answered with a 2xx.
    Sent(TransportResponse),
}

/// What the existence probe decided for a record.
enum ProbeVerdict {
    /// The effect is already visible on the remote.
    AlreadyApplied,
    Send,
}

/// A queued record and its admission number. Numbers are never reused, so
/// two equal records are still told apart.
#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    record: RequestRecord,
}

/// In-memory queue, head first.
struct Queue {
    entries: VecDeque<Entry>,
    next_seq: u64,
}

impl Queue {
    fn new(records: Vec<RequestRecord>) -> Self {
        let mut queue = Self {
            entries: VecDeque::with_capacity(records.len()),
            next_seq: 0,
        };
        for record in records {
            queue.push(record);
        }
        queue
    }

    fn push(&mut self, record: RequestRecord) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(Entry { seq, record });
    }

    fn records(&self) -> impl Iterator<Item = &RequestRecord> {
        self.entries.iter().map(|entry| &entry.record)
    }
}

/// Resets the draining flag even if the drain future is dropped mid-pass.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the queue and decides, per request, whether to send or defer.
///
/// The queue lock is never held across a network call: drain clones the head,
/// processes it, then removes it only if the same entry is still the head.
pub struct Dispatcher {
    queue: Mutex<Queue>,
    store: QueueStore,
    transport: Arc<dyn Transport>,
    reachability: Arc<dyn Reachability>,
    draining: AtomicBool,
}

impl Dispatcher {
    /// Create a dispatcher seeded with whatever `store` holds.
    pub fn new(
        store: QueueStore,
        transport: Arc<dyn Transport>,
        reachability: Arc<dyn Reachability>,
    ) -> OutboxResult<Self> {
        let records = store.load()?;
        if !records.is_empty() {
            info!(pending = records.len(), "Restored offline queue");
        }

        Ok(Self {
            queue: Mutex::new(Queue::new(records)),
            store,
            transport,
            reachability,
            draining: AtomicBool::new(false),
        })
    }

    pub fn state(&self) -> DispatcherState {
        if self.draining.load(Ordering::Acquire) {
            DispatcherState::Draining
        } else {
            DispatcherState::Idle
        }
    }

    pub fn is_online(&self) -> bool {
        self.reachability.is_reachable()
    }

    /// Snapshot of the queue, head first.
    pub async fn pending(&self) -> Vec<RequestRecord> {
        self.queue.lock().await.records().cloned().collect()
    }

    pub async fn pending_count(&self) -> usize {
        self.queue.lock().await.entries.len()
    }

    /// Send now or defer.
    ///
    /// Reads always go out immediately. Mutating requests are queued while
    /// offline and sent directly while online.
    pub async fn submit(&self, record: RequestRecord) -> OutboxResult<Submission> {
        if record.method().is_mutating() && !self.is_online() {
            return self.enqueue(record).await;
        }

        let response = self
            .transport
            .send(
                record.target(),
                record.method(),
                record.headers(),
                record.body(),
            )
            .await?;

        if !response.is_success() {
            warn!(
                url = %record.target(),
                method = %record.method(),
                status = response.status,
                "Immediate request rejected"
            );
            return Err(OutboxError::ImmediateSend {
                status: response.status,
                body: response.body,
            });
        }

        debug!(url = %record.target(), method = %record.method(), "Request sent immediately");
        Ok(Submission::Sent(response))
    }

    async fn enqueue(&self, record: RequestRecord) -> OutboxResult<Submission> {
        let mut queue = self.queue.lock().await;
        let target = record.target().to_string();
        let method = record.method();
        queue.push(record);

        if let Err(e) = self.store.persist(queue.records()) {
            queue.entries.pop_back();
            warn!(url = %target, error = %e, "Could not persist queued request");
            return Err(e);
        }

        let position = queue.entries.len() - 1;
        info!(url = %target, method = %method, position = position, "Request queued while offline");
        Ok(Submission::Queued { position })
    }

    /// Drop every queued record. Returns how many were removed.
    pub async fn clear(&self) -> OutboxResult<usize> {
        let mut queue = self.queue.lock().await;
        let removed = queue.entries.len();
        queue.entries.clear();
        self.store.persist(std::iter::empty())?;
        info!(removed = removed, "Offline queue cleared");
        Ok(removed)
    }

    /// Replay the queue from the head until it empties or something stops it.
    pub async fn drain(&self) -> DrainOutcome {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            debug!("Drain already running");
            return DrainOutcome::AlreadyDraining;
        };

        let mut sent = 0;
        let mut skipped = 0;
        let mut discarded = 0;

        let stop = loop {
            let head = self.queue.lock().await.entries.front().cloned();
            let Some(Entry { seq, record }) = head else {
                break StopReason::Emptied;
            };

            if !self.is_online() {
                info!("Network dropped during drain, pausing");
                break StopReason::Unreachable;
            }

            if !record.method().is_mutating() {
                warn!(url = %record.target(), "Discarding queued read request");
                discarded += 1;
                if self.remove_head(seq).await.is_err() {
                    break StopReason::PersistFailed;
                }
                continue;
            }

            if let ProbeVerdict::AlreadyApplied = self.probe(&record).await {
                info!(
                    url = %record.target(),
                    method = %record.method(),
                    "Effect already present, skipping replay"
                );
                skipped += 1;
                if self.remove_head(seq).await.is_err() {
                    break StopReason::PersistFailed;
                }
                continue;
            }

            let result = self
                .transport
                .send(
                    record.target(),
                    record.method(),
                    record.headers(),
                    record.body(),
                )
                .await;

            match result {
                Ok(response) if response.is_success() => {
                    info!(
                        url = %record.target(),
                        method = %record.method(),
                        status = response.status,
                        "Queued request replayed"
                    );
                    sent += 1;
                    if self.remove_head(seq).await.is_err() {
                        break StopReason::PersistFailed;
                    }
                }
                Ok(response) => {
                    warn!(
                        url = %record.target(),
                        method = %record.method(),
                        status = response.status,
                        "Replay rejected, keeping request at head"
                    );
                    self.persist_current().await;
                    break StopReason::SendFailed;
                }
                Err(e) => {
                    warn!(
                        url = %record.target(),
                        method = %record.method(),
                        error = %e,
                        "Replay failed, keeping request at head"
                    );
                    self.persist_current().await;
                    break StopReason::SendFailed;
                }
            }
        };

        let remaining = self.queue.lock().await.entries.len();
        let report = DrainReport {
            sent,
            skipped,
            discarded,
            remaining,
            stop,
        };
        info!(
            sent = report.sent,
            skipped = report.skipped,
            discarded = report.discarded,
            remaining = report.remaining,
            stop = ?report.stop,
            "Drain pass finished"
        );
        DrainOutcome::Completed(report)
    }

    /// GET the derived address to learn whether replaying would duplicate or
    /// misfire. Probe failures send anyway.
    async fn probe(&self, record: &RequestRecord) -> ProbeVerdict {
        if !record.method().needs_existence_probe() {
            return ProbeVerdict::Send;
        }
        let Some(address) = record.existence_probe_address() else {
            return ProbeVerdict::Send;
        };

        match self
            .transport
            .send(&address, RequestMethod::Get, record.headers(), None)
            .await
        {
            Ok(response) => match record.method() {
                RequestMethod::Post if response.is_success() => ProbeVerdict::AlreadyApplied,
                RequestMethod::Delete if response.is_not_found() => ProbeVerdict::AlreadyApplied,
                _ => {
                    debug!(address = %address, status = response.status, "Probe says replay");
                    ProbeVerdict::Send
                }
            },
            Err(e) => {
                warn!(address = %address, error = %e, "Existence probe failed, sending anyway");
                ProbeVerdict::Send
            }
        }
    }

    /// Remove entry `seq` if it is still the head, then persist.
    async fn remove_head(&self, seq: u64) -> OutboxResult<()> {
        let mut queue = self.queue.lock().await;
        if queue.entries.front().map(|entry| entry.seq) == Some(seq) {
            queue.entries.pop_front();
        }
        self.store.persist(queue.records()).map_err(|e| {
            warn!(error = %e, "Could not persist queue after removal");
            e
        })
    }

    async fn persist_current(&self) {
        let queue = self.queue.lock().await;
        if let Err(e) = self.store.persist(queue.records()) {
            warn!(error = %e, "Could not persist queue");
        }
    }
}
