//! Public facade wiring the dispatcher to reachability events.

use crate::{
    Dispatcher, DispatcherState, DrainOutcome, OutboxResult, QueueStore, RequestRecord,
    Submission, Transport,
};
use outbox_storage::{KeyValueStore, StorageKeys};
use parking_lot::Mutex;
use reachability_monitor::{Reachability, ReachabilityEvent};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outbox configuration.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Key the queue is persisted under.
    pub storage_key: String,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            storage_key: StorageKeys::OFFLINE_REQUESTS.to_string(),
        }
    }
}

/// Point-in-time summary of the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub state: DispatcherState,
    pub online: bool,
}

/// Application entry point: submit mutating calls and let the outbox hold
/// them across connectivity gaps.
pub struct OfflineOutbox {
    dispatcher: Arc<Dispatcher>,
    reachability: Arc<dyn Reachability>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl OfflineOutbox {
    /// Open the outbox and restore any persisted queue.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        reachability: Arc<dyn Reachability>,
        config: OutboxConfig,
    ) -> OutboxResult<Self> {
        let queue_store = QueueStore::new(store, config.storage_key);
        let dispatcher = Dispatcher::new(queue_store, transport, reachability.clone())?;

        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            reachability,
            listener: Mutex::new(None),
        })
    }

    pub async fn submit(&self, record: RequestRecord) -> OutboxResult<Submission> {
        self.dispatcher.submit(record).await
    }

    pub fn is_online(&self) -> bool {
        self.reachability.is_reachable()
    }

    /// Start draining on every reconnect. Also drains once right away when
    /// already online with a backlog. Calling it again while running is a
    /// no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut slot = self.listener.lock();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        // Subscribe before spawning so no transition slips past.
        let mut events = self.reachability.subscribe();
        let dispatcher = self.dispatcher.clone();
        let reachability = self.reachability.clone();

        info!("Offline outbox listening for reconnects");
        *slot = Some(tokio::spawn(async move {
            if reachability.is_reachable() && dispatcher.pending_count().await > 0 {
                spawn_drain(&dispatcher);
            }

            loop {
                match events.recv().await {
                    Ok(ReachabilityEvent::Reconnected) => spawn_drain(&dispatcher),
                    Ok(ReachabilityEvent::Disconnected) => {
                        debug!("Offline, new mutations will be queued");
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed = missed, "Reachability events lagged");
                        if reachability.is_reachable() {
                            spawn_drain(&dispatcher);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Stop reacting to reconnects. A drain already in flight finishes its
    /// current pass.
    pub fn stop(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
            info!("Offline outbox stopped listening");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run one drain pass now, subject to the same single-pass guard.
    pub async fn drain_now(&self) -> DrainOutcome {
        self.dispatcher.drain().await
    }

    pub async fn pending(&self) -> Vec<RequestRecord> {
        self.dispatcher.pending().await
    }

    pub async fn pending_count(&self) -> usize {
        self.dispatcher.pending_count().await
    }

    pub fn state(&self) -> DispatcherState {
        self.dispatcher.state()
    }

    /// Drop every queued record. Returns how many were removed.
    pub async fn clear(&self) -> OutboxResult<usize> {
        self.dispatcher.clear().await
    }

    pub async fn status(&self) -> QueueStatus {
        QueueStatus {
            pending: self.pending_count().await,
            state: self.state(),
            online: self.is_online(),
        }
    }
}

impl Drop for OfflineOutbox {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.abort();
        }
    }
}

fn spawn_drain(dispatcher: &Arc<Dispatcher>) {
    let dispatcher = dispatcher.clone();
    tokio::spawn(async move {
        if let DrainOutcome::AlreadyDraining = dispatcher.drain().await {
            debug!("Reconnect ignored, drain already running");
        }
    });
}
