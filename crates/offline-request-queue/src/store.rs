//! Durable mirror of the queue.

use crate::{OutboxResult, RequestRecord};
use outbox_storage::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Persists the whole queue as one JSON array under a single key.
#[derive(Clone)]
pub struct QueueStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl QueueStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Replace the stored sequence with `records`.
    pub fn persist<'a, I>(&self, records: I) -> OutboxResult<()>
    where
        I: IntoIterator<Item = &'a RequestRecord>,
    {
        let records: Vec<&RequestRecord> = records.into_iter().collect();
        let encoded = serde_json::to_string(&records)?;
        self.store.set(&self.key, &encoded)?;
        debug!(key = %self.key, records = records.len(), "Queue persisted");
        Ok(())
    }

    /// Read the stored sequence.
    ///
    /// An absent key or an unparseable value yields an empty queue. Backend
    /// read failures are returned.
    pub fn load(&self) -> OutboxResult<Vec<RequestRecord>> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<RequestRecord>>(&raw) {
            Ok(records) => {
                debug!(key = %self.key, records = records.len(), "Queue loaded");
                Ok(records)
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Persisted queue is corrupt, starting empty");
                Ok(Vec::new())
            }
        }
    }
}
