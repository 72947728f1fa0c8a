//! Storage trait definitions.

use crate::StorageResult;

/// Durable string key-value store scoped to the local device.
///
/// `set` must replace the previous value atomically: a reader never sees a
/// partially written value.
pub trait KeyValueStore: Send + Sync {
    /// Store a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value, `None` if the key was never set.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value. Returns whether anything was removed.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
