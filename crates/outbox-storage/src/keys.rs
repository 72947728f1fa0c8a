//! Storage key constants.

/// Storage keys used by the outbox
pub struct StorageKeys;

impl StorageKeys {
    /// Pending offline requests (JSON array)
    pub const OFFLINE_REQUESTS: &'static str = "offlineRequests";
}
