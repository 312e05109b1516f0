use std::future::Future;

use crate::error::StorageError;

/// Port for durable key/value persistence.
///
/// A successful `put` means the value survives a restart. Writes to distinct
/// keys are independent: a failed write never disturbs other keys.
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when the key has never been written.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send;

    fn put(&self, key: &str, value: &[u8]) -> impl Future<Output = Result<(), StorageError>> + Send;
}
