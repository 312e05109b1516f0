use crate::error::StorageError;
use crate::ports::KeyValueStore;

use super::repositories::KvRepository;
use super::Database;

impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let owned = key.to_string();
        self.execute(move |conn| KvRepository::new(conn).get(&owned))
            .await
            .map_err(|err| StorageError::ReadFailed {
                key: key.to_string(),
                reason: format!("{err:#}"),
            })
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let owned = key.to_string();
        let value = value.to_vec();
        self.execute(move |conn| KvRepository::new(conn).put(&owned, &value))
            .await
            .map_err(|err| StorageError::WriteFailed {
                key: key.to_string(),
                reason: format!("{err:#}"),
            })
    }
}
