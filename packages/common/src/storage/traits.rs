use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::key::StorageKey;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Key-addressed file storage.
///
/// Writing to an existing key replaces the previous content.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Drain `reader` into the file under `key` and return the number of bytes written.
    ///
    /// The reader is borrowed so callers can stream straight from a request
    /// body without buffering it first.
    async fn put_stream(
        &self,
        key: &StorageKey,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, StorageError>;

    /// Retrieve all bytes stored under `key`.
    async fn get(&self, key: &StorageKey) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a file as a streaming async reader.
    async fn get_stream(&self, key: &StorageKey) -> Result<BoxReader, StorageError>;

    /// Delete a file.
    ///
    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn delete(&self, key: &StorageKey) -> Result<bool, StorageError>;
}
