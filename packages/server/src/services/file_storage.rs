use std::path::Path;
use std::sync::Arc;

use docproc_common::storage::{BoxReader, FileStore, StorageError, StorageKey};
use tokio::io::AsyncRead;
use tracing::instrument;
use uuid::Uuid;

/// Longest extension kept on a stored file name, dot excluded.
const MAX_EXTENSION_LEN: usize = 16;

/// Location of a file written by [`FileStorageService`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    /// Name under which the file was stored; also its storage path.
    pub file_name: String,
    pub storage_path: String,
    pub size: u64,
}

/// Stores uploaded document bytes, one file per document.
#[derive(Clone)]
pub struct FileStorageService {
    store: Arc<dyn FileStore>,
}

impl FileStorageService {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Lower-cased extension of `original_name` including the dot, or `""`.
    ///
    /// Extensions that are overly long or contain anything but ASCII letters
    /// and digits are dropped.
    pub fn extension_of(original_name: &str) -> String {
        Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| {
                !ext.is_empty()
                    && ext.len() <= MAX_EXTENSION_LEN
                    && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }

    /// Stored name for a document: `{id}{extension}`.
    pub fn stored_name(id: Uuid, extension: &str) -> String {
        format!("{id}{extension}")
    }

    /// Stream `reader` into the store under `stored_name`.
    #[instrument(skip(self, reader))]
    pub async fn save(
        &self,
        stored_name: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<StoredFile, StorageError> {
        let key = StorageKey::parse(stored_name)?;
        let size = self.store.put_stream(&key, reader).await?;
        Ok(StoredFile {
            file_name: stored_name.to_string(),
            storage_path: key.to_string(),
            size,
        })
    }

    pub async fn read(&self, storage_path: &str) -> Result<Vec<u8>, StorageError> {
        self.store.get(&StorageKey::parse(storage_path)?).await
    }

    pub async fn open(&self, storage_path: &str) -> Result<BoxReader, StorageError> {
        self.store.get_stream(&StorageKey::parse(storage_path)?).await
    }

    pub async fn delete(&self, storage_path: &str) -> Result<bool, StorageError> {
        self.store.delete(&StorageKey::parse(storage_path)?).await
    }
}
