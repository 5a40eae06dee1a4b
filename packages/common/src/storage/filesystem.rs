use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use super::error::StorageError;
use super::key::StorageKey;
use super::traits::{BoxReader, FileStore};

/// Filesystem-backed file store.
///
/// Files are stored in a sharded directory layout:
/// `{base_path}/{first 2 key chars}/{key}`
///
/// Writes land in `{base_path}/.tmp` first and are renamed into place, so a
/// reader never observes a partially written file.
pub struct FilesystemFileStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemFileStore {
    /// Create a new filesystem store, creating the base directory if needed.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn file_path(&self, key: &StorageKey) -> PathBuf {
        self.base_path.join(key.shard_prefix()).join(key.as_str())
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl FileStore for FilesystemFileStore {
    async fn put_stream(
        &self,
        key: &StorageKey,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, StorageError> {
        let temp_path = self.temp_path();
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024];
        let mut temp_file = fs::File::create(&temp_path).await?;

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    drop(temp_file);
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(e.into());
                }
            };
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                drop(temp_file);
                let _ = fs::remove_file(&temp_path).await;
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        drop(temp_file);

        let file_path = self.file_path(key);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &file_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(key = %key, bytes = total_bytes, "Stored file");
        Ok(total_bytes)
    }

    async fn get_stream(&self, key: &StorageKey) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.file_path(key)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &StorageKey) -> Result<bool, StorageError> {
        match fs::remove_file(self.file_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
