use docproc_common::storage::StorageError;
use sea_orm::DbErr;
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::ai::{AiError, AiService};
use super::extract::{ExtractError, extract_text};
use super::file_storage::{FileStorageService, StoredFile};
use crate::context::{AppDbContext, NewDocument};
use crate::entity::document;
use crate::utils::filename::{FilenameError, validate_flat_filename};

/// Recorded as `uploaded_by` when the uploader is not named.
pub const ANONYMOUS_UPLOADER: &str = "anonymous";

const MAX_UPLOADER_LEN: usize = 256;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("{}", .0.message())]
    InvalidFileName(FilenameError),

    #[error("uploaded_by must be at most {MAX_UPLOADER_LEN} characters")]
    InvalidUploader,

    #[error("document {0} not found")]
    NotFound(Uuid),

    #[error("document {0} is already being processed")]
    AlreadyProcessing(Uuid),

    #[error("processing task aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Database(#[from] DbErr),
}

/// An uploaded file that is in storage but has no document row yet.
///
/// Pass it to [`DocumentProcessingService::record_upload`] or
/// [`DocumentProcessingService::discard_upload`].
#[derive(Debug)]
pub struct StagedUpload {
    id: Uuid,
    original_name: String,
    extension: String,
    content_type: String,
    stored: StoredFile,
}

/// Upload, summarize and delete documents.
#[derive(Clone)]
pub struct DocumentProcessingService {
    db: AppDbContext,
    storage: FileStorageService,
    ai: AiService,
}

impl DocumentProcessingService {
    pub fn new(db: AppDbContext, storage: FileStorageService, ai: AiService) -> Self {
        Self { db, storage, ai }
    }

    /// Validate the file name and stream the upload into storage.
    #[instrument(skip(self, content_type, reader))]
    pub async fn store_upload(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<StagedUpload, ProcessingError> {
        let original_name = validate_flat_filename(original_name)
            .map_err(ProcessingError::InvalidFileName)?
            .to_string();

        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&original_name)
                    .first_or_octet_stream()
                    .to_string()
            });

        let id = Uuid::now_v7();
        let extension = FileStorageService::extension_of(&original_name);
        let stored = self
            .storage
            .save(&FileStorageService::stored_name(id, &extension), reader)
            .await?;

        Ok(StagedUpload {
            id,
            original_name,
            extension,
            content_type,
            stored,
        })
    }

    /// Record a staged upload as a `Pending` document.
    ///
    /// The stored file is removed again if the uploader is invalid or the
    /// insert fails.
    #[instrument(skip(self, staged), fields(document_id = %staged.id))]
    pub async fn record_upload(
        &self,
        staged: StagedUpload,
        uploaded_by: Option<&str>,
    ) -> Result<document::Model, ProcessingError> {
        let uploaded_by = match uploaded_by.map(str::trim) {
            Some(name) if name.chars().count() > MAX_UPLOADER_LEN => {
                self.discard_upload(staged).await;
                return Err(ProcessingError::InvalidUploader);
            }
            Some(name) if !name.is_empty() => name.to_string(),
            _ => ANONYMOUS_UPLOADER.to_string(),
        };

        let new = NewDocument {
            id: staged.id,
            file_name: staged.stored.file_name.clone(),
            original_file_name: staged.original_name.clone(),
            file_extension: staged.extension.clone(),
            file_size: i64::try_from(staged.stored.size).unwrap_or(i64::MAX),
            content_type: staged.content_type.clone(),
            storage_path: staged.stored.storage_path.clone(),
            uploaded_by,
        };

        match self.db.documents().add(new).await {
            Ok(model) => {
                info!(document_id = %model.id, size = model.file_size, "Document uploaded");
                Ok(model)
            }
            Err(e) => {
                self.discard_upload(staged).await;
                Err(e.into())
            }
        }
    }

    /// Remove the stored file of an upload that will not be recorded.
    pub async fn discard_upload(&self, staged: StagedUpload) {
        let path = staged.stored.storage_path;
        if let Err(e) = self.storage.delete(&path).await {
            warn!(path = %path, error = %e, "Failed to remove orphaned upload");
        }
    }

    /// Extract and summarize a document, recording the outcome on its row.
    ///
    /// Extraction and summarization failures mark the document `Failed` and
    /// still return the updated row; only lookup and database errors are
    /// returned as `Err`.
    #[instrument(skip(self))]
    pub async fn process(&self, id: Uuid) -> Result<document::Model, ProcessingError> {
        let documents = self.db.documents();
        let doc = documents
            .find(id)
            .await?
            .ok_or(ProcessingError::NotFound(id))?;
        if !documents.begin_processing(id).await? {
            return Err(ProcessingError::AlreadyProcessing(id));
        }
        info!(document_id = %id, previous = %doc.status, "Processing started");

        let outcome = self.summarize_detached(doc).await;
        let recorded = match &outcome {
            Ok(summary) => documents.complete(id, summary).await,
            Err(e) => {
                warn!(document_id = %id, error = %e, "Document processing failed");
                documents.fail(id, &e.to_string()).await
            }
        };

        match (recorded, outcome) {
            (Ok(_), Ok(summary)) => {
                info!(document_id = %id, chars = summary.len(), "Document processed");
            }
            (Ok(_), Err(_)) => {}
            (Err(e), Ok(_)) => {
                warn!(document_id = %id, error = %e, "Could not store summary");
                let reason = format!("failed to store summary: {e}");
                if let Err(retry) = documents.fail(id, &reason).await {
                    warn!(document_id = %id, error = %retry, "Document left in Processing");
                }
                return Err(e.into());
            }
            (Err(e), Err(_)) => {
                warn!(document_id = %id, error = %e, "Document left in Processing");
                return Err(e.into());
            }
        }

        documents
            .find(id)
            .await?
            .ok_or(ProcessingError::NotFound(id))
    }

    /// Run [`summarize`](Self::summarize) on its own task so a panic becomes
    /// an error instead of unwinding past the status bookkeeping.
    async fn summarize_detached(&self, doc: document::Model) -> Result<String, ProcessingError> {
        let service = self.clone();
        tokio::spawn(async move { service.summarize(&doc).await })
            .await
            .unwrap_or_else(|e| Err(ProcessingError::Aborted(e.to_string())))
    }

    async fn summarize(&self, doc: &document::Model) -> Result<String, ProcessingError> {
        let bytes = self.storage.read(&doc.storage_path).await?;
        let text = extract_text(&doc.content_type, &doc.file_extension, bytes).await?;
        Ok(self.ai.summarize(&doc.original_file_name, &text).await?)
    }

    /// Run [`process`](Self::process) in the background.
    pub fn spawn_process(&self, id: Uuid) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.process(id).await {
                warn!(document_id = %id, error = %e, "Background processing did not run");
            }
        });
    }

    /// Soft-delete a document. The stored file is kept so the row can be restored.
    pub async fn delete(&self, id: Uuid) -> Result<(), ProcessingError> {
        if self.db.documents().soft_delete(id).await? {
            info!(document_id = %id, "Document deleted");
            Ok(())
        } else {
            Err(ProcessingError::NotFound(id))
        }
    }

    pub async fn restore(&self, id: Uuid) -> Result<document::Model, ProcessingError> {
        let documents = self.db.documents();
        if !documents.restore(id).await? {
            return Err(ProcessingError::NotFound(id));
        }
        info!(document_id = %id, "Document restored");
        documents
            .find(id)
            .await?
            .ok_or(ProcessingError::NotFound(id))
    }
}
