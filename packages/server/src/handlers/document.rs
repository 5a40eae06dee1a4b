use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use docproc_common::storage::StorageError;
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::instrument;
use uuid::Uuid;

use crate::entity::document;
use crate::error::{AppError, ErrorBody};
use crate::models::document::{
    DocumentListQuery, DocumentListResponse, DocumentResponse, Pagination,
};
use crate::services::processing::{ProcessingError, StagedUpload};
use crate::state::AppState;
use crate::utils::filename::content_disposition_value;

/// Room for multipart framing and the text fields on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn upload_body_limit(max_file_size: u64) -> DefaultBodyLimit {
    let limit = max_file_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::Validation("Invalid document ID".into()))
}

async fn find_live(state: &AppState, id: Uuid) -> Result<document::Model, AppError> {
    state
        .db
        .documents()
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".into()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Documents",
    operation_id = "listDocuments",
    summary = "List documents",
    description = "Returns documents newest first. Soft-deleted documents are excluded unless \
        `include_deleted=true`.",
    params(DocumentListQuery),
    responses(
        (status = 200, description = "Document list", body = DocumentListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let filter = query.to_filter();
    let documents = if query.include_deleted.unwrap_or(false) {
        state.db.documents().ignore_query_filters()
    } else {
        state.db.documents()
    };

    let (rows, total) = documents.list(&filter).await?;

    Ok(Json(DocumentListResponse {
        data: rows.into_iter().map(DocumentResponse::from).collect(),
        pagination: Pagination::new(filter.page, filter.per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Documents",
    operation_id = "uploadDocument",
    summary = "Upload a document",
    description = "Stores the `file` multipart field and records it as a `Pending` document. \
        An optional `uploaded_by` field names the uploader. When automatic processing is \
        enabled, summarization starts in the background.",
    request_body(content_type = "multipart/form-data", description = "File upload with optional uploader"),
    responses(
        (status = 201, description = "Document created", body = DocumentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut staged: Option<StagedUpload> = None;
    let mut uploaded_by: Option<String> = None;

    let read = read_upload_form(&state, &mut multipart, &mut staged, &mut uploaded_by).await;
    if let Err(e) = read {
        if let Some(staged) = staged {
            state.processing.discard_upload(staged).await;
        }
        return Err(e);
    }

    let staged = staged.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let model = state
        .processing
        .record_upload(staged, uploaded_by.as_deref())
        .await?;

    if state.config.processing.auto_process {
        state.processing.spawn_process(model.id);
    }

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(model))))
}

/// Walk the form, streaming the `file` field into storage as it arrives.
///
/// Anything already staged is left in `staged` so the caller can discard it
/// when a later field fails.
async fn read_upload_form(
    state: &AppState,
    multipart: &mut Multipart,
    staged: &mut Option<StagedUpload>,
    uploaded_by: &mut Option<String>,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                if staged.is_some() {
                    return Err(AppError::Validation(
                        "Only one 'file' field is allowed".into(),
                    ));
                }
                *staged = Some(stream_field_to_store(state, field).await?);
            }
            Some("uploaded_by") => {
                *uploaded_by = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {} // Ignore unknown fields.
        }
    }
    Ok(())
}

async fn stream_field_to_store(
    state: &AppState,
    field: Field<'_>,
) -> Result<StagedUpload, AppError> {
    let file_name = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
    let content_type = field.content_type().map(str::to_string);

    let reader = StreamReader::new(field.map_err(std::io::Error::other));
    tokio::pin!(reader);

    state
        .processing
        .store_upload(&file_name, content_type.as_deref(), &mut reader)
        .await
        .map_err(upload_error)
}

/// Body read failures reach the store as I/O errors wrapping the multipart
/// error; report those like any other multipart error.
fn upload_error(err: ProcessingError) -> AppError {
    match err {
        ProcessingError::Storage(StorageError::Io(io))
            if io.get_ref().is_some_and(|e| e.is::<MultipartError>()) =>
        {
            match io.into_inner().map(|e| e.downcast::<MultipartError>()) {
                Some(Ok(e)) => multipart_error(*e),
                _ => AppError::Internal("Upload stream failed".into()),
            }
        }
        other => other.into(),
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Multipart error: {}", e.body_text()))
    }
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Documents",
    operation_id = "getDocument",
    summary = "Get a document",
    params(("id" = String, Path, description = "Document ID (UUID)")),
    responses(
        (status = 200, description = "Document details", body = DocumentResponse),
        (status = 400, description = "Invalid ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Document not found or deleted (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(find_live(&state, id).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Documents",
    operation_id = "deleteDocument",
    summary = "Soft-delete a document",
    description = "Flags the document as deleted. The row and the stored file are kept and \
        can be brought back with the restore endpoint.",
    params(("id" = String, Path, description = "Document ID (UUID)")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Document not found or already deleted (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    state.processing.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/restore",
    tag = "Documents",
    operation_id = "restoreDocument",
    summary = "Restore a soft-deleted document",
    params(("id" = String, Path, description = "Document ID (UUID)")),
    responses(
        (status = 200, description = "Document restored", body = DocumentResponse),
        (status = 404, description = "No deleted document with this ID (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn restore_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.processing.restore(id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/process",
    tag = "Documents",
    operation_id = "processDocument",
    summary = "Summarize a document",
    description = "Extracts the document text and summarizes it, waiting for the result. \
        A failed extraction or summarization is recorded as status `Failed` with the reason \
        in `summary`; the response is still 200.",
    params(("id" = String, Path, description = "Document ID (UUID)")),
    responses(
        (status = 200, description = "Processing finished", body = DocumentResponse),
        (status = 404, description = "Document not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already processing (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn process_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.processing.process(id).await?.into()))
}

#[utoipa::path(
    get,
    path = "/{id}/content",
    tag = "Documents",
    operation_id = "downloadDocument",
    summary = "Download the stored file",
    params(("id" = String, Path, description = "Document ID (UUID)")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Document or file not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let doc = find_live(&state, id).await?;

    let reader = state.storage.open(&doc.storage_path).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &doc.content_type)
        .header(header::CONTENT_LENGTH, doc.file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&doc.original_file_name),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
