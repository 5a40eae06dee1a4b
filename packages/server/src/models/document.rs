use chrono::{DateTime, Utc};
use docproc_common::DocumentStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use super::shared::Pagination;
use crate::context::DocumentFilter;
use crate::entity::document;

const MAX_PAGE: u64 = 1_000_000;
const MAX_PER_PAGE: u64 = 100;

/// Query parameters for document listing.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct DocumentListQuery {
    /// 1-based page number, clamped to 1-1000000.
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page, clamped to 1-100.
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Filter by processing status.
    pub status: Option<DocumentStatus>,
    /// Include soft-deleted documents.
    #[param(example = false)]
    pub include_deleted: Option<bool>,
}

impl DocumentListQuery {
    pub fn to_filter(&self) -> DocumentFilter {
        DocumentFilter {
            status: self.status,
            page: self.page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: self.per_page.unwrap_or(20).clamp(1, MAX_PER_PAGE),
        }
    }
}

/// Full document details.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DocumentResponse {
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: Uuid,
    /// Name the file is stored under.
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001.pdf")]
    pub file_name: String,
    #[schema(example = "Quarterly Report.pdf")]
    pub original_file_name: String,
    #[schema(example = ".pdf")]
    pub file_extension: String,
    /// Size in bytes.
    #[schema(example = 142857)]
    pub file_size: i64,
    #[schema(example = "application/pdf")]
    pub content_type: String,
    pub status: DocumentStatus,
    /// Generated summary, or the failure reason when `status` is `Failed`.
    pub summary: Option<String>,
    #[schema(example = "alice")]
    pub uploaded_by: String,
    pub is_deleted: bool,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<document::Model> for DocumentResponse {
    fn from(m: document::Model) -> Self {
        Self {
            id: m.id,
            file_name: m.file_name,
            original_file_name: m.original_file_name,
            file_extension: m.file_extension,
            file_size: m.file_size,
            content_type: m.content_type,
            status: m.status,
            summary: m.summary,
            uploaded_by: m.uploaded_by,
            is_deleted: m.is_deleted.is_set(),
            uploaded_at: m.uploaded_at,
            processed_at: m.processed_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentListResponse {
    pub data: Vec<DocumentResponse>,
    pub pagination: Pagination,
}
