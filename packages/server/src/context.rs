//! Typed access to the `documents` table.
//!
//! Every query issued through [`DocumentSet`] applies the soft-delete filter
//! unless the caller opts out with [`DocumentSet::ignore_query_filters`].

use chrono::Utc;
use docproc_common::DocumentStatus;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, UpdateMany,
};
use uuid::Uuid;

use crate::entity::document::{self, DeletedFlag};

/// Postgres `OFFSET` is a signed bigint.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Request-scoped handle to the database. Cloning is cheap (pooled connection).
#[derive(Clone)]
pub struct AppDbContext {
    db: DatabaseConnection,
}

impl AppDbContext {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn documents(&self) -> DocumentSet<'_> {
        DocumentSet {
            db: &self.db,
            ignore_filters: false,
        }
    }
}

/// Fields supplied when a document row is first created.
#[derive(Clone, Debug)]
pub struct NewDocument {
    pub id: Uuid,
    pub file_name: String,
    pub original_file_name: String,
    pub file_extension: String,
    pub file_size: i64,
    pub content_type: String,
    pub storage_path: String,
    pub uploaded_by: String,
}

/// Paging and filtering for [`DocumentSet::list`].
#[derive(Clone, Debug)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    /// 1-based.
    pub page: u64,
    pub per_page: u64,
}

impl Default for DocumentFilter {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            per_page: 20,
        }
    }
}

pub struct DocumentSet<'a> {
    db: &'a DatabaseConnection,
    ignore_filters: bool,
}

impl DocumentSet<'_> {
    /// Include soft-deleted rows in subsequent queries.
    pub fn ignore_query_filters(mut self) -> Self {
        self.ignore_filters = true;
        self
    }

    /// Base select for this set.
    pub fn query(&self) -> Select<document::Entity> {
        if self.ignore_filters {
            document::Entity::find()
        } else {
            document::Entity::find_live()
        }
    }

    fn update(&self, id: Uuid) -> UpdateMany<document::Entity> {
        let update = document::Entity::update_many().filter(document::Column::Id.eq(id));
        if self.ignore_filters {
            update
        } else {
            update.filter(document::Column::IsDeleted.eq(DeletedFlag::NotDeleted))
        }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<document::Model>, DbErr> {
        self.query()
            .filter(document::Column::Id.eq(id))
            .one(self.db)
            .await
    }

    /// One page of documents, newest first, together with the total match count.
    pub async fn list(
        &self,
        filter: &DocumentFilter,
    ) -> Result<(Vec<document::Model>, u64), DbErr> {
        let page = Ord::max(filter.page, 1);
        let per_page = Ord::max(filter.per_page, 1);

        let mut select = self.query();
        if let Some(status) = filter.status {
            select = select.filter(document::Column::Status.eq(status));
        }

        let total = select.clone().paginate(self.db, per_page).num_items().await?;

        let offset = (page - 1).saturating_mul(per_page).min(MAX_OFFSET);
        let rows = select
            .order_by_desc(document::Column::UploadedAt)
            .order_by_desc(document::Column::Id)
            .offset(Some(offset))
            .limit(Some(per_page))
            .all(self.db)
            .await?;

        Ok((rows, total))
    }

    /// Insert a new `Pending` document.
    pub async fn add(&self, new: NewDocument) -> Result<document::Model, DbErr> {
        document::ActiveModel {
            id: Set(new.id),
            file_name: Set(new.file_name),
            original_file_name: Set(new.original_file_name),
            file_extension: Set(new.file_extension),
            file_size: Set(new.file_size),
            content_type: Set(new.content_type),
            storage_path: Set(new.storage_path),
            status: Set(DocumentStatus::Pending),
            summary: Set(None),
            uploaded_by: Set(new.uploaded_by),
            is_deleted: Set(DeletedFlag::NotDeleted),
            uploaded_at: Set(Utc::now()),
            processed_at: Set(None),
        }
        .insert(self.db)
        .await
    }

    /// Move the document to `Processing` unless it is already there.
    ///
    /// The status check is part of the `UPDATE`, so of two concurrent callers
    /// only one sees `true`.
    pub async fn begin_processing(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = self
            .update(id)
            .filter(document::Column::Status.ne(DocumentStatus::Processing))
            .col_expr(
                document::Column::Status,
                Expr::value(DocumentStatus::Processing),
            )
            .exec(self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Store the summary and mark the document `Completed`.
    pub async fn complete(&self, id: Uuid, summary: &str) -> Result<bool, DbErr> {
        self.finish(id, DocumentStatus::Completed, summary).await
    }

    /// Mark the document `Failed`, keeping `reason` in the summary column.
    pub async fn fail(&self, id: Uuid, reason: &str) -> Result<bool, DbErr> {
        self.finish(id, DocumentStatus::Failed, reason).await
    }

    async fn finish(&self, id: Uuid, status: DocumentStatus, summary: &str) -> Result<bool, DbErr> {
        let result = self
            .update(id)
            .col_expr(document::Column::Status, Expr::value(status))
            .col_expr(
                document::Column::Summary,
                Expr::value(Some(summary.to_string())),
            )
            .col_expr(
                document::Column::ProcessedAt,
                Expr::value(Some(Utc::now())),
            )
            .exec(self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Flag a live document as deleted. Returns false if it was missing or already deleted.
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = document::Entity::update_many()
            .col_expr(document::Column::IsDeleted, Expr::value(DeletedFlag::Deleted))
            .filter(document::Column::Id.eq(id))
            .filter(document::Column::IsDeleted.eq(DeletedFlag::NotDeleted))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Clear the deleted flag. Always bypasses the standing filter.
    pub async fn restore(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = document::Entity::update_many()
            .col_expr(
                document::Column::IsDeleted,
                Expr::value(DeletedFlag::NotDeleted),
            )
            .filter(document::Column::Id.eq(id))
            .filter(document::Column::IsDeleted.eq(DeletedFlag::Deleted))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
