use docproc_common::DocumentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Soft-delete marker, persisted as an integer (0 = live, 1 = deleted).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum DeletedFlag {
    #[default]
    #[sea_orm(num_value = 0)]
    NotDeleted,
    #[sea_orm(num_value = 1)]
    Deleted,
}

impl DeletedFlag {
    pub fn is_set(self) -> bool {
        self == Self::Deleted
    }
}

impl From<bool> for DeletedFlag {
    fn from(deleted: bool) -> Self {
        if deleted {
            Self::Deleted
        } else {
            Self::NotDeleted
        }
    }
}

/// An uploaded document. Rows are never removed, only flagged via `is_deleted`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "dps_dbo", table_name = "documents")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false, column_name = "id")]
    pub id: Uuid,

    /// Name the file is stored under, `{id}{extension}`.
    #[sea_orm(column_name = "filename")]
    pub file_name: String,

    #[sea_orm(column_name = "originalfilename")]
    pub original_file_name: String,

    /// Lower-case, including the leading dot; empty when the upload had none.
    #[sea_orm(column_name = "fileextension")]
    pub file_extension: String,

    /// Size in bytes.
    #[sea_orm(column_name = "filesize")]
    pub file_size: i64,

    #[sea_orm(column_name = "contenttype")]
    pub content_type: String,

    /// Key in the file store.
    #[sea_orm(column_name = "storagepath")]
    pub storage_path: String,

    #[sea_orm(column_name = "status", indexed)]
    pub status: DocumentStatus,

    /// Generated summary, or the failure reason once processing failed.
    #[sea_orm(column_name = "summary", column_type = "Text")]
    pub summary: Option<String>,

    #[sea_orm(column_name = "uploadedby")]
    pub uploaded_by: String,

    #[sea_orm(column_name = "isdeleted", indexed)]
    pub is_deleted: DeletedFlag,

    #[sea_orm(column_name = "uploadedat")]
    pub uploaded_at: DateTimeUtc,

    #[sea_orm(column_name = "processedat")]
    pub processed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// Select live documents. This is the standing filter every normal read goes through.
    pub fn find_live() -> Select<Entity> {
        Self::find().filter(Column::IsDeleted.eq(DeletedFlag::NotDeleted))
    }
}
