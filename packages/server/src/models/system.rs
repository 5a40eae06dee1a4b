use serde::Serialize;

use crate::credentials::{DatabaseKind, ResolvedDatabase};

/// Where the database connection came from. Never carries the connection URL.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct DatabaseInfo {
    #[schema(example = "PostgreSQL")]
    pub database_type: DatabaseKind,
    /// Secret (or configuration source) the credentials were read from.
    #[schema(example = "atx-db-modernization-atx-db-modernization-1-target")]
    pub secret_name: String,
    #[schema(example = "db.internal:5432")]
    pub host_address: String,
}

impl From<&ResolvedDatabase> for DatabaseInfo {
    fn from(resolved: &ResolvedDatabase) -> Self {
        Self {
            database_type: resolved.kind,
            secret_name: resolved.secret_name.clone(),
            host_address: resolved.host_address.clone(),
        }
    }
}
