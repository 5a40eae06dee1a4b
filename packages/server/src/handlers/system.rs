use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::models::system::DatabaseInfo;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/database",
    tag = "System",
    operation_id = "getDatabaseInfo",
    summary = "Describe the database connection",
    description = "Reports which kind of database is in use and which secret it was resolved from. \
        The connection string is never returned.",
    responses(
        (status = 200, description = "Database connection details", body = DatabaseInfo),
    ),
)]
#[instrument(skip(state))]
pub async fn database_info(State(state): State<AppState>) -> Json<DatabaseInfo> {
    Json(DatabaseInfo::clone(&state.database_info))
}
