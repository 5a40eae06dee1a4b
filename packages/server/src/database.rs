use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

/// Schema holding every table this service owns.
pub const SCHEMA: &str = "dps_dbo";

pub async fn init_db(db_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    ensure_schema(&db).await?;

    Ok(db)
}

/// Create the schema if missing and bring the tables in line with the entities.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.execute_unprepared(&format!("CREATE SCHEMA IF NOT EXISTS \"{SCHEMA}\""))
        .await?;
    db.get_schema_registry("docproc_server::entity::*")
        .sync(db)
        .await?;
    info!(schema = SCHEMA, "Database schema ready");
    Ok(())
}
