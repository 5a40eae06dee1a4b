use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, bail};
use docproc_common::storage::filesystem::FilesystemFileStore;
use tracing::{Level, info};

use docproc_server::build_router;
use docproc_server::config::AppConfig;
use docproc_server::context::AppDbContext;
use docproc_server::credentials::{AwsSecretSource, CredentialResolver};
use docproc_server::database::init_db;
use docproc_server::models::system::DatabaseInfo;
use docproc_server::services::{AiService, FileStorageService};
use docproc_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let resolver = CredentialResolver::new(&config.secrets, config.database.url.as_deref());
    let resolved = if config.secrets.enabled {
        let secrets = AwsSecretSource::from_env(config.secrets.region.clone()).await;
        resolver.with_secrets(&secrets).resolve().await
    } else {
        resolver.resolve().await
    };
    info!(
        kind = %resolved.kind,
        secret = %resolved.secret_name,
        host = %resolved.host_address,
        "Database connection resolved"
    );

    // Only the Postgres driver is compiled in; never swap in the config URL
    // for a database the secrets point elsewhere.
    if !resolved.kind.is_supported() {
        bail!(
            "Resolved a {} connection from '{}', but this build only supports PostgreSQL. \
             Fix the named secret '{}', or set secrets.enabled=false \
             (DOCPROC__SECRETS__ENABLED=false) to use database.url instead",
            resolved.kind,
            resolved.secret_name,
            config.secrets.secret_name
        );
    }

    let db = init_db(&resolved.url, config.database.max_connections)
        .await
        .context("Failed to connect to the database")?;
    info!("Database connected and schema synced");

    let store = FilesystemFileStore::new(
        config.storage.data_dir.clone(),
        config.storage.max_file_size,
    )
    .await
    .with_context(|| {
        format!(
            "Failed to prepare storage directory {}",
            config.storage.data_dir.display()
        )
    })?;
    let ai = AiService::from_config(&config.ai).context("Failed to configure AI provider")?;
    info!(provider = ?config.ai.provider, "AI summarization ready");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState::new(
        config,
        AppDbContext::new(db),
        DatabaseInfo::from(&resolved),
        FileStorageService::new(Arc::new(store)),
        ai,
    );
    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
