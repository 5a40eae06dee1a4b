use std::sync::Arc;

use crate::config::AppConfig;
use crate::context::AppDbContext;
use crate::models::system::DatabaseInfo;
use crate::services::{AiService, DocumentProcessingService, FileStorageService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: AppDbContext,
    pub database_info: Arc<DatabaseInfo>,
    pub storage: FileStorageService,
    pub processing: DocumentProcessingService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: AppDbContext,
        database_info: DatabaseInfo,
        storage: FileStorageService,
        ai: AiService,
    ) -> Self {
        let processing = DocumentProcessingService::new(db.clone(), storage.clone(), ai);
        Self {
            config: Arc::new(config),
            db,
            database_info: Arc::new(database_info),
            storage,
            processing,
        }
    }
}
