use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Static connection URL, used when no secret could be resolved.
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Where database credentials are looked up before falling back to `database.url`.
#[derive(Debug, Deserialize, Clone)]
pub struct SecretsConfig {
    /// When false, the secrets manager is never contacted.
    pub enabled: bool,
    pub region: Option<String>,
    /// Exact name of the PostgreSQL credentials secret.
    pub secret_name: String,
    /// Description prefix identifying the SQL Server credentials secret.
    pub description_prefix: String,
    /// Label reported as the secret name when the description lookup wins.
    pub description_label: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Maximum accepted upload size in bytes.
    pub max_file_size: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// OpenAI-compatible chat completions endpoint.
    OpenAi,
    /// Local leading-sentence summary, no network.
    Extractive,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_input_chars: usize,
    pub max_summary_chars: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessingConfig {
    /// Start processing in the background as soon as an upload is stored.
    pub auto_process: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub secrets: SecretsConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub processing: ProcessingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 20)?
            .set_default("secrets.enabled", true)?
            .set_default(
                "secrets.secret_name",
                "atx-db-modernization-atx-db-modernization-1-target",
            )?
            .set_default(
                "secrets.description_prefix",
                "Password for RDS MSSQL used for MAM319.",
            )?
            .set_default("secrets.description_label", "MAM319 RDS MSSQL")?
            .set_default("storage.data_dir", "./data/uploads")?
            .set_default("storage.max_file_size", 50 * 1024 * 1024)?
            .set_default("ai.provider", "extractive")?
            .set_default("ai.endpoint", "https://api.openai.com/v1")?
            .set_default("ai.model", "gpt-4o-mini")?
            .set_default("ai.max_input_chars", 12_000)?
            .set_default("ai.max_summary_chars", 1_200)?
            .set_default("ai.timeout_secs", 60)?
            .set_default("processing.auto_process", true)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., DOCPROC__DATABASE__URL)
            .add_source(Environment::with_prefix("DOCPROC").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
