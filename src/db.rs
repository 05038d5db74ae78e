use std::sync::Arc;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::llm::LlmClient;

pub type DbPool = SqlitePool;

/// Shared state for command entry points
pub struct AppState {
  pub db: DbPool,
  pub config: AppConfig,
}

impl AppState {
  pub fn new(db: DbPool, config: AppConfig) -> Arc<Self> {
    Arc::new(Self { db, config })
  }

  /// A client for the configured model, or MissingApiKey
  pub fn llm_client(&self) -> Result<LlmClient, AppError> {
    Ok(LlmClient::new(&self.config.llm)?)
  }
}

/// Open the connection pool and run migrations
pub async fn initialize_db(database_url: &str) -> Result<DbPool, AppError> {
  info!("Initializing database at: {}", database_url);

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized successfully");

  Ok(pool)
}
