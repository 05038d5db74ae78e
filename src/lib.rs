pub mod aggregation;
pub mod calendar;
pub mod coaching;
pub mod commands;
pub mod competitions;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod import;
pub mod llm;
pub mod logging;
pub mod models;
pub mod placement;
pub mod screenshot;
pub mod settings;
pub mod workouts;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use tracing::{info, warn};

pub use config::AppConfig;
pub use db::AppState;
pub use error::{AppError, AppResult};

/// Load `.env`, install logging, open the database and return shared state
pub async fn init() -> AppResult<Arc<AppState>> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let config = AppConfig::from_env()?;
  logging::init_tracing(&config.log_filter);

  let pool = db::initialize_db(&config.database_url).await?;
  if !config.llm.is_enabled() {
    warn!("ANTHROPIC_API_KEY not set, AI coaching is disabled");
  }
  info!("Workout Mate ready");

  Ok(AppState::new(pool, config))
}
