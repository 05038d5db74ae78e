//! Top-level error for command entry points

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::calendar::CalendarError;
use crate::coaching::CoachingError;
use crate::config::ConfigError;
use crate::import::ImportError;
use crate::llm::LlmError;
use crate::models::ValidationError;
use crate::screenshot::ScreenshotError;
use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Calendar(#[from] CalendarError),

  #[error("Invalid workout: {0}")]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Import(#[from] ImportError),

  #[error(transparent)]
  Settings(#[from] SettingsError),

  #[error(transparent)]
  Coaching(#[from] CoachingError),

  #[error(transparent)]
  Screenshot(#[from] ScreenshotError),

  #[error(transparent)]
  Llm(#[from] LlmError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("{0} not found")]
  NotFound(String),

  #[error("Invalid input: {0}")]
  InvalidInput(String),
}

/// Serialised as the display message so a UI can show it directly
impl Serialize for AppError {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_string())
  }
}

pub type AppResult<T> = Result<T, AppError>;
