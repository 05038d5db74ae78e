//! Environment-driven configuration
//!
//! Values come from the process environment, after an optional `.env` file
//! has been loaded by `dotenvy` in `lib::init`.

use thiserror::Error;
use url::Url;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://workout-mate.db?mode=rwc";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.anthropic.com/";
pub const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_LOG_FILTER: &str = "workout_mate_lib=info";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Invalid URL in {var}: {message}")]
  InvalidUrl { var: &'static str, message: String },

  #[error("{0} must not be empty")]
  Empty(&'static str),
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
  /// None disables coaching
  pub api_key: Option<String>,
  pub model: String,
  /// Always ends with '/' so endpoint paths join under it
  pub base_url: Url,
}

impl LlmConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let api_key = non_blank("ANTHROPIC_API_KEY");
    let model = non_blank("WORKOUT_MATE_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
    let base_url = match non_blank("WORKOUT_MATE_LLM_BASE_URL") {
      Some(raw) => parse_base_url("WORKOUT_MATE_LLM_BASE_URL", &raw)?,
      None => parse_base_url("WORKOUT_MATE_LLM_BASE_URL", DEFAULT_LLM_BASE_URL)?,
    };

    Ok(Self { api_key, model, base_url })
  }

  pub fn is_enabled(&self) -> bool {
    self.api_key.is_some()
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub database_url: String,
  pub log_filter: String,
  pub llm: LlmConfig,
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let database_url = match std::env::var("DATABASE_URL") {
      Ok(v) if v.trim().is_empty() => return Err(ConfigError::Empty("DATABASE_URL")),
      Ok(v) => v.trim().to_string(),
      Err(_) => DEFAULT_DATABASE_URL.to_string(),
    };

    // WORKOUT_MATE_LOG wins over the generic RUST_LOG
    let log_filter = non_blank("WORKOUT_MATE_LOG")
      .or_else(|| non_blank("RUST_LOG"))
      .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    Ok(Self {
      database_url,
      log_filter,
      llm: LlmConfig::from_env()?,
    })
  }
}

fn non_blank(var: &str) -> Option<String> {
  std::env::var(var)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

fn parse_base_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
  let mut url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
    var,
    message: e.to_string(),
  })?;
  if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
    return Err(ConfigError::InvalidUrl {
      var,
      message: format!("{} is not an http(s) base URL", raw),
    });
  }
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
