//! Persisted view settings behind a small key/value port
//!
//! Calendar filters and chart options are plain values. They are loaded once
//! from a `SettingsStore`, edited in memory and written back explicitly.
//! Every key is scoped to one user.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;

use crate::aggregation::ChartOptions;
use crate::models::CompetitionType;

pub const FILTER_KEY: &str = "workout_mate_competition_filters";
pub const CHART_KEY: &str = "workout_mate_chart_options";

/// `base` scoped to one user, e.g. `workout_mate_chart_options:user-1`
pub fn user_key(base: &str, user_id: &str) -> String {
  format!("{}:{}", base, user_id)
}

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("Settings store error: {0}")]
  Store(#[from] sqlx::Error),

  #[error("Failed to encode setting {key}: {message}")]
  Encode { key: String, message: String },
}

/// ---------------------------------------------------------------------------
/// Store Port
/// ---------------------------------------------------------------------------

/// String key/value persistence for UI state
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
  async fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;
  async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// Process-local store, used in tests and before a database is available
#[derive(Debug, Default)]
pub struct MemoryStore {
  values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SettingsStore for MemoryStore {
  async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
    let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
    Ok(values.get(key).cloned())
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
    let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
    values.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// Store backed by the `app_settings` table
#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }
}

impl SettingsStore for SqliteStore {
  async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM app_settings WHERE key = ?1")
      .bind(key)
      .fetch_optional(&self.pool)
      .await?;
    Ok(value)
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
    sqlx::query(
      r#"
      INSERT INTO app_settings (key, value, updated_at)
      VALUES (?1, ?2, datetime('now'))
      ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(key)
    .bind(value)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// View Settings
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
  /// Competition types shown on the calendar; never empty
  pub competition_filters: Vec<CompetitionType>,
  pub chart: ChartOptions,
}

impl Default for ViewSettings {
  fn default() -> Self {
    Self {
      competition_filters: CompetitionType::ALL.to_vec(),
      chart: ChartOptions::default(),
    }
  }
}

fn decode_filters(raw: Option<String>) -> Vec<CompetitionType> {
  let Some(raw) = raw else {
    return CompetitionType::ALL.to_vec();
  };

  match serde_json::from_str::<Vec<CompetitionType>>(&raw) {
    Ok(mut filters) if !filters.is_empty() => {
      filters.sort();
      filters.dedup();
      filters
    }
    Ok(_) => CompetitionType::ALL.to_vec(),
    Err(e) => {
      warn!("Ignoring unreadable competition filters: {}", e);
      CompetitionType::ALL.to_vec()
    }
  }
}

fn decode_chart(raw: Option<String>) -> ChartOptions {
  match raw.map(|r| serde_json::from_str::<ChartOptions>(&r)) {
    Some(Ok(chart)) => chart,
    Some(Err(e)) => {
      warn!("Ignoring unreadable chart options: {}", e);
      ChartOptions::default()
    }
    None => ChartOptions::default(),
  }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, SettingsError> {
  serde_json::to_string(value).map_err(|e| SettingsError::Encode {
    key: key.to_string(),
    message: e.to_string(),
  })
}

impl ViewSettings {
  /// Read `user_id`'s settings, falling back to defaults for anything
  /// missing or corrupt
  pub async fn load<S: SettingsStore>(store: &S, user_id: &str) -> Result<Self, SettingsError> {
    let competition_filters = decode_filters(store.get(&user_key(FILTER_KEY, user_id)).await?);
    let chart = decode_chart(store.get(&user_key(CHART_KEY, user_id)).await?);
    Ok(Self { competition_filters, chart })
  }

  /// Whether `user_id` has ever saved chart options
  pub async fn has_saved_chart<S: SettingsStore>(store: &S, user_id: &str) -> Result<bool, SettingsError> {
    Ok(store.get(&user_key(CHART_KEY, user_id)).await?.is_some())
  }

  pub async fn save<S: SettingsStore>(&self, store: &S, user_id: &str) -> Result<(), SettingsError> {
    let filter_key = user_key(FILTER_KEY, user_id);
    let chart_key = user_key(CHART_KEY, user_id);
    store.set(&filter_key, &encode(&filter_key, &self.competition_filters)?).await?;
    store.set(&chart_key, &encode(&chart_key, &self.chart)?).await?;
    Ok(())
  }

  /// Flip one type in or out of the filter. Removing the last remaining
  /// type is refused; returns whether anything changed.
  pub fn toggle_filter(&mut self, competition_type: CompetitionType) -> bool {
    if let Some(pos) = self.competition_filters.iter().position(|t| *t == competition_type) {
      if self.competition_filters.len() == 1 {
        return false;
      }
      self.competition_filters.remove(pos);
    } else {
      self.competition_filters.push(competition_type);
      self.competition_filters.sort();
    }
    true
  }

  pub fn select_all(&mut self) {
    self.competition_filters = CompetitionType::ALL.to_vec();
  }

  /// Types to restrict a query to, or None when every type is selected
  pub fn type_filter(&self) -> Option<&[CompetitionType]> {
    let all = CompetitionType::ALL
      .iter()
      .all(|t| self.competition_filters.contains(t));
    (!all).then_some(self.competition_filters.as_slice())
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
