//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seed helpers for workouts and competitions
//! - Mock data factories
//! - Helper assertions

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqlitePool;
use url::Url;

use crate::competitions::force_create_competition;
use crate::config::{AppConfig, LlmConfig, DEFAULT_LLM_MODEL, DEFAULT_LOG_FILTER};
use crate::db::AppState;
use crate::models::{
  Competition, CompetitionType, GoalMetric, GoalPeriod, NewCompetition, NewWorkout, PersonalGoal,
  RegistrationEntry, SharingType, Workout, WorkoutType,
};
use crate::workouts::insert_workout;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Insert one workout through the validated path
pub async fn seed_workout(
  pool: &SqlitePool,
  user_id: &str,
  workout_type: WorkoutType,
  date: NaiveDate,
  distance_meters: f64,
  duration_seconds: i64,
) -> Workout {
  let new = mock_new_workout(workout_type, date, distance_meters, duration_seconds);
  insert_workout(pool, user_id, &new)
    .await
    .expect("Failed to seed workout")
}

/// Insert one competition, bypassing the duplicate check
pub async fn seed_competition(
  pool: &SqlitePool,
  competition_type: CompetitionType,
  name: &str,
  start_date: NaiveDate,
  end_date: NaiveDate,
) -> Competition {
  let new = NewCompetition {
    competition_type,
    end_date,
    ..new_competition(name, start_date)
  };
  force_create_competition(pool, &new, "admin-1")
    .await
    .expect("Failed to seed competition")
}

/// App state over `pool`. Coaching is enabled only when an LLM base URL
/// (usually a mockito server) is given.
pub fn mock_state(pool: SqlitePool, llm_base_url: Option<&str>) -> Arc<AppState> {
  let base_url = llm_base_url.unwrap_or("https://api.anthropic.com");
  let config = AppConfig {
    database_url: "sqlite::memory:".to_string(),
    log_filter: DEFAULT_LOG_FILTER.to_string(),
    llm: LlmConfig {
      api_key: llm_base_url.map(|_| "test-key".to_string()),
      model: DEFAULT_LLM_MODEL.to_string(),
      base_url: Url::parse(&format!("{}/", base_url.trim_end_matches('/'))).expect("Invalid test URL"),
    },
  };
  AppState::new(pool, config)
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// A public workout for user-1 with no optional metrics
pub fn mock_workout(
  id: i64,
  workout_type: WorkoutType,
  date: NaiveDate,
  distance_meters: f64,
  duration_seconds: i64,
) -> Workout {
  Workout {
    id,
    user_id: "user-1".to_string(),
    workout_type,
    workout_date: date,
    duration_seconds,
    distance_meters,
    avg_heart_rate: None,
    cadence: None,
    swolf: None,
    avg_power: None,
    sharing_type: SharingType::Public,
    shared_group_id: None,
    created_at: None,
  }
}

pub fn mock_new_workout(
  workout_type: WorkoutType,
  date: NaiveDate,
  distance_meters: f64,
  duration_seconds: i64,
) -> NewWorkout {
  NewWorkout {
    workout_type,
    workout_date: date,
    duration_seconds,
    distance_meters,
    avg_heart_rate: None,
    cadence: None,
    swolf: None,
    avg_power: None,
    sharing_type: SharingType::Public,
    shared_group_id: None,
  }
}

/// An active distance goal for user-1
pub fn mock_goal(activity_type: WorkoutType, period_type: GoalPeriod, target_value: f64) -> PersonalGoal {
  PersonalGoal {
    id: 1,
    user_id: "user-1".to_string(),
    activity_type,
    period_type,
    target_value,
    metric_type: GoalMetric::Distance,
    is_active: true,
    created_at: None,
  }
}

/// A one-day marathon starting on `start_date`
pub fn new_competition(name: &str, start_date: NaiveDate) -> NewCompetition {
  NewCompetition {
    competition_type: CompetitionType::Marathon,
    name: name.to_string(),
    abbreviation: None,
    start_date,
    end_date: start_date,
    start_time: Some("08:00".to_string()),
    location: "Seoul".to_string(),
    homepage_url: None,
    memo: None,
  }
}

pub fn mock_competition(id: i64, name: &str, start_date: NaiveDate, end_date: NaiveDate) -> Competition {
  Competition {
    id,
    competition_type: CompetitionType::Marathon,
    name: name.to_string(),
    abbreviation: None,
    start_date,
    end_date,
    start_time: None,
    location: "Seoul".to_string(),
    homepage_url: None,
    memo: None,
    registered_by: "admin-1".to_string(),
    created_at: None,
  }
}

pub fn mock_registration(
  id: i64,
  competition_id: i64,
  competition_name: &str,
  registration_date: NaiveDate,
) -> RegistrationEntry {
  RegistrationEntry {
    id,
    competition_id,
    competition_name: competition_name.to_string(),
    category_name: "Full".to_string(),
    registration_date,
    registration_time: Some("10:00".to_string()),
    homepage_url: None,
  }
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    // Verify key tables exist
    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN \
       ('workouts', 'competitions', 'competition_registration_periods', 'personal_goals', \
        'ai_coaching_history', 'app_settings')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 6, "Expected 6 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_schema_rejects_bad_workouts() {
    let pool = setup_test_db().await;

    // Bypasses NewWorkout::validate; the CHECK constraints still hold
    let result = sqlx::query(
      "INSERT INTO workouts (user_id, workout_type, workout_date, duration_seconds, distance_meters) \
       VALUES ('user-1', 'running', '2026-03-02', 0, 5000)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());

    let result = sqlx::query(
      "INSERT INTO workouts (user_id, workout_type, workout_date, duration_seconds, distance_meters) \
       VALUES ('user-1', 'rowing', '2026-03-02', 600, 2000)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_helpers_insert_rows() {
    let pool = setup_test_db().await;
    let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    let workout = seed_workout(&pool, "user-1", WorkoutType::Running, day, 5000.0, 1500).await;
    assert!(workout.id > 0);

    let comp = seed_competition(&pool, CompetitionType::Triathlon, "Tongyeong", day, day).await;
    assert_eq!(comp.competition_type, CompetitionType::Triathlon);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workouts")
      .fetch_one(&pool)
      .await
      .expect("Failed to count workouts");
    assert_eq!(count, 1);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    assert!(mock_new_workout(WorkoutType::Cycling, day, 30000.0, 3600).validate().is_ok());

    let workout = mock_workout(1, WorkoutType::Swimming, day, 1000.0, 1200);
    assert_eq!(workout.user_id, "user-1");
    assert!(workout.avg_heart_rate.is_none());

    let goal = mock_goal(WorkoutType::Running, GoalPeriod::Weekly, 20.0);
    assert!(goal.is_active);
  }
}
