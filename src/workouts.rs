//! Workout and personal goal storage

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::calendar::DateWindow;
use crate::error::AppError;
use crate::models::{NewPersonalGoal, NewWorkout, PersonalGoal, Workout};

const WORKOUT_COLUMNS: &str = "id, user_id, workout_type, workout_date, duration_seconds, \
  distance_meters, avg_heart_rate, cadence, swolf, avg_power, sharing_type, shared_group_id, created_at";

/// Validate and store a workout for `user_id`
pub async fn insert_workout(pool: &SqlitePool, user_id: &str, new: &NewWorkout) -> Result<Workout, AppError> {
  new.validate()?;

  let workout = sqlx::query_as::<_, Workout>(&format!(
    r#"
    INSERT INTO workouts (
      user_id, workout_type, workout_date, duration_seconds, distance_meters,
      avg_heart_rate, cadence, swolf, avg_power, sharing_type, shared_group_id
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    RETURNING {}
    "#,
    WORKOUT_COLUMNS
  ))
  .bind(user_id)
  .bind(new.workout_type)
  .bind(new.workout_date)
  .bind(new.duration_seconds)
  .bind(new.distance_meters)
  .bind(new.avg_heart_rate)
  .bind(new.cadence)
  .bind(new.swolf)
  .bind(new.avg_power)
  .bind(new.sharing_type)
  .bind(&new.shared_group_id)
  .fetch_one(pool)
  .await?;

  info!("Stored {} workout {} for {}", workout.workout_type, workout.id, user_id);
  Ok(workout)
}

/// Full history for one user, newest first
pub async fn fetch_user_workouts(pool: &SqlitePool, user_id: &str) -> Result<Vec<Workout>, sqlx::Error> {
  sqlx::query_as::<_, Workout>(&format!(
    "SELECT {} FROM workouts WHERE user_id = ?1 ORDER BY workout_date DESC, id DESC",
    WORKOUT_COLUMNS
  ))
  .bind(user_id)
  .fetch_all(pool)
  .await
}

/// One user's workouts dated inside `window`, newest first
pub async fn fetch_user_workouts_between(
  pool: &SqlitePool,
  user_id: &str,
  window: DateWindow,
) -> Result<Vec<Workout>, sqlx::Error> {
  sqlx::query_as::<_, Workout>(&format!(
    r#"
    SELECT {} FROM workouts
    WHERE user_id = ?1 AND workout_date >= ?2 AND workout_date <= ?3
    ORDER BY workout_date DESC, id DESC
    "#,
    WORKOUT_COLUMNS
  ))
  .bind(user_id)
  .bind(window.start)
  .bind(window.end)
  .fetch_all(pool)
  .await
}

/// Workouts of several members inside `window` for a group view.
/// Private workouts are never included.
pub async fn fetch_shared_workouts_between(
  pool: &SqlitePool,
  user_ids: &[String],
  window: DateWindow,
) -> Result<Vec<Workout>, sqlx::Error> {
  if user_ids.is_empty() {
    return Ok(Vec::new());
  }

  let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
    "SELECT {} FROM workouts WHERE sharing_type != 'private' AND workout_date >= ",
    WORKOUT_COLUMNS
  ));
  query.push_bind(window.start);
  query.push(" AND workout_date <= ");
  query.push_bind(window.end);
  query.push(" AND user_id IN (");
  let mut separated = query.separated(", ");
  for id in user_ids {
    separated.push_bind(id.as_str());
  }
  separated.push_unseparated(")");
  query.push(" ORDER BY workout_date DESC, id DESC");

  let workouts = query.build_query_as::<Workout>().fetch_all(pool).await?;
  debug!("Fetched {} shared workouts for {} members", workouts.len(), user_ids.len());
  Ok(workouts)
}

/// ---------------------------------------------------------------------------
/// Personal Goals
/// ---------------------------------------------------------------------------

pub async fn fetch_active_goals(pool: &SqlitePool, user_id: &str) -> Result<Vec<PersonalGoal>, sqlx::Error> {
  sqlx::query_as::<_, PersonalGoal>(
    r#"
    SELECT id, user_id, activity_type, period_type, target_value, metric_type, is_active, created_at
    FROM personal_goals
    WHERE user_id = ?1 AND is_active = 1
    ORDER BY activity_type, period_type
    "#,
  )
  .bind(user_id)
  .fetch_all(pool)
  .await
}

/// Set the target for one (activity, period, metric); re-activates it if needed
pub async fn upsert_goal(
  pool: &SqlitePool,
  user_id: &str,
  goal: &NewPersonalGoal,
) -> Result<PersonalGoal, sqlx::Error> {
  sqlx::query_as::<_, PersonalGoal>(
    r#"
    INSERT INTO personal_goals (user_id, activity_type, period_type, target_value, metric_type, is_active)
    VALUES (?1, ?2, ?3, ?4, ?5, 1)
    ON CONFLICT(user_id, activity_type, period_type, metric_type) DO UPDATE SET
      target_value = excluded.target_value,
      is_active = 1
    RETURNING id, user_id, activity_type, period_type, target_value, metric_type, is_active, created_at
    "#,
  )
  .bind(user_id)
  .bind(goal.activity_type)
  .bind(goal.period_type)
  .bind(goal.target_value)
  .bind(goal.metric_type)
  .fetch_one(pool)
  .await
}

pub async fn deactivate_goal(pool: &SqlitePool, user_id: &str, goal_id: i64) -> Result<bool, sqlx::Error> {
  let result = sqlx::query("UPDATE personal_goals SET is_active = 0 WHERE id = ?1 AND user_id = ?2")
    .bind(goal_id)
    .bind(user_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

/// Inclusive window from `from` through `to`
pub fn window(from: NaiveDate, to: NaiveDate) -> DateWindow {
  DateWindow { start: from.min(to), end: from.max(to) }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
