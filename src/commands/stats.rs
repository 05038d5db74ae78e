//! Workout statistics: personal chart, goal dashboard, group leaderboard

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

use crate::aggregation::{
  aggregate, goal_progress, iso_week_bounds, latest_activity, leaderboard, ActivityFilter,
  AggregationBucket, ChartOptions, GoalProgress, Member, MemberStats, StatsRange,
};
use crate::db::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{NewPersonalGoal, PersonalGoal, WorkoutType};
use crate::settings::{SqliteStore, ViewSettings};
use crate::workouts::{
  deactivate_goal, fetch_active_goals, fetch_shared_workouts_between, fetch_user_workouts,
  fetch_user_workouts_between, upsert_goal, window,
};

/// ---------------------------------------------------------------------------
/// Personal Chart
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
  pub options: ChartOptions,
  pub offset: u32,
  pub buckets: Vec<AggregationBucket>,
}

pub async fn get_workout_chart(
  state: &AppState,
  user_id: &str,
  options: Option<ChartOptions>,
  offset: u32,
) -> AppResult<ChartView> {
  workout_chart(state, user_id, options, offset, Local::now().date_naive()).await
}

/// Chart for `user_id`. Options passed in are remembered for next time;
/// without them the user's saved options are used, and before anything was
/// saved the chart follows the type of the latest workout.
pub async fn workout_chart(
  state: &AppState,
  user_id: &str,
  options: Option<ChartOptions>,
  offset: u32,
  today: NaiveDate,
) -> AppResult<ChartView> {
  let store = SqliteStore::new(state.db.clone());
  let mut settings = ViewSettings::load(&store, user_id).await?;
  let workouts = fetch_user_workouts(&state.db, user_id).await?;

  let options = match options {
    Some(options) => {
      if settings.chart != options {
        settings.chart = options;
        settings.save(&store, user_id).await?;
      }
      options
    }
    None => {
      if ViewSettings::has_saved_chart(&store, user_id).await? {
        settings.chart
      } else {
        ChartOptions {
          activity: latest_activity(&workouts).map_or_else(ActivityFilter::default, ActivityFilter::of),
          ..settings.chart
        }
      }
    }
  };

  let buckets = aggregate(&workouts, &options, offset, today).ok_or_else(|| {
    AppError::InvalidInput(format!(
      "offset {} reaches past the earliest {:?} period that can be charted",
      offset, options.period
    ))
  })?;

  Ok(ChartView {
    options,
    offset,
    buckets,
  })
}

/// ---------------------------------------------------------------------------
/// Goals
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GoalDashboard {
  pub activity: WorkoutType,
  pub progress: Vec<GoalProgress>,
}

pub async fn get_goal_dashboard(
  state: &AppState,
  user_id: &str,
  activity: Option<WorkoutType>,
) -> AppResult<GoalDashboard> {
  goal_dashboard(state, user_id, activity, Local::now().date_naive()).await
}

/// Weekly, monthly and yearly progress. Without an explicit activity the
/// type of the latest workout ever logged is shown, falling back to running.
pub async fn goal_dashboard(
  state: &AppState,
  user_id: &str,
  activity: Option<WorkoutType>,
  today: NaiveDate,
) -> AppResult<GoalDashboard> {
  // The ISO week can straddle New Year, so cover both it and the calendar year
  let (week_start, week_end) = iso_week_bounds(today);
  let year_start = today.with_ordinal(1).unwrap_or(today);
  let year_end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
  let span = window(week_start.min(year_start), week_end.max(year_end));

  let workouts = fetch_user_workouts_between(&state.db, user_id, span).await?;
  let goals = fetch_active_goals(&state.db, user_id).await?;

  let activity = match activity {
    Some(activity) => activity,
    None => {
      let history = fetch_user_workouts(&state.db, user_id).await?;
      latest_activity(&history).unwrap_or(WorkoutType::Running)
    }
  };

  Ok(GoalDashboard {
    activity,
    progress: goal_progress(&workouts, &goals, activity, today),
  })
}

pub async fn set_goal(state: &AppState, user_id: &str, goal: NewPersonalGoal) -> AppResult<PersonalGoal> {
  if !goal.target_value.is_finite() || goal.target_value <= 0.0 {
    return Err(AppError::InvalidInput(format!(
      "goal target must be positive, got {}",
      goal.target_value
    )));
  }
  Ok(upsert_goal(&state.db, user_id, &goal).await?)
}

pub async fn remove_goal(state: &AppState, user_id: &str, goal_id: i64) -> AppResult<()> {
  if deactivate_goal(&state.db, user_id, goal_id).await? {
    Ok(())
  } else {
    Err(AppError::NotFound(format!("Goal {}", goal_id)))
  }
}

/// ---------------------------------------------------------------------------
/// Group Leaderboard
/// ---------------------------------------------------------------------------

pub async fn get_group_leaderboard(
  state: &AppState,
  members: &[Member],
  selected: WorkoutType,
  range: StatsRange,
) -> AppResult<Vec<MemberStats>> {
  group_leaderboard(state, members, selected, range, Local::now().date_naive()).await
}

pub async fn group_leaderboard(
  state: &AppState,
  members: &[Member],
  selected: WorkoutType,
  range: StatsRange,
  today: NaiveDate,
) -> AppResult<Vec<MemberStats>> {
  let user_ids: Vec<String> = members.iter().map(|m| m.user_id.clone()).collect();
  let workouts = fetch_shared_workouts_between(&state.db, &user_ids, range.bounds(today)).await?;
  Ok(leaderboard(members, &workouts, selected))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
