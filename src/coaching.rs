//! AI coaching advice built from the last month of training
//!
//! The prompt summarises recent workouts and active goals; the reply is free
//! text that may end with a fenced JSON block of goal recommendations.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{info, warn};

use crate::calendar::DateWindow;
use crate::format::{format_distance, format_duration, format_pace};
use crate::llm::{extract_json, LlmClient, LlmError, Usage};
use crate::models::{CoachingHistory, GoalRecommendation, PersonalGoal, Workout, WorkoutType};
use crate::workouts::{fetch_active_goals, fetch_user_workouts_between};

/// Detailed workout lines included in the prompt
pub const RECENT_WORKOUT_LINES: usize = 20;

const MAX_TOKENS: u32 = 2000;

#[derive(Debug, Error)]
pub enum CoachingError {
  #[error("No workouts in the last month, log some training first")]
  NoRecentWorkouts,

  #[error("Coaching content is empty")]
  EmptyContent,

  #[error(transparent)]
  Llm(#[from] LlmError),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Failed to encode recommendations: {0}")]
  Encode(#[from] serde_json::Error),
}

/// ---------------------------------------------------------------------------
/// Statistics
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TypeStats {
  pub count: u32,
  pub total_distance: f64,
  pub total_duration: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoachingStats {
  pub total_workouts: u32,
  pub workout_days: u32,
  pub by_type: BTreeMap<WorkoutType, TypeStats>,
}

impl CoachingStats {
  pub fn from_workouts(workouts: &[Workout]) -> Self {
    let mut by_type: BTreeMap<WorkoutType, TypeStats> = BTreeMap::new();
    for w in workouts {
      let entry = by_type.entry(w.workout_type).or_default();
      entry.count += 1;
      entry.total_distance += w.distance_meters;
      entry.total_duration += w.duration_seconds;
    }

    let days: HashSet<NaiveDate> = workouts.iter().map(|w| w.workout_date).collect();
    Self {
      total_workouts: workouts.len() as u32,
      workout_days: days.len() as u32,
      by_type,
    }
  }
}

/// One month back from `today`, inclusive
pub fn coaching_window(today: NaiveDate) -> DateWindow {
  DateWindow {
    start: today.checked_sub_months(Months::new(1)).unwrap_or(today),
    end: today,
  }
}

/// ---------------------------------------------------------------------------
/// Prompt
/// ---------------------------------------------------------------------------

pub fn system_prompt() -> &'static str {
  include_str!("prompts/coach_system.txt")
}

fn workout_line(w: &Workout) -> String {
  let mut line = format!(
    "- {}: {}, {}, {}",
    w.workout_date,
    w.workout_type,
    format_distance(w.distance_meters, w.workout_type),
    format_duration(w.duration_seconds)
  );

  let swimming = w.workout_type.is_swimming();
  if let Some(pace) = crate::aggregation::pace(w.distance_meters, w.duration_seconds, swimming) {
    let unit = if swimming { "100m" } else { "km" };
    let _ = write!(line, ", pace {}/{}", format_pace(pace), unit);
  }
  if let Some(hr) = w.avg_heart_rate {
    let _ = write!(line, ", HR {}bpm", hr);
  }
  if let Some(cadence) = w.cadence {
    let _ = write!(line, ", cadence {}", cadence);
  }
  line
}

/// The user message sent with the coaching system prompt
pub fn build_prompt(
  overall_goal: Option<&str>,
  workouts: &[Workout],
  goals: &[PersonalGoal],
) -> Result<String, CoachingError> {
  if workouts.is_empty() {
    return Err(CoachingError::NoRecentWorkouts);
  }

  let mut sorted: Vec<&Workout> = workouts.iter().collect();
  sorted.sort_by_key(|w| (w.workout_date, w.id));

  let stats = CoachingStats::from_workouts(workouts);
  let mut prompt = String::new();

  let goal = overall_goal.map(str::trim).filter(|g| !g.is_empty());
  let _ = writeln!(prompt, "OVERALL GOAL:\n{}\n", goal.unwrap_or("no overall goal set"));

  let _ = writeln!(prompt, "LAST MONTH:");
  let _ = writeln!(prompt, "- total workouts: {}", stats.total_workouts);
  let _ = writeln!(prompt, "- days trained: {}", stats.workout_days);
  for (workout_type, s) in &stats.by_type {
    let _ = writeln!(
      prompt,
      "  * {}: {} sessions, {} total, {} min total",
      workout_type,
      s.count,
      format_distance(s.total_distance, *workout_type),
      (s.total_duration as f64 / 60.0).round() as i64
    );
  }

  let _ = writeln!(prompt, "\nCURRENT GOALS:");
  if goals.is_empty() {
    let _ = writeln!(prompt, "none set");
  }
  for g in goals {
    let _ = writeln!(
      prompt,
      "- {} ({}): {}{}",
      g.activity_type,
      g.period_type.as_str(),
      g.target_value,
      g.activity_type.distance_unit()
    );
  }

  let _ = writeln!(prompt, "\nRECENT WORKOUTS (up to {}):", RECENT_WORKOUT_LINES);
  let skip = sorted.len().saturating_sub(RECENT_WORKOUT_LINES);
  for w in sorted.into_iter().skip(skip) {
    let _ = writeln!(prompt, "{}", workout_line(w));
  }

  Ok(prompt)
}

#[derive(Debug, Deserialize)]
struct RecommendationBlock {
  goal_recommendations: Vec<GoalRecommendation>,
}

/// Goal adjustments from the trailing JSON block; empty when there is none
pub fn parse_goal_recommendations(reply: &str) -> Vec<GoalRecommendation> {
  let Ok(json) = extract_json(reply) else {
    return Vec::new();
  };
  match serde_json::from_str::<RecommendationBlock>(&json) {
    Ok(block) => block.goal_recommendations,
    Err(e) => {
      warn!("Ignoring malformed goal recommendations: {}", e);
      Vec::new()
    }
  }
}

/// ---------------------------------------------------------------------------
/// Advice
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CoachingAdvice {
  pub content: String,
  pub goal_recommendations: Vec<GoalRecommendation>,
  pub usage: Usage,
}

/// Gather the user's last month, ask the model, and split out recommendations
pub async fn request_advice(
  pool: &SqlitePool,
  client: &LlmClient,
  user_id: &str,
  overall_goal: Option<&str>,
  today: NaiveDate,
) -> Result<CoachingAdvice, CoachingError> {
  let workouts = fetch_user_workouts_between(pool, user_id, coaching_window(today)).await?;
  if workouts.is_empty() {
    return Err(CoachingError::NoRecentWorkouts);
  }
  let goals = fetch_active_goals(pool, user_id).await?;

  let prompt = build_prompt(overall_goal, &workouts, &goals)?;
  let (content, usage) = client.complete(system_prompt(), &prompt, MAX_TOKENS).await?;
  let goal_recommendations = parse_goal_recommendations(&content);

  info!(
    "Coaching for {}: {} workouts, {} recommendations, {}+{} tokens",
    user_id,
    workouts.len(),
    goal_recommendations.len(),
    usage.input_tokens,
    usage.output_tokens
  );

  Ok(CoachingAdvice {
    content,
    goal_recommendations,
    usage,
  })
}

/// ---------------------------------------------------------------------------
/// History
/// ---------------------------------------------------------------------------

pub async fn save_coaching(
  pool: &SqlitePool,
  user_id: &str,
  content: &str,
  recommendations: &[GoalRecommendation],
) -> Result<CoachingHistory, CoachingError> {
  if content.trim().is_empty() {
    return Err(CoachingError::EmptyContent);
  }

  let recommendations_json = if recommendations.is_empty() {
    None
  } else {
    Some(serde_json::to_string(recommendations)?)
  };

  let row = sqlx::query(
    r#"
    INSERT INTO ai_coaching_history (user_id, coaching_content, goal_recommendations)
    VALUES (?1, ?2, ?3)
    RETURNING id, user_id, coaching_content, goal_recommendations, created_at
    "#,
  )
  .bind(user_id)
  .bind(content)
  .bind(&recommendations_json)
  .fetch_one(pool)
  .await?;

  Ok(history_from_row(&row))
}

/// Most recent saved advice for `user_id`
pub async fn latest_coaching(pool: &SqlitePool, user_id: &str) -> Result<Option<CoachingHistory>, CoachingError> {
  let row = sqlx::query(
    r#"
    SELECT id, user_id, coaching_content, goal_recommendations, created_at
    FROM ai_coaching_history
    WHERE user_id = ?1
    ORDER BY created_at DESC, id DESC
    LIMIT 1
    "#,
  )
  .bind(user_id)
  .fetch_optional(pool)
  .await?;

  Ok(row.as_ref().map(history_from_row))
}

fn history_from_row(row: &sqlx::sqlite::SqliteRow) -> CoachingHistory {
  let recommendations: Option<String> = row.get("goal_recommendations");
  let created_at = row
    .try_get::<Option<DateTime<Utc>>, _>("created_at")
    .ok()
    .flatten();

  CoachingHistory {
    id: row.get("id"),
    user_id: row.get("user_id"),
    coaching_content: row.get("coaching_content"),
    goal_recommendations: recommendations.and_then(|json| {
      serde_json::from_str(&json)
        .map_err(|e| warn!("Unreadable stored recommendations: {}", e))
        .ok()
    }),
    created_at,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::LlmConfig;
  use crate::models::GoalPeriod;
  use crate::test_utils::{mock_goal, mock_workout, seed_workout, setup_test_db, teardown_test_db};

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn recommendation() -> GoalRecommendation {
    GoalRecommendation {
      activity_type: "running".to_string(),
      period_type: "weekly".to_string(),
      current_target: 20.0,
      recommended_target: 25.0,
      reason: "Consistent 25 km weeks".to_string(),
    }
  }

  #[test]
  fn test_stats_count_types_and_days() {
    let workouts = vec![
      mock_workout(1, WorkoutType::Running, date(2026, 10, 1), 5000.0, 1500),
      mock_workout(2, WorkoutType::Running, date(2026, 10, 1), 3000.0, 900),
      mock_workout(3, WorkoutType::Swimming, date(2026, 10, 3), 1500.0, 1800),
    ];
    let stats = CoachingStats::from_workouts(&workouts);
    assert_eq!(stats.total_workouts, 3);
    assert_eq!(stats.workout_days, 2);
    assert_eq!(stats.by_type[&WorkoutType::Running].count, 2);
    assert_eq!(stats.by_type[&WorkoutType::Running].total_distance, 8000.0);
    assert_eq!(stats.by_type[&WorkoutType::Swimming].total_duration, 1800);
  }

  #[test]
  fn test_window_is_one_month() {
    let window = coaching_window(date(2026, 3, 31));
    assert_eq!(window.start, date(2026, 2, 28));
    assert_eq!(window.end, date(2026, 3, 31));
  }

  #[test]
  fn test_prompt_requires_workouts() {
    assert!(matches!(build_prompt(None, &[], &[]), Err(CoachingError::NoRecentWorkouts)));
  }

  #[test]
  fn test_prompt_contents() {
    let mut run = mock_workout(1, WorkoutType::Running, date(2026, 10, 2), 5000.0, 1500);
    run.avg_heart_rate = Some(151);
    let swim = mock_workout(2, WorkoutType::Swimming, date(2026, 10, 1), 1000.0, 1200);
    let treadmill = mock_workout(3, WorkoutType::Treadmill, date(2026, 10, 3), 0.0, 1800);
    let goals = vec![mock_goal(WorkoutType::Swimming, GoalPeriod::Weekly, 3000.0)];

    let prompt = build_prompt(Some("  Sub-4 marathon in April "), &[run, swim, treadmill], &goals).unwrap();

    assert!(prompt.contains("Sub-4 marathon in April"));
    assert!(prompt.contains("- total workouts: 3"));
    assert!(prompt.contains("- swimming (weekly): 3000m"));
    assert!(prompt.contains("- 2026-10-02: running, 5.00km, 25:00, pace 5'00''/km, HR 151bpm"));
    assert!(prompt.contains("- 2026-10-01: swimming, 1000m, 20:00, pace 2'00''/100m"));
    // zero distance: no pace
    assert!(prompt.contains("- 2026-10-03: treadmill, 0.00km, 30:00\n"));

    // oldest first
    let swim_at = prompt.find("2026-10-01: swimming").unwrap();
    let run_at = prompt.find("2026-10-02: running").unwrap();
    assert!(swim_at < run_at);
  }

  #[test]
  fn test_prompt_without_goal_or_targets() {
    let workouts = vec![mock_workout(1, WorkoutType::Hiking, date(2026, 10, 2), 12000.0, 14400)];
    let prompt = build_prompt(Some("   "), &workouts, &[]).unwrap();
    assert!(prompt.contains("no overall goal set"));
    assert!(prompt.contains("CURRENT GOALS:\nnone set"));
  }

  #[test]
  fn test_prompt_keeps_last_twenty() {
    let workouts: Vec<_> = (1..=25)
      .map(|d| mock_workout(d as i64, WorkoutType::Running, date(2026, 10, d), 5000.0, 1500))
      .collect();
    let prompt = build_prompt(None, &workouts, &[]).unwrap();
    assert!(!prompt.contains("2026-10-05: running"));
    assert!(prompt.contains("2026-10-06: running"));
    assert!(prompt.contains("2026-10-25: running"));
  }

  #[test]
  fn test_parse_recommendations() {
    let reply = r#"### Data insights
- Solid consistency.

```json
{
  "goal_recommendations": [
    {
      "activity_type": "running",
      "period_type": "weekly",
      "current_target": 20,
      "recommended_target": 25,
      "reason": "Consistent 25 km weeks"
    }
  ]
}
```"#;
    assert_eq!(parse_goal_recommendations(reply), vec![recommendation()]);
    assert!(parse_goal_recommendations("Just keep going.").is_empty());
    assert!(parse_goal_recommendations("```json\n{\"other\": 1}\n```").is_empty());
  }

  #[tokio::test]
  async fn test_save_and_fetch_latest() {
    let pool = setup_test_db().await;

    assert!(latest_coaching(&pool, "user-1").await.unwrap().is_none());

    save_coaching(&pool, "user-1", "first advice", &[]).await.unwrap();
    let saved = save_coaching(&pool, "user-1", "second advice", &[recommendation()])
      .await
      .unwrap();
    assert_eq!(saved.goal_recommendations, Some(vec![recommendation()]));

    let latest = latest_coaching(&pool, "user-1").await.unwrap().expect("Should have history");
    assert_eq!(latest.coaching_content, "second advice");
    assert_eq!(latest.goal_recommendations, Some(vec![recommendation()]));
    assert!(latest.created_at.is_some());

    assert!(latest_coaching(&pool, "user-2").await.unwrap().is_none());
    assert!(matches!(
      save_coaching(&pool, "user-1", "  ", &[]).await,
      Err(CoachingError::EmptyContent)
    ));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_request_advice_end_to_end() {
    let pool = setup_test_db().await;
    seed_workout(&pool, "user-1", WorkoutType::Running, date(2026, 10, 10), 10000.0, 3000).await;
    seed_workout(&pool, "user-1", WorkoutType::Running, date(2026, 8, 1), 10000.0, 3000).await;

    let mut server = mockito::Server::new_async().await;
    let reply = serde_json::json!({
      "content": [{"type": "text", "text": "Nice block.\n```json\n{\"goal_recommendations\": []}\n```"}],
      "usage": {"input_tokens": 300, "output_tokens": 40}
    });
    let mock = server
      .mock("POST", "/v1/messages")
      .match_body(mockito::Matcher::Regex("2026-10-10: running".to_string()))
      .with_status(200)
      .with_body(reply.to_string())
      .create_async()
      .await;

    let config = LlmConfig {
      api_key: Some("test-key".to_string()),
      model: "claude-test".to_string(),
      base_url: url::Url::parse(&format!("{}/", server.url())).unwrap(),
    };
    let client = LlmClient::new(&config).unwrap();

    let advice = request_advice(&pool, &client, "user-1", None, date(2026, 10, 18))
      .await
      .expect("Should produce advice");
    assert!(advice.content.starts_with("Nice block."));
    assert!(advice.goal_recommendations.is_empty());
    assert_eq!(advice.usage.output_tokens, 40);
    mock.assert_async().await;

    let none = request_advice(&pool, &client, "user-9", None, date(2026, 10, 18)).await;
    assert!(matches!(none, Err(CoachingError::NoRecentWorkouts)));

    teardown_test_db(pool).await;
  }
}
