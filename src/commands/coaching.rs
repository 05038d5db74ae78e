//! AI coaching commands

use chrono::{Local, NaiveDate};

use crate::coaching::{latest_coaching, request_advice, save_coaching, CoachingAdvice};
use crate::db::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{CoachingHistory, GoalMetric, GoalPeriod, GoalRecommendation, NewPersonalGoal, PersonalGoal, WorkoutType};
use crate::workouts::upsert_goal;

/// Ask the coach about the last month of training
pub async fn request_coaching(
  state: &AppState,
  user_id: &str,
  overall_goal: Option<String>,
) -> AppResult<CoachingAdvice> {
  coaching_advice(state, user_id, overall_goal, Local::now().date_naive()).await
}

pub async fn coaching_advice(
  state: &AppState,
  user_id: &str,
  overall_goal: Option<String>,
  today: NaiveDate,
) -> AppResult<CoachingAdvice> {
  let client = state.llm_client()?;
  Ok(request_advice(&state.db, &client, user_id, overall_goal.as_deref(), today).await?)
}

/// Keep advice the user chose to save
pub async fn save_coaching_advice(
  state: &AppState,
  user_id: &str,
  content: String,
  goal_recommendations: Vec<GoalRecommendation>,
) -> AppResult<CoachingHistory> {
  Ok(save_coaching(&state.db, user_id, &content, &goal_recommendations).await?)
}

pub async fn get_latest_coaching(state: &AppState, user_id: &str) -> AppResult<Option<CoachingHistory>> {
  Ok(latest_coaching(&state.db, user_id).await?)
}

/// Turn a recommendation into the user's distance goal for that period
pub async fn apply_goal_recommendation(
  state: &AppState,
  user_id: &str,
  recommendation: &GoalRecommendation,
) -> AppResult<PersonalGoal> {
  let activity_type: WorkoutType = recommendation
    .activity_type
    .parse()
    .map_err(AppError::InvalidInput)?;
  let period_type: GoalPeriod = recommendation
    .period_type
    .parse()
    .map_err(AppError::InvalidInput)?;
  if !recommendation.recommended_target.is_finite() || recommendation.recommended_target <= 0.0 {
    return Err(AppError::InvalidInput(format!(
      "recommended target must be positive, got {}",
      recommendation.recommended_target
    )));
  }

  let goal = NewPersonalGoal {
    activity_type,
    period_type,
    target_value: recommendation.recommended_target,
    metric_type: GoalMetric::Distance,
  };
  Ok(upsert_goal(&state.db, user_id, &goal).await?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::coaching::CoachingError;
  use crate::llm::LlmError;
  use crate::test_utils::{mock_state, seed_workout, setup_test_db, teardown_test_db};
  use crate::workouts::fetch_active_goals;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn recommendation(activity: &str, period: &str, target: f64) -> GoalRecommendation {
    GoalRecommendation {
      activity_type: activity.to_string(),
      period_type: period.to_string(),
      current_target: 20.0,
      recommended_target: target,
      reason: "Steady progress".to_string(),
    }
  }

  #[tokio::test]
  async fn test_coaching_without_api_key() {
    let pool = setup_test_db().await;
    let state = mock_state(pool.clone(), None);

    let result = coaching_advice(&state, "user-1", None, date(2026, 10, 18)).await;
    assert!(matches!(result, Err(AppError::Llm(LlmError::MissingApiKey))));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_coaching_round_trip_through_history() {
    // Arrange
    let pool = setup_test_db().await;
    seed_workout(&pool, "user-1", WorkoutType::Running, date(2026, 10, 12), 8000.0, 2400).await;

    let mut server = mockito::Server::new_async().await;
    let text = "Keep building.\n```json\n{\"goal_recommendations\": [{\"activity_type\": \"running\", \
                \"period_type\": \"weekly\", \"current_target\": 0, \"recommended_target\": 20, \
                \"reason\": \"Base building\"}]}\n```";
    let reply = serde_json::json!({
      "content": [{"type": "text", "text": text}],
      "usage": {"input_tokens": 250, "output_tokens": 60}
    });
    let mock = server
      .mock("POST", "/v1/messages")
      .match_body(mockito::Matcher::Regex("Sub-3".to_string()))
      .with_status(200)
      .with_body(reply.to_string())
      .create_async()
      .await;
    let state = mock_state(pool.clone(), Some(&server.url()));

    // Act
    let advice = coaching_advice(&state, "user-1", Some("Sub-3 half".to_string()), date(2026, 10, 18))
      .await
      .expect("Should produce advice");
    save_coaching_advice(
      &state,
      "user-1",
      advice.content.clone(),
      advice.goal_recommendations.clone(),
    )
    .await
    .expect("Should save advice");

    // Assert
    mock.assert_async().await;
    assert_eq!(advice.goal_recommendations.len(), 1);
    let latest = get_latest_coaching(&state, "user-1")
      .await
      .expect("Should fetch")
      .expect("Should have history");
    assert!(latest.coaching_content.starts_with("Keep building."));

    let goal = apply_goal_recommendation(&state, "user-1", &advice.goal_recommendations[0])
      .await
      .expect("Should apply");
    assert_eq!(goal.activity_type, WorkoutType::Running);
    assert_eq!(goal.period_type, GoalPeriod::Weekly);
    assert_eq!(goal.target_value, 20.0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_coaching_without_recent_workouts() {
    let pool = setup_test_db().await;
    let server = mockito::Server::new_async().await;
    let state = mock_state(pool.clone(), Some(&server.url()));

    let result = coaching_advice(&state, "user-1", None, date(2026, 10, 18)).await;
    assert!(matches!(result, Err(AppError::Coaching(CoachingError::NoRecentWorkouts))));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_apply_rejects_unknown_values() {
    let pool = setup_test_db().await;
    let state = mock_state(pool.clone(), None);

    for bad in [
      recommendation("rowing", "weekly", 10.0),
      recommendation("running", "daily", 10.0),
      recommendation("running", "weekly", -5.0),
    ] {
      let result = apply_goal_recommendation(&state, "user-1", &bad).await;
      assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    apply_goal_recommendation(&state, "user-1", &recommendation("swimming", "monthly", 8000.0))
      .await
      .expect("Should apply");
    let goals = fetch_active_goals(&pool, "user-1").await.unwrap();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].target_value, 8000.0);

    teardown_test_db(pool).await;
  }
}
