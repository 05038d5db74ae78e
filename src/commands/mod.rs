pub mod calendar;
pub mod coaching;
pub mod competitions;
pub mod settings;
pub mod stats;

use chrono::{Local, NaiveDate};

use crate::db::AppState;
use crate::error::AppResult;
use crate::llm::ImageInput;
use crate::models::{NewWorkout, Workout};
use crate::screenshot::read_screenshot;
use crate::workouts::{fetch_user_workouts, insert_workout};

/// A user's workout log, newest first
pub async fn get_workouts(state: &AppState, user_id: &str) -> AppResult<Vec<Workout>> {
  Ok(fetch_user_workouts(&state.db, user_id).await?)
}

pub async fn log_workout(state: &AppState, user_id: &str, workout: NewWorkout) -> AppResult<Workout> {
  insert_workout(&state.db, user_id, &workout).await
}

/// Draft a workout from an app screenshot. The draft is returned for the
/// user to confirm and is only stored through `log_workout`.
pub async fn read_workout_screenshot(state: &AppState, media_type: &str, bytes: &[u8]) -> AppResult<NewWorkout> {
  screenshot_draft(state, media_type, bytes, Local::now().date_naive()).await
}

pub async fn screenshot_draft(
  state: &AppState,
  media_type: &str,
  bytes: &[u8],
  today: NaiveDate,
) -> AppResult<NewWorkout> {
  let client = state.llm_client()?;
  Ok(read_screenshot(&client, ImageInput { media_type, bytes }, today).await?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::AppError;
  use crate::llm::LlmError;
  use crate::models::WorkoutType;
  use crate::test_utils::{mock_new_workout, mock_state, setup_test_db, teardown_test_db};
  use chrono::NaiveDate;

  #[tokio::test]
  async fn test_log_and_list_workouts() {
    let pool = setup_test_db().await;
    let state = mock_state(pool.clone(), None);
    let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    log_workout(&state, "user-1", mock_new_workout(WorkoutType::Hiking, day, 9000.0, 10800))
      .await
      .expect("Should log workout");
    let bad = log_workout(&state, "user-1", mock_new_workout(WorkoutType::Hiking, day, 9000.0, 0)).await;
    assert!(matches!(bad, Err(AppError::Validation(_))));

    let workouts = get_workouts(&state, "user-1").await.expect("Should list");
    assert_eq!(workouts.len(), 1);
    assert_eq!(workouts[0].workout_type, WorkoutType::Hiking);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_screenshot_draft_needs_api_key() {
    let pool = setup_test_db().await;
    let state = mock_state(pool.clone(), None);
    let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    let result = screenshot_draft(&state, "image/png", &[0x89, 0x50], today).await;
    assert!(matches!(result, Err(AppError::Llm(LlmError::MissingApiKey))));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_screenshot_draft_is_not_stored() {
    let pool = setup_test_db().await;
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/v1/messages")
      .with_status(200)
      .with_body(
        serde_json::json!({
          "content": [{"type": "text", "text": "{\"workout_type\": \"running\", \"duration\": \"30:00\", \"distance\": 5, \"distance_unit\": \"km\"}"}],
          "usage": {"input_tokens": 10, "output_tokens": 5}
        })
        .to_string(),
      )
      .create_async()
      .await;
    let state = mock_state(pool.clone(), Some(&format!("{}/", server.url())));
    let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    let draft = screenshot_draft(&state, "image/png", &[0x89, 0x50], today)
      .await
      .expect("Should read screenshot");
    assert_eq!(draft.workout_date, today);
    assert_eq!(draft.distance_meters, 5000.0);
    assert!(get_workouts(&state, "user-1").await.expect("Should list").is_empty());

    log_workout(&state, "user-1", draft).await.expect("Should log draft");
    assert_eq!(get_workouts(&state, "user-1").await.expect("Should list").len(), 1);

    teardown_test_db(pool).await;
  }
}
