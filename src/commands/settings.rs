//! Calendar filter and chart preferences

use crate::aggregation::ChartOptions;
use crate::db::AppState;
use crate::error::AppResult;
use crate::models::CompetitionType;
use crate::settings::{SqliteStore, ViewSettings};

pub async fn get_view_settings(state: &AppState, user_id: &str) -> AppResult<ViewSettings> {
  Ok(ViewSettings::load(&SqliteStore::new(state.db.clone()), user_id).await?)
}

/// Toggle one competition type; the last selected type stays selected
pub async fn toggle_competition_filter(
  state: &AppState,
  user_id: &str,
  competition_type: CompetitionType,
) -> AppResult<ViewSettings> {
  let store = SqliteStore::new(state.db.clone());
  let mut settings = ViewSettings::load(&store, user_id).await?;
  if settings.toggle_filter(competition_type) {
    settings.save(&store, user_id).await?;
  }
  Ok(settings)
}

pub async fn select_all_competition_filters(state: &AppState, user_id: &str) -> AppResult<ViewSettings> {
  let store = SqliteStore::new(state.db.clone());
  let mut settings = ViewSettings::load(&store, user_id).await?;
  settings.select_all();
  settings.save(&store, user_id).await?;
  Ok(settings)
}

pub async fn save_chart_options(state: &AppState, user_id: &str, chart: ChartOptions) -> AppResult<ViewSettings> {
  let store = SqliteStore::new(state.db.clone());
  let mut settings = ViewSettings::load(&store, user_id).await?;
  settings.chart = chart;
  settings.save(&store, user_id).await?;
  Ok(settings)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::aggregation::{ActivityFilter, Metric, Period};
  use crate::models::WorkoutType;
  use crate::test_utils::{mock_state, setup_test_db, teardown_test_db};

  #[tokio::test]
  async fn test_filters_persist_between_calls() {
    // Arrange
    let pool = setup_test_db().await;
    let state = mock_state(pool.clone(), None);

    // Act
    toggle_competition_filter(&state, "user-1", CompetitionType::Marathon)
      .await
      .expect("Should toggle");
    let settings = get_view_settings(&state, "user-1").await.expect("Should load");

    // Assert
    assert!(!settings.competition_filters.contains(&CompetitionType::Marathon));
    assert_eq!(settings.competition_filters.len(), CompetitionType::ALL.len() - 1);

    let other = get_view_settings(&state, "user-2").await.expect("Should load");
    assert!(other.type_filter().is_none());

    let settings = select_all_competition_filters(&state, "user-1").await.expect("Should reset");
    assert!(settings.type_filter().is_none());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_last_filter_cannot_be_removed() {
    let pool = setup_test_db().await;
    let state = mock_state(pool.clone(), None);

    for t in &CompetitionType::ALL[1..] {
      toggle_competition_filter(&state, "user-1", *t).await.expect("Should toggle");
    }
    let settings = toggle_competition_filter(&state, "user-1", CompetitionType::ALL[0])
      .await
      .expect("Should toggle");
    assert_eq!(settings.competition_filters, vec![CompetitionType::ALL[0]]);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_chart_options_saved() {
    let pool = setup_test_db().await;
    let state = mock_state(pool.clone(), None);
    let chart = ChartOptions {
      activity: ActivityFilter::of(WorkoutType::Swimming),
      metric: Metric::Distance,
      period: Period::Weekly,
    };

    save_chart_options(&state, "user-1", chart).await.expect("Should save");
    let settings = get_view_settings(&state, "user-1").await.expect("Should load");
    assert_eq!(settings.chart, chart);

    let other = get_view_settings(&state, "user-2").await.expect("Should load");
    assert_eq!(other.chart, ChartOptions::default());

    teardown_test_db(pool).await;
  }
}
