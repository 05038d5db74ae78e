use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A target adjustment suggested by the coach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRecommendation {
  pub activity_type: String,
  pub period_type: String,
  pub current_target: f64,
  pub recommended_target: f64,
  pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachingHistory {
  pub id: i64,
  pub user_id: String,
  pub coaching_content: String,
  pub goal_recommendations: Option<Vec<GoalRecommendation>>,
  pub created_at: Option<DateTime<Utc>>,
}
