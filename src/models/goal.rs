use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::workout::WorkoutType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum GoalPeriod {
  Weekly,
  Monthly,
  Yearly,
}

impl GoalPeriod {
  pub const ALL: [GoalPeriod; 3] = [GoalPeriod::Weekly, GoalPeriod::Monthly, GoalPeriod::Yearly];

  pub fn as_str(&self) -> &'static str {
    match self {
      GoalPeriod::Weekly => "weekly",
      GoalPeriod::Monthly => "monthly",
      GoalPeriod::Yearly => "yearly",
    }
  }
}

impl std::str::FromStr for GoalPeriod {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "weekly" => Ok(Self::Weekly),
      "monthly" => Ok(Self::Monthly),
      "yearly" => Ok(Self::Yearly),
      _ => Err(format!("Unknown goal period: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum GoalMetric {
  Distance,
  Time,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersonalGoal {
  pub id: i64,
  pub user_id: String,
  pub activity_type: WorkoutType,
  pub period_type: GoalPeriod,
  /// km, or metres for swimming
  pub target_value: f64,
  pub metric_type: GoalMetric,
  pub is_active: bool,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPersonalGoal {
  pub activity_type: WorkoutType,
  pub period_type: GoalPeriod,
  pub target_value: f64,
  pub metric_type: GoalMetric,
}
