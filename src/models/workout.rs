use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ---------------------------------------------------------------------------
/// Workout Types
/// ---------------------------------------------------------------------------

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum WorkoutType {
  Running,
  Swimming,
  Cycling,
  Treadmill,
  Hiking,
}

impl WorkoutType {
  pub const ALL: [WorkoutType; 5] = [
    WorkoutType::Running,
    WorkoutType::Swimming,
    WorkoutType::Cycling,
    WorkoutType::Treadmill,
    WorkoutType::Hiking,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      WorkoutType::Running => "running",
      WorkoutType::Swimming => "swimming",
      WorkoutType::Cycling => "cycling",
      WorkoutType::Treadmill => "treadmill",
      WorkoutType::Hiking => "hiking",
    }
  }

  /// Swimming distances are tracked in metres and paced per 100 m
  pub fn is_swimming(&self) -> bool {
    matches!(self, WorkoutType::Swimming)
  }

  /// Unit label used when showing a distance for this activity
  pub fn distance_unit(&self) -> &'static str {
    if self.is_swimming() {
      "m"
    } else {
      "km"
    }
  }
}

impl std::fmt::Display for WorkoutType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for WorkoutType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "running" => Ok(Self::Running),
      "swimming" => Ok(Self::Swimming),
      "cycling" => Ok(Self::Cycling),
      "treadmill" => Ok(Self::Treadmill),
      "hiking" => Ok(Self::Hiking),
      _ => Err(format!("Unknown workout type: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SharingType {
  #[default]
  Public,
  Private,
  Group,
}

/// ---------------------------------------------------------------------------
/// Workout Records
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workout {
  pub id: i64,
  pub user_id: String,
  pub workout_type: WorkoutType,
  pub workout_date: NaiveDate,
  pub duration_seconds: i64,
  pub distance_meters: f64,
  pub avg_heart_rate: Option<i64>,
  /// spm for running/treadmill, rpm for cycling
  pub cadence: Option<i64>,
  pub swolf: Option<i64>,
  /// Watts, cycling only
  pub avg_power: Option<i64>,
  pub sharing_type: SharingType,
  pub shared_group_id: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

/// For inserting new workouts (without id, user_id, created_at)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkout {
  pub workout_type: WorkoutType,
  pub workout_date: NaiveDate,
  pub duration_seconds: i64,
  pub distance_meters: f64,
  pub avg_heart_rate: Option<i64>,
  pub cadence: Option<i64>,
  pub swolf: Option<i64>,
  pub avg_power: Option<i64>,
  #[serde(default)]
  pub sharing_type: SharingType,
  pub shared_group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("duration_seconds must be positive, got {0}")]
  NonPositiveDuration(i64),

  #[error("distance_meters must be a non-negative number, got {0}")]
  InvalidDistance(f64),

  #[error("{field} out of range: {value}")]
  OutOfRange { field: &'static str, value: i64 },

  #[error("group sharing requires shared_group_id")]
  MissingSharedGroup,
}

impl NewWorkout {
  /// Reject records the aggregator could not make sense of.
  /// Mirrors the CHECK constraints in the workouts table.
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.duration_seconds <= 0 {
      return Err(ValidationError::NonPositiveDuration(self.duration_seconds));
    }
    if !self.distance_meters.is_finite() || self.distance_meters < 0.0 {
      return Err(ValidationError::InvalidDistance(self.distance_meters));
    }

    let bounded = [
      ("avg_heart_rate", self.avg_heart_rate, 20, 260),
      ("cadence", self.cadence, 1, 400),
      ("swolf", self.swolf, 1, 500),
      ("avg_power", self.avg_power, 1, 3000),
    ];
    for (field, value, min, max) in bounded {
      if let Some(v) = value {
        if v < min || v > max {
          return Err(ValidationError::OutOfRange { field, value: v });
        }
      }
    }

    if self.sharing_type == SharingType::Group && self.shared_group_id.is_none() {
      return Err(ValidationError::MissingSharedGroup);
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn valid() -> NewWorkout {
    NewWorkout {
      workout_type: WorkoutType::Running,
      workout_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
      duration_seconds: 1500,
      distance_meters: 5000.0,
      avg_heart_rate: Some(150),
      cadence: Some(172),
      swolf: None,
      avg_power: None,
      sharing_type: SharingType::Public,
      shared_group_id: None,
    }
  }

  #[test]
  fn test_valid_workout_passes() {
    assert!(valid().validate().is_ok());
  }

  #[test]
  fn test_zero_duration_rejected() {
    let w = NewWorkout { duration_seconds: 0, ..valid() };
    assert_eq!(w.validate(), Err(ValidationError::NonPositiveDuration(0)));
  }

  #[test]
  fn test_nan_distance_rejected() {
    let w = NewWorkout { distance_meters: f64::NAN, ..valid() };
    assert!(matches!(w.validate(), Err(ValidationError::InvalidDistance(_))));
  }

  #[test]
  fn test_heart_rate_out_of_range() {
    let w = NewWorkout { avg_heart_rate: Some(400), ..valid() };
    assert_eq!(
      w.validate(),
      Err(ValidationError::OutOfRange { field: "avg_heart_rate", value: 400 })
    );
  }

  #[test]
  fn test_group_sharing_needs_group() {
    let w = NewWorkout { sharing_type: SharingType::Group, ..valid() };
    assert_eq!(w.validate(), Err(ValidationError::MissingSharedGroup));
  }

  #[test]
  fn test_workout_type_parse_and_display() {
    for t in WorkoutType::ALL {
      assert_eq!(t.as_str().parse::<WorkoutType>().unwrap(), t);
    }
    assert!("rowing".parse::<WorkoutType>().is_err());
    assert_eq!(WorkoutType::Swimming.distance_unit(), "m");
  }

  #[test]
  fn test_new_workout_deserializes_iso_date() {
    let json = r#"{
      "workout_type": "swimming",
      "workout_date": "2026-03-02",
      "duration_seconds": 1200,
      "distance_meters": 1000,
      "avg_heart_rate": null,
      "cadence": null,
      "swolf": 38,
      "avg_power": null,
      "shared_group_id": null
    }"#;
    let w: NewWorkout = serde_json::from_str(json).unwrap();
    assert_eq!(w.workout_type, WorkoutType::Swimming);
    assert_eq!(w.sharing_type, SharingType::Public);

    let bad = json.replace("2026-03-02", "03/02/2026");
    assert!(serde_json::from_str::<NewWorkout>(&bad).is_err());
  }
}
