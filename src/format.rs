//! Human-readable strings for workout durations, distances and pace

use serde::Serialize;

use crate::models::WorkoutType;

/// `h:mm:ss`, or `m:ss` under an hour
pub fn format_duration(seconds: i64) -> String {
  let seconds = seconds.max(0);
  let h = seconds / 3600;
  let m = (seconds % 3600) / 60;
  let s = seconds % 60;

  if h > 0 {
    format!("{}:{:02}:{:02}", h, m, s)
  } else {
    format!("{}:{:02}", m, s)
  }
}

pub fn format_distance(meters: f64, workout_type: WorkoutType) -> String {
  if workout_type.is_swimming() {
    format!("{}m", meters.round() as i64)
  } else {
    format!("{:.2}km", meters / 1000.0)
  }
}

/// Minutes as `M'SS''`; seconds are rounded so 4.999 reads 5'00''
pub fn format_pace(minutes: f64) -> String {
  let total_seconds = (minutes * 60.0).round() as i64;
  format!("{}'{:02}''", total_seconds / 60, total_seconds % 60)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadlineMetric {
  pub value: String,
  pub label: &'static str,
}

/// The one number shown on a workout card: pace for swimming and running,
/// average speed for everything else
pub fn headline_metric(meters: f64, seconds: i64, workout_type: WorkoutType) -> HeadlineMetric {
  if seconds <= 0 || meters <= 0.0 {
    return HeadlineMetric { value: "-".to_string(), label: "-" };
  }

  let minutes = seconds as f64 / 60.0;
  match workout_type {
    WorkoutType::Swimming => HeadlineMetric {
      value: format_pace(minutes / (meters / 100.0)),
      label: "pace /100m",
    },
    WorkoutType::Running => HeadlineMetric {
      value: format_pace(minutes / (meters / 1000.0)),
      label: "pace /km",
    },
    _ => {
      let kmh = (meters / 1000.0) / (seconds as f64 / 3600.0);
      HeadlineMetric {
        value: format!("{:.1} km/h", kmh),
        label: "avg speed",
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_duration() {
    assert_eq!(format_duration(0), "0:00");
    assert_eq!(format_duration(1500), "25:00");
    assert_eq!(format_duration(3661), "1:01:01");
    assert_eq!(format_duration(36000), "10:00:00");
  }

  #[test]
  fn test_format_distance() {
    assert_eq!(format_distance(1500.0, WorkoutType::Swimming), "1500m");
    assert_eq!(format_distance(5000.0, WorkoutType::Running), "5.00km");
    assert_eq!(format_distance(42195.0, WorkoutType::Running), "42.20km");
  }

  #[test]
  fn test_headline_pace() {
    let run = headline_metric(5000.0, 1500, WorkoutType::Running);
    assert_eq!(run.value, "5'00''");
    assert_eq!(run.label, "pace /km");

    let swim = headline_metric(1000.0, 1230, WorkoutType::Swimming);
    assert_eq!(swim.value, "2'03''");
  }

  #[test]
  fn test_headline_speed() {
    let ride = headline_metric(30000.0, 3600, WorkoutType::Cycling);
    assert_eq!(ride.value, "30.0 km/h");
    assert_eq!(ride.label, "avg speed");
  }

  #[test]
  fn test_headline_missing_values() {
    assert_eq!(headline_metric(0.0, 1800, WorkoutType::Treadmill).value, "-");
    assert_eq!(headline_metric(5000.0, 0, WorkoutType::Running).value, "-");
  }

  #[test]
  fn test_pace_never_shows_sixty_seconds() {
    assert_eq!(format_pace(4.9999), "5'00''");
    assert_eq!(format_pace(5.5), "5'30''");
  }
}
