use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CompetitionType {
  Marathon,
  Triathlon,
  Granfondo,
  TrailRun,
  Other,
}

impl CompetitionType {
  pub const ALL: [CompetitionType; 5] = [
    CompetitionType::Marathon,
    CompetitionType::Triathlon,
    CompetitionType::Granfondo,
    CompetitionType::TrailRun,
    CompetitionType::Other,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      CompetitionType::Marathon => "marathon",
      CompetitionType::Triathlon => "triathlon",
      CompetitionType::Granfondo => "granfondo",
      CompetitionType::TrailRun => "trail_run",
      CompetitionType::Other => "other",
    }
  }

  /// Calendar bar colour
  pub fn color(&self) -> &'static str {
    match self {
      CompetitionType::Marathon => "#228be6",
      CompetitionType::Triathlon => "#40c057",
      CompetitionType::Granfondo => "#f59f00",
      CompetitionType::TrailRun => "#e64980",
      CompetitionType::Other => "#868e96",
    }
  }
}

impl std::fmt::Display for CompetitionType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for CompetitionType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "marathon" => Ok(Self::Marathon),
      "triathlon" => Ok(Self::Triathlon),
      "granfondo" => Ok(Self::Granfondo),
      "trail_run" => Ok(Self::TrailRun),
      "other" => Ok(Self::Other),
      _ => Err(format!("Unknown competition type: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Competition {
  pub id: i64,
  pub competition_type: CompetitionType,
  pub name: String,
  pub abbreviation: Option<String>,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub start_time: Option<String>,
  pub location: String,
  pub homepage_url: Option<String>,
  pub memo: Option<String>,
  pub registered_by: String,
  pub created_at: Option<DateTime<Utc>>,
}

impl Competition {
  /// Short name shown on calendar bars
  pub fn display_name(&self) -> &str {
    match self.abbreviation.as_deref() {
      Some(abbr) if !abbr.trim().is_empty() => abbr,
      _ => &self.name,
    }
  }
}

/// For inserting new competitions (without id, registered_by, created_at)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCompetition {
  pub competition_type: CompetitionType,
  pub name: String,
  pub abbreviation: Option<String>,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub start_time: Option<String>,
  pub location: String,
  pub homepage_url: Option<String>,
  pub memo: Option<String>,
}

/// Edits to an existing competition. `None` keeps the stored value; an
/// empty string clears an optional text field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitionUpdate {
  pub competition_type: Option<CompetitionType>,
  pub name: Option<String>,
  pub abbreviation: Option<String>,
  pub start_date: Option<NaiveDate>,
  pub end_date: Option<NaiveDate>,
  pub start_time: Option<String>,
  pub location: Option<String>,
  pub homepage_url: Option<String>,
  pub memo: Option<String>,
}

impl CompetitionUpdate {
  /// Start and end dates once this update is applied to `existing`
  pub fn dates_after(&self, existing: &Competition) -> (NaiveDate, NaiveDate) {
    (
      self.start_date.unwrap_or(existing.start_date),
      self.end_date.unwrap_or(existing.end_date),
    )
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
  pub id: i64,
  pub competition_id: i64,
  pub user_id: String,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegistrationPeriod {
  pub id: i64,
  pub competition_id: i64,
  pub category_name: String,
  pub registration_date: NaiveDate,
  pub registration_time: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRegistrationPeriod {
  pub category_name: String,
  pub registration_date: NaiveDate,
  pub registration_time: Option<String>,
}

/// A registration period joined with the competition it opens sign-ups for
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegistrationEntry {
  pub id: i64,
  pub competition_id: i64,
  pub competition_name: String,
  pub category_name: String,
  pub registration_date: NaiveDate,
  pub registration_time: Option<String>,
  pub homepage_url: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn competition(abbreviation: Option<&str>) -> Competition {
    Competition {
      id: 1,
      competition_type: CompetitionType::Marathon,
      name: "Seoul International Marathon".to_string(),
      abbreviation: abbreviation.map(str::to_string),
      start_date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
      end_date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
      start_time: None,
      location: "Seoul".to_string(),
      homepage_url: None,
      memo: None,
      registered_by: "user-1".to_string(),
      created_at: None,
    }
  }

  #[test]
  fn test_display_name_prefers_abbreviation() {
    assert_eq!(competition(Some("SIM")).display_name(), "SIM");
    assert_eq!(competition(Some("  ")).display_name(), "Seoul International Marathon");
    assert_eq!(competition(None).display_name(), "Seoul International Marathon");
  }

  #[test]
  fn test_update_dates_fall_back_to_stored() {
    let existing = competition(None);
    let moved = CompetitionUpdate {
      end_date: NaiveDate::from_ymd_opt(2026, 3, 16),
      ..CompetitionUpdate::default()
    };
    assert_eq!(
      moved.dates_after(&existing),
      (existing.start_date, NaiveDate::from_ymd_opt(2026, 3, 16).unwrap())
    );
    assert_eq!(
      CompetitionUpdate::default().dates_after(&existing),
      (existing.start_date, existing.end_date)
    );
  }

  #[test]
  fn test_competition_type_round_trip() {
    assert_eq!("trail_run".parse::<CompetitionType>().unwrap(), CompetitionType::TrailRun);
    assert_eq!(CompetitionType::TrailRun.to_string(), "trail_run");
    assert!("ultra".parse::<CompetitionType>().is_err());
    assert_eq!(
      serde_json::to_string(&CompetitionType::TrailRun).unwrap(),
      "\"trail_run\""
    );
  }
}
