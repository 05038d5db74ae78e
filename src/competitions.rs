//! Competition and registration period storage
//!
//! Calendar reads use an inclusive overlap test so events that started before
//! the window or end after it are still returned.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::calendar::DateWindow;
use crate::models::{
  Competition, CompetitionType, CompetitionUpdate, NewCompetition, NewRegistrationPeriod, Participant,
  RegistrationEntry, RegistrationPeriod,
};

/// How far either side of a start date to look for a likely duplicate
pub const DUPLICATE_WINDOW_DAYS: i64 = 7;

/// Participants shown on a calendar bar before the rest collapse into "+N"
pub const PARTICIPANT_PREVIEW: usize = 2;

const COMPETITION_COLUMNS: &str = "id, competition_type, name, abbreviation, start_date, end_date, \
  start_time, location, homepage_url, memo, registered_by, created_at";

/// ---------------------------------------------------------------------------
/// Reads
/// ---------------------------------------------------------------------------

/// Competitions overlapping `window`, ordered by start date.
/// `types` of None (or every type) means no filter.
pub async fn fetch_competitions_in_window(
  pool: &SqlitePool,
  window: DateWindow,
  types: Option<&[CompetitionType]>,
) -> Result<Vec<Competition>, sqlx::Error> {
  let mut query: QueryBuilder<Sqlite> =
    QueryBuilder::new(format!("SELECT {} FROM competitions WHERE start_date <= ", COMPETITION_COLUMNS));
  query.push_bind(window.end);
  query.push(" AND end_date >= ");
  query.push_bind(window.start);

  if let Some(types) = types.filter(|t| !t.is_empty() && t.len() < CompetitionType::ALL.len()) {
    query.push(" AND competition_type IN (");
    let mut separated = query.separated(", ");
    for t in types {
      separated.push_bind(*t);
    }
    separated.push_unseparated(")");
  }
  query.push(" ORDER BY start_date ASC, id ASC");

  let competitions = query.build_query_as::<Competition>().fetch_all(pool).await?;
  debug!(
    "Fetched {} competitions for {}..{}",
    competitions.len(),
    window.start,
    window.end
  );
  Ok(competitions)
}

pub async fn fetch_competition(pool: &SqlitePool, id: i64) -> Result<Option<Competition>, sqlx::Error> {
  sqlx::query_as::<_, Competition>(&format!(
    "SELECT {} FROM competitions WHERE id = ?1",
    COMPETITION_COLUMNS
  ))
  .bind(id)
  .fetch_optional(pool)
  .await
}

/// Existing competitions starting within DUPLICATE_WINDOW_DAYS of `start_date`
/// whose name contains `name`, ignoring case
pub async fn find_similar(
  pool: &SqlitePool,
  name: &str,
  start_date: NaiveDate,
) -> Result<Vec<Competition>, sqlx::Error> {
  let from = start_date - Duration::days(DUPLICATE_WINDOW_DAYS);
  let to = start_date + Duration::days(DUPLICATE_WINDOW_DAYS);

  let nearby = sqlx::query_as::<_, Competition>(&format!(
    "SELECT {} FROM competitions WHERE start_date >= ?1 AND start_date <= ?2 ORDER BY start_date",
    COMPETITION_COLUMNS
  ))
  .bind(from)
  .bind(to)
  .fetch_all(pool)
  .await?;

  // SQLite LIKE only folds ASCII, so match here
  let needle = name.trim().to_lowercase();
  Ok(
    nearby
      .into_iter()
      .filter(|c| c.name.to_lowercase().contains(&needle))
      .collect(),
  )
}

/// ---------------------------------------------------------------------------
/// Writes
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreateOutcome {
  Created { competition: Competition },
  DuplicateWarning { similar: Vec<String> },
}

impl CreateOutcome {
  /// `"name" (start_date), ...`
  pub fn warning_message(&self) -> Option<String> {
    match self {
      CreateOutcome::DuplicateWarning { similar } => {
        Some(format!("Similar competitions already exist: {}", similar.join(", ")))
      }
      CreateOutcome::Created { .. } => None,
    }
  }
}

/// Insert unless a likely duplicate exists; the caller may then force it
pub async fn create_competition(
  pool: &SqlitePool,
  new: &NewCompetition,
  registered_by: &str,
) -> Result<CreateOutcome, sqlx::Error> {
  let similar = find_similar(pool, &new.name, new.start_date).await?;
  if !similar.is_empty() {
    info!("Possible duplicate of \"{}\": {} match(es)", new.name, similar.len());
    return Ok(CreateOutcome::DuplicateWarning {
      similar: similar
        .iter()
        .map(|c| format!("\"{}\" ({})", c.name, c.start_date))
        .collect(),
    });
  }

  let competition = force_create_competition(pool, new, registered_by).await?;
  Ok(CreateOutcome::Created { competition })
}

/// Insert without the duplicate check
pub async fn force_create_competition(
  pool: &SqlitePool,
  new: &NewCompetition,
  registered_by: &str,
) -> Result<Competition, sqlx::Error> {
  let competition = sqlx::query_as::<_, Competition>(&format!(
    r#"
    INSERT INTO competitions (
      competition_type, name, abbreviation, start_date, end_date,
      start_time, location, homepage_url, memo, registered_by
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    RETURNING {}
    "#,
    COMPETITION_COLUMNS
  ))
  .bind(new.competition_type)
  .bind(&new.name)
  .bind(&new.abbreviation)
  .bind(new.start_date)
  .bind(new.end_date)
  .bind(&new.start_time)
  .bind(&new.location)
  .bind(&new.homepage_url)
  .bind(&new.memo)
  .bind(registered_by)
  .fetch_one(pool)
  .await?;

  info!("Created competition {} \"{}\"", competition.id, competition.name);
  Ok(competition)
}

/// Apply `update` to competition `id`; None when it does not exist.
/// Date order is checked by the caller and again by the schema.
pub async fn update_competition(
  pool: &SqlitePool,
  id: i64,
  update: &CompetitionUpdate,
) -> Result<Option<Competition>, sqlx::Error> {
  let updated = sqlx::query_as::<_, Competition>(&format!(
    r#"
    UPDATE competitions SET
      competition_type = COALESCE(?2, competition_type),
      name = COALESCE(?3, name),
      abbreviation = CASE WHEN ?4 IS NULL THEN abbreviation ELSE NULLIF(?4, '') END,
      start_date = COALESCE(?5, start_date),
      end_date = COALESCE(?6, end_date),
      start_time = CASE WHEN ?7 IS NULL THEN start_time ELSE NULLIF(?7, '') END,
      location = COALESCE(?8, location),
      homepage_url = CASE WHEN ?9 IS NULL THEN homepage_url ELSE NULLIF(?9, '') END,
      memo = CASE WHEN ?10 IS NULL THEN memo ELSE NULLIF(?10, '') END
    WHERE id = ?1
    RETURNING {}
    "#,
    COMPETITION_COLUMNS
  ))
  .bind(id)
  .bind(update.competition_type)
  .bind(&update.name)
  .bind(&update.abbreviation)
  .bind(update.start_date)
  .bind(update.end_date)
  .bind(&update.start_time)
  .bind(&update.location)
  .bind(&update.homepage_url)
  .bind(&update.memo)
  .fetch_optional(pool)
  .await?;

  if let Some(competition) = &updated {
    info!("Updated competition {} \"{}\"", competition.id, competition.name);
  }
  Ok(updated)
}

/// Returns whether a row was removed; registration periods and participants
/// cascade
pub async fn delete_competition(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
  let result = sqlx::query("DELETE FROM competitions WHERE id = ?1")
    .bind(id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

/// ---------------------------------------------------------------------------
/// Participation
/// ---------------------------------------------------------------------------

/// Join `competition_id`, or leave it when already joined.
/// Returns whether `user_id` takes part afterwards.
pub async fn toggle_participation(
  pool: &SqlitePool,
  competition_id: i64,
  user_id: &str,
) -> Result<bool, sqlx::Error> {
  let left = sqlx::query("DELETE FROM competition_participants WHERE competition_id = ?1 AND user_id = ?2")
    .bind(competition_id)
    .bind(user_id)
    .execute(pool)
    .await?;
  if left.rows_affected() > 0 {
    info!("{} left competition {}", user_id, competition_id);
    return Ok(false);
  }

  sqlx::query("INSERT INTO competition_participants (competition_id, user_id) VALUES (?1, ?2)")
    .bind(competition_id)
    .bind(user_id)
    .execute(pool)
    .await?;
  info!("{} joined competition {}", user_id, competition_id);
  Ok(true)
}

/// Participants of `competition_ids`, earliest sign-up first
pub async fn fetch_participants(
  pool: &SqlitePool,
  competition_ids: &[i64],
) -> Result<Vec<Participant>, sqlx::Error> {
  if competition_ids.is_empty() {
    return Ok(Vec::new());
  }

  let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
    "SELECT id, competition_id, user_id, created_at FROM competition_participants WHERE competition_id IN (",
  );
  let mut separated = query.separated(", ");
  for id in competition_ids {
    separated.push_bind(*id);
  }
  separated.push_unseparated(") ORDER BY created_at ASC, id ASC");

  query.build_query_as::<Participant>().fetch_all(pool).await
}

/// Participant user ids keyed by competition, in sign-up order
pub fn roster(participants: Vec<Participant>) -> HashMap<i64, Vec<String>> {
  let mut roster: HashMap<i64, Vec<String>> = HashMap::new();
  for p in participants {
    roster.entry(p.competition_id).or_default().push(p.user_id);
  }
  roster
}

/// Who takes part, as a calendar bar shows it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantSummary {
  /// First PARTICIPANT_PREVIEW user ids
  pub preview: Vec<String>,
  /// "+N" for everyone past the preview
  pub more: Option<String>,
  pub count: usize,
  /// Whether the viewing user has joined
  pub joined: bool,
}

impl ParticipantSummary {
  pub fn new(user_ids: &[String], viewer: &str) -> Self {
    let count = user_ids.len();
    Self {
      preview: user_ids.iter().take(PARTICIPANT_PREVIEW).cloned().collect(),
      more: (count > PARTICIPANT_PREVIEW).then(|| format!("+{}", count - PARTICIPANT_PREVIEW)),
      count,
      joined: user_ids.iter().any(|u| u == viewer),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Registration Periods
/// ---------------------------------------------------------------------------

pub async fn add_registration_period(
  pool: &SqlitePool,
  competition_id: i64,
  new: &NewRegistrationPeriod,
) -> Result<RegistrationPeriod, sqlx::Error> {
  sqlx::query_as::<_, RegistrationPeriod>(
    r#"
    INSERT INTO competition_registration_periods (
      competition_id, category_name, registration_date, registration_time
    )
    VALUES (?1, ?2, ?3, ?4)
    RETURNING id, competition_id, category_name, registration_date, registration_time, created_at
    "#,
  )
  .bind(competition_id)
  .bind(&new.category_name)
  .bind(new.registration_date)
  .bind(&new.registration_time)
  .fetch_one(pool)
  .await
}

pub async fn delete_registration_period(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
  let result = sqlx::query("DELETE FROM competition_registration_periods WHERE id = ?1")
    .bind(id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

/// Registration openings inside `window`, joined with their competition
pub async fn fetch_registrations_in_window(
  pool: &SqlitePool,
  window: DateWindow,
) -> Result<Vec<RegistrationEntry>, sqlx::Error> {
  sqlx::query_as::<_, RegistrationEntry>(
    r#"
    SELECT
      p.id, p.competition_id, c.name AS competition_name, p.category_name,
      p.registration_date, p.registration_time, c.homepage_url
    FROM competition_registration_periods p
    JOIN competitions c ON c.id = p.competition_id
    WHERE p.registration_date >= ?1 AND p.registration_date <= ?2
    ORDER BY p.registration_date ASC, p.id ASC
    "#,
  )
  .bind(window.start)
  .bind(window.end)
  .fetch_all(pool)
  .await
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
