//! Competition registration and bulk import

use chrono::NaiveDate;
use tracing::{info, warn};

use serde::Serialize;

use crate::competitions::{
  add_registration_period, create_competition, delete_competition, delete_registration_period,
  fetch_competition, fetch_participants, force_create_competition, toggle_participation,
  update_competition, CreateOutcome,
};
use crate::db::AppState;
use crate::error::{AppError, AppResult};
use crate::import::{parse_rows, read_rows, ImportSummary, RowError, RowErrorKind};
use crate::models::{
  Competition, CompetitionUpdate, NewCompetition, NewRegistrationPeriod, RegistrationPeriod,
};

fn check_dates(start_date: NaiveDate, end_date: NaiveDate) -> AppResult<()> {
  if end_date < start_date {
    return Err(AppError::InvalidInput(format!(
      "end_date {} is before start_date {}",
      end_date, start_date
    )));
  }
  Ok(())
}

async fn existing_competition(state: &AppState, competition_id: i64) -> AppResult<Competition> {
  fetch_competition(&state.db, competition_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Competition {}", competition_id)))
}

#[derive(Debug, Clone, Serialize)]
pub struct CompetitionDetail {
  #[serde(flatten)]
  pub competition: Competition,
  /// User ids in sign-up order
  pub participants: Vec<String>,
  pub joined: bool,
}

/// Detail view for a competition clicked in the calendar
pub async fn get_competition(
  state: &AppState,
  user_id: &str,
  competition_id: i64,
) -> AppResult<CompetitionDetail> {
  let competition = existing_competition(state, competition_id).await?;
  let participants: Vec<String> = fetch_participants(&state.db, &[competition_id])
    .await?
    .into_iter()
    .map(|p| p.user_id)
    .collect();
  let joined = participants.iter().any(|p| p == user_id);

  Ok(CompetitionDetail {
    competition,
    participants,
    joined,
  })
}

/// Register a competition, or report likely duplicates for confirmation
pub async fn register_competition(
  state: &AppState,
  user_id: &str,
  new: NewCompetition,
) -> AppResult<CreateOutcome> {
  check_dates(new.start_date, new.end_date)?;
  Ok(create_competition(&state.db, &new, user_id).await?)
}

/// Register after the user confirmed a duplicate warning
pub async fn register_competition_anyway(
  state: &AppState,
  user_id: &str,
  new: NewCompetition,
) -> AppResult<Competition> {
  check_dates(new.start_date, new.end_date)?;
  Ok(force_create_competition(&state.db, &new, user_id).await?)
}

/// Edit a competition; the result must still end on or after its start
pub async fn edit_competition(
  state: &AppState,
  competition_id: i64,
  update: CompetitionUpdate,
) -> AppResult<Competition> {
  let existing = existing_competition(state, competition_id).await?;
  let (start_date, end_date) = update.dates_after(&existing);
  check_dates(start_date, end_date)?;

  for (field, value) in [("name", &update.name), ("location", &update.location)] {
    if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
      return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
  }

  update_competition(&state.db, competition_id, &update)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Competition {}", competition_id)))
}

/// Join or leave; returns whether the user takes part afterwards
pub async fn toggle_competition_participation(
  state: &AppState,
  user_id: &str,
  competition_id: i64,
) -> AppResult<bool> {
  existing_competition(state, competition_id).await?;
  Ok(toggle_participation(&state.db, competition_id, user_id).await?)
}

pub async fn remove_competition(state: &AppState, competition_id: i64) -> AppResult<()> {
  if delete_competition(&state.db, competition_id).await? {
    Ok(())
  } else {
    Err(AppError::NotFound(format!("Competition {}", competition_id)))
  }
}

pub async fn add_registration(
  state: &AppState,
  competition_id: i64,
  new: NewRegistrationPeriod,
) -> AppResult<RegistrationPeriod> {
  existing_competition(state, competition_id).await?;
  Ok(add_registration_period(&state.db, competition_id, &new).await?)
}

pub async fn remove_registration(state: &AppState, registration_id: i64) -> AppResult<()> {
  if delete_registration_period(&state.db, registration_id).await? {
    Ok(())
  } else {
    Err(AppError::NotFound(format!("Registration period {}", registration_id)))
  }
}

/// ---------------------------------------------------------------------------
/// Bulk Import
/// ---------------------------------------------------------------------------

/// Import every valid row of an uploaded .csv, .xlsx or .xls file. Invalid
/// rows and rows the database rejects are reported; they do not stop the
/// rest of the file.
pub async fn import_competitions(
  state: &AppState,
  user_id: &str,
  file_name: &str,
  data: &[u8],
) -> AppResult<ImportSummary> {
  let rows = read_rows(file_name, data)?;
  let batch = parse_rows(&rows)?;

  let mut summary = ImportSummary {
    success: 0,
    errors: batch.errors,
  };

  for parsed in &batch.valid {
    match force_create_competition(&state.db, &parsed.competition, user_id).await {
      Ok(_) => summary.success += 1,
      Err(e) => {
        warn!("Import row {} failed: {}", parsed.row, e);
        summary.errors.push(RowError {
          row: parsed.row,
          kind: RowErrorKind::Insert(e.to_string()),
        });
      }
    }
  }
  summary.errors.sort_by_key(|e| e.row);

  info!("Imported {} from {}: {}", user_id, file_name, summary.message());
  Ok(summary)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
