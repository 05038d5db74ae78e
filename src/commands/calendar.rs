//! Competition calendar for one month

use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::calendar::{build_month_grid, CalendarDay, YearMonth};
use crate::competitions::{
  fetch_competitions_in_window, fetch_participants, fetch_registrations_in_window, roster,
  ParticipantSummary,
};
use crate::db::AppState;
use crate::error::AppResult;
use crate::models::CompetitionType;
use crate::placement::{layout_month, DayCell, EventSegment};
use crate::settings::{SqliteStore, ViewSettings};

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
  pub competition_id: i64,
  pub name: String,
  pub competition_type: CompetitionType,
  pub color: &'static str,
  pub segment: EventSegment,
  pub show_label: bool,
  pub participants: ParticipantSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationView {
  pub registration_id: i64,
  pub competition_id: i64,
  pub label: String,
  pub category_name: String,
  pub registration_time: Option<String>,
  pub homepage_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayView {
  #[serde(flatten)]
  pub day: CalendarDay,
  pub events: Vec<EventView>,
  /// "+N more" when events were cut off
  pub more: Option<String>,
  pub registrations: Vec<RegistrationView>,
}

impl DayView {
  /// `roster` maps competition id to participant user ids; `viewer` is the
  /// user the view is built for
  fn build(cell: DayCell<'_>, roster: &HashMap<i64, Vec<String>>, viewer: &str) -> Self {
    let more = cell.events.overflow_label();
    let events = cell
      .events
      .visible
      .iter()
      .map(|placed| EventView {
        competition_id: placed.event.id,
        name: placed.event.display_name().to_string(),
        competition_type: placed.event.competition_type,
        color: placed.event.competition_type.color(),
        segment: placed.segment,
        show_label: placed.segment.shows_label(),
        participants: ParticipantSummary::new(
          roster.get(&placed.event.id).map_or(&[][..], Vec::as_slice),
          viewer,
        ),
      })
      .collect();
    let registrations = cell
      .registrations
      .into_iter()
      .map(|marker| RegistrationView {
        registration_id: marker.entry.id,
        competition_id: marker.entry.competition_id,
        label: marker.label,
        category_name: marker.entry.category_name.clone(),
        registration_time: marker.entry.registration_time.clone(),
        homepage_url: marker.entry.homepage_url.clone(),
      })
      .collect();

    Self {
      day: cell.day.clone(),
      events,
      more,
      registrations,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
  pub year: i32,
  pub month: u32,
  pub filters: Vec<CompetitionType>,
  pub days: Vec<DayView>,
}

/// Month view for the current local date
pub async fn get_month_view(state: &AppState, user_id: &str, year: i32, month: u32) -> AppResult<MonthView> {
  month_view(state, user_id, YearMonth::new(year, month)?, Local::now().date_naive()).await
}

pub async fn month_view(
  state: &AppState,
  user_id: &str,
  month: YearMonth,
  today: NaiveDate,
) -> AppResult<MonthView> {
  let settings = ViewSettings::load(&SqliteStore::new(state.db.clone()), user_id).await?;
  let window = month.fetch_window();

  let competitions = fetch_competitions_in_window(&state.db, window, settings.type_filter()).await?;
  let registrations = fetch_registrations_in_window(&state.db, window).await?;
  let ids: Vec<i64> = competitions.iter().map(|c| c.id).collect();
  let roster = roster(fetch_participants(&state.db, &ids).await?);

  let grid = build_month_grid(month, today);
  let days = layout_month(&grid, &competitions, &registrations)
    .into_iter()
    .map(|cell| DayView::build(cell, &roster, user_id))
    .collect();

  Ok(MonthView {
    year: month.year(),
    month: month.month(),
    filters: settings.competition_filters,
    days,
  })
}
