//! Placement of multi-day competitions onto calendar cells
//!
//! Every (event, date) pair inside the event's range gets exactly one
//! segment so the UI can draw a continuous bar with caps only at the true
//! start and end.

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::CalendarDay;
use crate::models::{Competition, RegistrationEntry};

/// Events drawn per cell before collapsing the rest into "+N more"
pub const DISPLAY_CAP: usize = 3;

/// Registration labels longer than this are shortened with ".."
pub const REGISTRATION_LABEL_CHARS: usize = 6;

/// Anything occupying an inclusive date range on the calendar
pub trait Spanning {
  fn start_date(&self) -> NaiveDate;
  fn end_date(&self) -> NaiveDate;

  fn covers(&self, date: NaiveDate) -> bool {
    self.start_date() <= date && date <= self.end_date()
  }
}

impl Spanning for Competition {
  fn start_date(&self) -> NaiveDate {
    self.start_date
  }

  fn end_date(&self) -> NaiveDate {
    self.end_date
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSegment {
  Single,
  Start,
  Middle,
  End,
}

impl EventSegment {
  pub fn as_str(&self) -> &'static str {
    match self {
      EventSegment::Single => "single",
      EventSegment::Start => "start",
      EventSegment::Middle => "middle",
      EventSegment::End => "end",
    }
  }

  /// Whether the label is drawn on this piece of the bar
  pub fn shows_label(&self) -> bool {
    matches!(self, EventSegment::Single | EventSegment::Start)
  }
}

/// Segment of `event` on `date`, or None when the date is outside its range
pub fn segment_on<E: Spanning>(event: &E, date: NaiveDate) -> Option<EventSegment> {
  if !event.covers(date) {
    return None;
  }
  let segment = if event.start_date() == event.end_date() {
    EventSegment::Single
  } else if date == event.start_date() {
    EventSegment::Start
  } else if date == event.end_date() {
    EventSegment::End
  } else {
    EventSegment::Middle
  };
  Some(segment)
}

/// Events active on `date`, in input order
pub fn events_on<E: Spanning>(events: &[E], date: NaiveDate) -> Vec<&E> {
  events.iter().filter(|e| e.covers(date)).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedEvent<'a, E> {
  pub event: &'a E,
  pub segment: EventSegment,
}

/// Events for one cell, capped at DISPLAY_CAP
#[derive(Debug, Clone, Serialize)]
pub struct CellEvents<'a, E> {
  pub visible: Vec<PlacedEvent<'a, E>>,
  pub overflow: usize,
}

impl<E> CellEvents<'_, E> {
  pub fn total(&self) -> usize {
    self.visible.len() + self.overflow
  }

  pub fn overflow_label(&self) -> Option<String> {
    (self.overflow > 0).then(|| format!("+{} more", self.overflow))
  }
}

pub fn place_cell<E: Spanning>(events: &[E], date: NaiveDate) -> CellEvents<'_, E> {
  let active = events_on(events, date);
  let overflow = active.len().saturating_sub(DISPLAY_CAP);
  let visible = active
    .into_iter()
    .take(DISPLAY_CAP)
    .filter_map(|event| segment_on(event, date).map(|segment| PlacedEvent { event, segment }))
    .collect();

  CellEvents { visible, overflow }
}

/// ---------------------------------------------------------------------------
/// Registration Markers
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationMarker<'a> {
  pub entry: &'a RegistrationEntry,
  pub label: String,
}

/// Shorten a competition name for a registration badge
pub fn registration_label(competition_name: &str) -> String {
  if competition_name.chars().count() > REGISTRATION_LABEL_CHARS {
    let short: String = competition_name.chars().take(REGISTRATION_LABEL_CHARS).collect();
    format!("{}..", short)
  } else {
    competition_name.to_string()
  }
}

/// Registration periods opening on `date`; these are never capped
pub fn registrations_on(entries: &[RegistrationEntry], date: NaiveDate) -> Vec<RegistrationMarker<'_>> {
  entries
    .iter()
    .filter(|e| e.registration_date == date)
    .map(|entry| RegistrationMarker {
      entry,
      label: registration_label(&entry.competition_name),
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Month Layout
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DayCell<'a> {
  pub day: &'a CalendarDay,
  pub events: CellEvents<'a, Competition>,
  pub registrations: Vec<RegistrationMarker<'a>>,
}

pub fn layout_month<'a>(
  grid: &'a [CalendarDay],
  competitions: &'a [Competition],
  registrations: &'a [RegistrationEntry],
) -> Vec<DayCell<'a>> {
  grid
    .iter()
    .map(|day| DayCell {
      day,
      events: place_cell(competitions, day.date),
      registrations: registrations_on(registrations, day.date),
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
