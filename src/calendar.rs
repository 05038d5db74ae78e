//! Month grid generation for the competition calendar
//!
//! A displayed month always fills whole weeks (Sunday first), padding the
//! leading and trailing cells with days from the neighbouring months.

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Days a fetch window extends past either edge of the displayed month,
/// so multi-day events that start or end just outside it still show up
pub const FETCH_MARGIN_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalendarError {
  #[error("Invalid month {0}, expected 1-12")]
  InvalidMonth(u32),

  #[error("Year {0} is out of range")]
  InvalidYear(i32),
}

/// ---------------------------------------------------------------------------
/// Year / Month Navigation
/// ---------------------------------------------------------------------------

/// A validated (year, month) pair; month is 1-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
  year: i32,
  month: u32,
}

impl YearMonth {
  pub fn new(year: i32, month: u32) -> Result<Self, CalendarError> {
    if !(1..=12).contains(&month) {
      return Err(CalendarError::InvalidMonth(month));
    }
    // Both neighbours must be representable too
    let prev_ok = year
      .checked_sub(1)
      .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
      .is_some();
    let next_ok = year
      .checked_add(1)
      .and_then(|y| NaiveDate::from_ymd_opt(y, 12, 31))
      .is_some();
    if !prev_ok || !next_ok {
      return Err(CalendarError::InvalidYear(year));
    }
    Ok(Self { year, month })
  }

  pub fn containing(date: NaiveDate) -> Self {
    Self {
      year: date.year(),
      month: date.month(),
    }
  }

  /// The month holding today's local date
  pub fn current() -> Self {
    Self::containing(Local::now().date_naive())
  }

  pub fn year(&self) -> i32 {
    self.year
  }

  pub fn month(&self) -> u32 {
    self.month
  }

  /// January rolls back to December of the prior year
  pub fn prev(&self) -> Self {
    if self.month == 1 {
      Self { year: self.year - 1, month: 12 }
    } else {
      Self { year: self.year, month: self.month - 1 }
    }
  }

  /// December rolls forward to January of the next year
  pub fn next(&self) -> Self {
    if self.month == 12 {
      Self { year: self.year + 1, month: 1 }
    } else {
      Self { year: self.year, month: self.month + 1 }
    }
  }

  pub fn first_day(&self) -> NaiveDate {
    // Range checked in new()
    NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
  }

  pub fn last_day(&self) -> NaiveDate {
    self.next().first_day() - Duration::days(1)
  }

  pub fn days_in_month(&self) -> u32 {
    self.last_day().day()
  }

  /// Inclusive date range to query events for when this month is displayed
  pub fn fetch_window(&self) -> DateWindow {
    DateWindow {
      start: self.first_day() - Duration::days(FETCH_MARGIN_DAYS),
      end: self.last_day() + Duration::days(FETCH_MARGIN_DAYS),
    }
  }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl DateWindow {
  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start <= date && date <= self.end
  }

  /// True when `[start, end]` shares at least one day with this window
  pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
    start <= self.end && end >= self.start
  }
}

/// ---------------------------------------------------------------------------
/// Grid Cells
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
  pub date: NaiveDate,
  pub day: u32,
  pub is_current_month: bool,
  pub is_today: bool,
  pub date_str: String,
}

impl CalendarDay {
  fn new(date: NaiveDate, month: YearMonth, today: NaiveDate) -> Self {
    Self {
      date,
      day: date.day(),
      is_current_month: YearMonth::containing(date) == month,
      is_today: date == today,
      date_str: format_date_str(date),
    }
  }

  /// 0 = Sunday .. 6 = Saturday
  pub fn weekday_index(&self) -> u32 {
    self.date.weekday().num_days_from_sunday()
  }
}

/// `YYYY-MM-DD` from the calendar fields of a local date
pub fn format_date_str(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

/// Build the Sunday-first grid for `month`, flagging `today`
pub fn build_month_grid(month: YearMonth, today: NaiveDate) -> Vec<CalendarDay> {
  let first = month.first_day();
  let leading = first.weekday().num_days_from_sunday() as i64;
  let days_in_month = month.days_in_month() as i64;

  let mut len = leading + days_in_month;
  let remainder = len % 7;
  if remainder != 0 {
    len += 7 - remainder;
  }

  let start = first - Duration::days(leading);
  (0..len)
    .map(|offset| CalendarDay::new(start + Duration::days(offset), month, today))
    .collect()
}

/// Grid for `month` against the current local date
pub fn month_grid(month: YearMonth) -> Vec<CalendarDay> {
  build_month_grid(month, Local::now().date_naive())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
