//! Bulk competition import from spreadsheet rows
//!
//! Each logical field accepts several column headers (English and Korean).
//! Rows are numbered the way a spreadsheet shows them: the header is row 1,
//! so the first data row is row 2.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::models::{CompetitionType, NewCompetition};

/// One spreadsheet row keyed by its column header
pub type RawRow = HashMap<String, String>;

const TYPE_KEYS: &[&str] = &["competition_type", "대회유형"];
const NAME_KEYS: &[&str] = &["name", "대회명"];
const ABBREVIATION_KEYS: &[&str] = &["abbreviation", "약어"];
const START_DATE_KEYS: &[&str] = &["start_date", "시작일"];
const END_DATE_KEYS: &[&str] = &["end_date", "종료일"];
const START_TIME_KEYS: &[&str] = &["start_time", "출발시간"];
const LOCATION_KEYS: &[&str] = &["location", "장소"];
const HOMEPAGE_KEYS: &[&str] = &["homepage_url", "홈페이지"];
const MEMO_KEYS: &[&str] = &["memo", "메모"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ImportError {
  #[error("Unsupported file format: {0}. Use .csv or .xlsx")]
  UnsupportedFormat(String),

  #[error("File is empty")]
  Empty,

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("Spreadsheet error: {0}")]
  Spreadsheet(#[from] calamine::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RowErrorKind {
  #[error("Invalid competition_type: \"{0}\"")]
  InvalidType(String),

  #[error("name is required")]
  MissingName,

  #[error("start_date is required")]
  MissingStartDate,

  #[error("location is required")]
  MissingLocation,

  #[error("Invalid start_date: \"{0}\"")]
  InvalidStartDate(String),

  #[error("Invalid end_date: \"{0}\"")]
  InvalidEndDate(String),

  #[error("end_date {end} is before start_date {start}")]
  EndBeforeStart { start: NaiveDate, end: NaiveDate },

  #[error("Insert failed: {0}")]
  Insert(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("row {row}: {kind}")]
pub struct RowError {
  pub row: usize,
  pub kind: RowErrorKind,
}

/// ---------------------------------------------------------------------------
/// Row Parsing
/// ---------------------------------------------------------------------------

/// The first synonym holding any value, trimmed; None when that value is
/// blank. A whitespace-only English column does not fall through to the
/// Korean one.
fn field<'a>(row: &'a RawRow, keys: &[&str]) -> Option<&'a str> {
  keys
    .iter()
    .filter_map(|k| row.get(*k))
    .find(|v| !v.is_empty())
    .map(|v| v.trim())
    .filter(|v| !v.is_empty())
}

fn optional(row: &RawRow, keys: &[&str]) -> Option<String> {
  field(row, keys).map(str::to_string)
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Validate one row. Checks run in a fixed order and the first failure wins.
pub fn parse_row(row_number: usize, row: &RawRow) -> Result<NewCompetition, RowError> {
  let fail = |kind| RowError { row: row_number, kind };

  let type_raw = field(row, TYPE_KEYS).unwrap_or("").to_lowercase();
  let competition_type: CompetitionType = type_raw
    .parse()
    .map_err(|_| fail(RowErrorKind::InvalidType(type_raw.clone())))?;

  let name = field(row, NAME_KEYS).ok_or_else(|| fail(RowErrorKind::MissingName))?;
  let start_raw = field(row, START_DATE_KEYS).ok_or_else(|| fail(RowErrorKind::MissingStartDate))?;
  let end_raw = field(row, END_DATE_KEYS).unwrap_or(start_raw);
  let location = field(row, LOCATION_KEYS).ok_or_else(|| fail(RowErrorKind::MissingLocation))?;

  let start_date =
    parse_date(start_raw).ok_or_else(|| fail(RowErrorKind::InvalidStartDate(start_raw.to_string())))?;
  let end_date =
    parse_date(end_raw).ok_or_else(|| fail(RowErrorKind::InvalidEndDate(end_raw.to_string())))?;
  if end_date < start_date {
    return Err(fail(RowErrorKind::EndBeforeStart { start: start_date, end: end_date }));
  }

  Ok(NewCompetition {
    competition_type,
    name: name.to_string(),
    abbreviation: optional(row, ABBREVIATION_KEYS),
    start_date,
    end_date,
    start_time: optional(row, START_TIME_KEYS),
    location: location.to_string(),
    homepage_url: optional(row, HOMEPAGE_KEYS),
    memo: optional(row, MEMO_KEYS),
  })
}

/// A row that passed validation, with its spreadsheet row number
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
  pub row: usize,
  pub competition: NewCompetition,
}

#[derive(Debug, Default)]
pub struct ParsedBatch {
  pub valid: Vec<ParsedRow>,
  pub errors: Vec<RowError>,
}

pub fn parse_rows(rows: &[RawRow]) -> Result<ParsedBatch, ImportError> {
  if rows.is_empty() {
    return Err(ImportError::Empty);
  }

  let mut batch = ParsedBatch::default();
  for (i, raw) in rows.iter().enumerate() {
    let row = i + 2;
    match parse_row(row, raw) {
      Ok(competition) => batch.valid.push(ParsedRow { row, competition }),
      Err(e) => {
        debug!("Rejected import {}", e);
        batch.errors.push(e);
      }
    }
  }
  Ok(batch)
}

/// ---------------------------------------------------------------------------
/// File Input
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
  Csv,
  /// .xlsx or .xls; the first sheet is read
  Spreadsheet,
}

pub fn check_file_name(file_name: &str) -> Result<FileFormat, ImportError> {
  let lower = file_name.to_lowercase();
  if lower.ends_with(".csv") {
    Ok(FileFormat::Csv)
  } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
    Ok(FileFormat::Spreadsheet)
  } else {
    Err(ImportError::UnsupportedFormat(file_name.to_string()))
  }
}

/// Raw rows of an uploaded file, by its extension
pub fn read_rows(file_name: &str, data: &[u8]) -> Result<Vec<RawRow>, ImportError> {
  match check_file_name(file_name)? {
    FileFormat::Csv => read_csv(data),
    FileFormat::Spreadsheet => read_spreadsheet(data),
  }
}

fn is_blank(values: &[String]) -> bool {
  values.iter().all(|v| v.trim().is_empty())
}

fn into_rows(headers: &[String], records: impl Iterator<Item = Vec<String>>) -> Vec<RawRow> {
  records
    .filter(|values| !is_blank(values))
    .map(|values| headers.iter().cloned().zip(values).collect())
    .collect()
}

/// Read a headed CSV into raw rows, skipping blank lines. Cell values are
/// kept as written; fields are trimmed when parsed.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawRow>, ImportError> {
  let mut rdr = csv::ReaderBuilder::new()
    .flexible(true)
    .trim(csv::Trim::Headers)
    .from_reader(reader);

  let headers: Vec<String> = rdr
    .headers()?
    .iter()
    .map(|h| h.trim_start_matches('\u{feff}').to_string())
    .collect();

  let records = rdr
    .records()
    .map(|record| record.map(|r| r.iter().map(str::to_string).collect::<Vec<_>>()))
    .collect::<Result<Vec<_>, _>>()?;

  let rows = into_rows(&headers, records.into_iter());
  if rows.is_empty() {
    return Err(ImportError::Empty);
  }
  Ok(rows)
}

/// Text for one spreadsheet cell. Date cells become `YYYY-MM-DD` and
/// time-only cells `HH:MM`, so they parse like their CSV counterparts.
fn cell_text(cell: &Data) -> String {
  match cell {
    Data::Empty => String::new(),
    Data::String(s) | Data::DurationIso(s) => s.clone(),
    Data::DateTimeIso(s) => s.get(..10).unwrap_or(s).to_string(),
    Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
    Data::DateTime(dt) => match dt.as_datetime() {
      Some(value) if dt.as_f64() < 1.0 => value.format("%H:%M").to_string(),
      Some(value) => value.date().format("%Y-%m-%d").to_string(),
      None => dt.as_f64().to_string(),
    },
    other => other.to_string(),
  }
}

/// Read the first sheet of an .xlsx/.xls workbook; row 1 is the header
pub fn read_spreadsheet(data: &[u8]) -> Result<Vec<RawRow>, ImportError> {
  let mut workbook = open_workbook_auto_from_rs(Cursor::new(data))?;
  let range = workbook.worksheet_range_at(0).ok_or(ImportError::Empty)??;

  let mut cells = range.rows();
  let Some(header) = cells.next() else {
    return Err(ImportError::Empty);
  };
  let headers: Vec<String> = header.iter().map(|c| cell_text(c).trim().to_string()).collect();

  let rows = into_rows(&headers, cells.map(|row| row.iter().map(cell_text).collect()));
  debug!("Read {} rows from spreadsheet", rows.len());
  if rows.is_empty() {
    return Err(ImportError::Empty);
  }
  Ok(rows)
}

/// Outcome of a bulk import, reported back to the uploader
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
  pub success: usize,
  pub errors: Vec<RowError>,
}

impl ImportSummary {
  pub fn message(&self) -> String {
    if self.errors.is_empty() {
      format!("{} imported", self.success)
    } else {
      format!("{} imported, {} failed", self.success, self.errors.len())
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
