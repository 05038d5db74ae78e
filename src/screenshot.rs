//! Reading workout summaries from app screenshots
//!
//! The model is shown the image and answers with a small JSON object. That
//! reply is turned into a `NewWorkout` for the user to review before it is
//! logged; nothing here writes to the database.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::import::parse_date;
use crate::llm::{extract_json, ImageInput, LlmClient, LlmError};
use crate::models::{NewWorkout, SharingType, ValidationError, WorkoutType};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const SUPPORTED_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

const MAX_TOKENS: u32 = 1024;

const METERS_PER_MILE: f64 = 1609.344;

#[derive(Debug, Error)]
pub enum ScreenshotError {
  #[error("Unsupported image type: {0}")]
  UnsupportedImage(String),

  #[error("Image is empty")]
  EmptyImage,

  #[error("Image is {0} bytes, the limit is 5 MB")]
  TooLarge(usize),

  #[error("Could not read {0} from the screenshot")]
  Missing(&'static str),

  #[error("Unreadable {field}: \"{value}\"")]
  Unreadable { field: &'static str, value: String },

  #[error("Screenshot reply was not valid JSON: {0}")]
  Reply(#[from] serde_json::Error),

  #[error("Invalid workout: {0}")]
  Invalid(#[from] ValidationError),

  #[error(transparent)]
  Llm(#[from] LlmError),
}

/// What the model read off the screen; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScreenshotReading {
  pub workout_type: Option<String>,
  pub workout_date: Option<String>,
  pub duration: Option<String>,
  pub distance: Option<f64>,
  pub distance_unit: Option<String>,
  pub avg_heart_rate: Option<f64>,
  pub cadence: Option<f64>,
  pub swolf: Option<f64>,
}

/// ---------------------------------------------------------------------------
/// Parsing
/// ---------------------------------------------------------------------------

/// Seconds in `h:mm:ss`, `m:ss`, or a bare number of minutes.
/// Fractional seconds are rounded.
pub fn parse_duration(text: &str) -> Option<i64> {
  let parts: Vec<&str> = text.trim().split(':').map(str::trim).collect();
  let (hours, minutes, seconds) = match parts.as_slice() {
    [m] => return m.parse::<f64>().ok().filter(|m| *m > 0.0).map(|m| (m * 60.0).round() as i64),
    [m, s] => ("0", *m, *s),
    [h, m, s] => (*h, *m, *s),
    _ => return None,
  };

  let hours: i64 = hours.parse().ok()?;
  let minutes: i64 = minutes.parse().ok()?;
  let seconds: f64 = seconds.parse().ok()?;
  if hours < 0 || minutes < 0 || !(0.0..60.0).contains(&seconds) {
    return None;
  }
  let total = hours * 3600 + minutes * 60 + seconds.round() as i64;
  (total > 0).then_some(total)
}

/// Metres for a distance in `unit` (km, m or mi). Without a unit, swims are
/// read as metres and everything else as kilometres.
pub fn distance_meters(value: f64, unit: Option<&str>, workout_type: WorkoutType) -> Option<f64> {
  if !value.is_finite() || value < 0.0 {
    return None;
  }
  let unit = unit.map(|u| u.trim().to_lowercase());
  let factor = match unit.as_deref() {
    Some("km" | "kilometer" | "kilometers") => 1000.0,
    Some("m" | "meter" | "meters") => 1.0,
    Some("mi" | "mile" | "miles") => METERS_PER_MILE,
    Some("") | None if workout_type.is_swimming() => 1.0,
    Some("") | None => 1000.0,
    Some(_) => return None,
  };
  Some(value * factor)
}

fn whole(value: Option<f64>) -> Option<i64> {
  value.filter(|v| v.is_finite() && *v > 0.0).map(|v| v.round() as i64)
}

/// Turn a reading into a workout draft. A missing date means `today`; a
/// missing distance means 0. Type and duration are required.
pub fn reading_to_workout(reading: &ScreenshotReading, today: NaiveDate) -> Result<NewWorkout, ScreenshotError> {
  let type_raw = reading
    .workout_type
    .as_deref()
    .map(|t| t.trim().to_lowercase())
    .ok_or(ScreenshotError::Missing("workout_type"))?;
  let workout_type: WorkoutType = type_raw.parse().map_err(|_| ScreenshotError::Unreadable {
    field: "workout_type",
    value: type_raw.clone(),
  })?;

  let workout_date = match reading.workout_date.as_deref().map(str::trim) {
    Some(raw) if !raw.is_empty() => parse_date(raw).ok_or_else(|| ScreenshotError::Unreadable {
      field: "workout_date",
      value: raw.to_string(),
    })?,
    _ => today,
  };

  let duration_raw = reading
    .duration
    .as_deref()
    .ok_or(ScreenshotError::Missing("duration"))?;
  let duration_seconds = parse_duration(duration_raw).ok_or_else(|| ScreenshotError::Unreadable {
    field: "duration",
    value: duration_raw.to_string(),
  })?;

  let distance_meters = match reading.distance {
    Some(value) => distance_meters(value, reading.distance_unit.as_deref(), workout_type).ok_or_else(|| {
      ScreenshotError::Unreadable {
        field: "distance",
        value: format!("{} {}", value, reading.distance_unit.as_deref().unwrap_or("")).trim().to_string(),
      }
    })?,
    None => 0.0,
  };

  let workout = NewWorkout {
    workout_type,
    workout_date,
    duration_seconds,
    distance_meters,
    avg_heart_rate: whole(reading.avg_heart_rate),
    cadence: whole(reading.cadence),
    swolf: whole(reading.swolf),
    avg_power: None,
    sharing_type: SharingType::Public,
    shared_group_id: None,
  };
  workout.validate()?;
  Ok(workout)
}

/// Parse the model's reply, with or without a code fence
pub fn parse_reply(reply: &str, today: NaiveDate) -> Result<NewWorkout, ScreenshotError> {
  let json = extract_json(reply)?;
  let reading: ScreenshotReading = serde_json::from_str(&json)?;
  debug!("Screenshot reading: {:?}", reading);
  reading_to_workout(&reading, today)
}

/// ---------------------------------------------------------------------------
/// Model Call
/// ---------------------------------------------------------------------------

pub fn system_prompt() -> &'static str {
  include_str!("prompts/workout_screenshot.txt")
}

fn check_image(image: &ImageInput<'_>) -> Result<(), ScreenshotError> {
  if !SUPPORTED_MEDIA_TYPES.contains(&image.media_type) {
    return Err(ScreenshotError::UnsupportedImage(image.media_type.to_string()));
  }
  if image.bytes.is_empty() {
    return Err(ScreenshotError::EmptyImage);
  }
  if image.bytes.len() > MAX_IMAGE_BYTES {
    return Err(ScreenshotError::TooLarge(image.bytes.len()));
  }
  Ok(())
}

/// Ask the model to read a workout summary screenshot
pub async fn read_screenshot(
  client: &LlmClient,
  image: ImageInput<'_>,
  today: NaiveDate,
) -> Result<NewWorkout, ScreenshotError> {
  check_image(&image)?;
  let (reply, usage) = client
    .complete_with_image(
      system_prompt(),
      "Extract the workout from this screenshot.",
      image,
      MAX_TOKENS,
    )
    .await?;

  let workout = parse_reply(&reply, today)?;
  info!(
    "Read {} workout from screenshot, {}+{} tokens",
    workout.workout_type, usage.input_tokens, usage.output_tokens
  );
  Ok(workout)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
