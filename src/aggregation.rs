//! Period aggregation of workout history for the statistics chart
//!
//! The chart always shows BUCKET_COUNT consecutive periods ending at an
//! anchor date. Sums (distance, duration) are true zeros when nothing
//! matched; averages and pace are None instead, so "no data" never reads
//! as "measured zero".

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::DateWindow;
use crate::models::{GoalMetric, GoalPeriod, PersonalGoal, Workout, WorkoutType};

pub const BUCKET_COUNT: u32 = 5;

/// ---------------------------------------------------------------------------
/// Chart Options
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Period {
  #[default]
  Daily,
  Weekly,
  Monthly,
  Yearly,
}

impl Period {
  /// `date` moved back by `n` whole periods, or None past the calendar's
  /// range. Month arithmetic clamps to the last valid day
  /// (Mar 31 - 1 month = Feb 28).
  pub fn shift_back(&self, date: NaiveDate, n: u32) -> Option<NaiveDate> {
    match self {
      Period::Daily => date.checked_sub_signed(Duration::days(n as i64)),
      Period::Weekly => date.checked_sub_signed(Duration::weeks(n as i64)),
      Period::Monthly => date.checked_sub_months(Months::new(n)),
      Period::Yearly => date.checked_sub_months(Months::new(n.checked_mul(12)?)),
    }
  }

  /// Whether both dates fall in the same day / ISO week / month / year
  pub fn same_slot(&self, a: NaiveDate, b: NaiveDate) -> bool {
    match self {
      Period::Daily => a == b,
      Period::Weekly => a.iso_week() == b.iso_week(),
      Period::Monthly => a.year() == b.year() && a.month() == b.month(),
      Period::Yearly => a.year() == b.year(),
    }
  }

  pub fn label(&self, date: NaiveDate) -> String {
    match self {
      Period::Daily => date.format("%m/%d").to_string(),
      Period::Weekly => {
        let (monday, sunday) = iso_week_bounds(date);
        format!("{} ~ {}", monday.format("%m/%d"), sunday.format("%m/%d"))
      }
      Period::Monthly => date.format("%Y-%m").to_string(),
      Period::Yearly => date.format("%Y").to_string(),
    }
  }
}

/// Monday and Sunday of the ISO week holding `date`, clamped to the
/// representable range
pub fn iso_week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
  let monday = date
    .checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
    .unwrap_or(NaiveDate::MIN);
  let sunday = monday
    .checked_add_signed(Duration::days(6))
    .unwrap_or(NaiveDate::MAX);
  (monday, sunday)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
  #[default]
  Distance,
  Time,
}

/// "all", or a single workout type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActivityFilter {
  All,
  Only(WorkoutType),
}

impl Default for ActivityFilter {
  fn default() -> Self {
    ActivityFilter::Only(WorkoutType::Running)
  }
}

impl ActivityFilter {
  pub fn of(workout_type: WorkoutType) -> Self {
    ActivityFilter::Only(workout_type)
  }

  pub fn workout_type(&self) -> Option<WorkoutType> {
    match self {
      ActivityFilter::All => None,
      ActivityFilter::Only(t) => Some(*t),
    }
  }

  pub fn matches(&self, workout_type: WorkoutType) -> bool {
    self.workout_type().map_or(true, |t| t == workout_type)
  }

  /// Distances shown in metres and paced per 100 m
  pub fn is_swimming(&self) -> bool {
    self.workout_type().is_some_and(|t| t.is_swimming())
  }
}

impl From<ActivityFilter> for String {
  fn from(filter: ActivityFilter) -> Self {
    match filter.workout_type() {
      None => "all".to_string(),
      Some(t) => t.as_str().to_string(),
    }
  }
}

impl TryFrom<String> for ActivityFilter {
  type Error = String;
  fn try_from(value: String) -> Result<Self, Self::Error> {
    if value == "all" {
      return Ok(ActivityFilter::All);
    }
    value.parse::<WorkoutType>().map(ActivityFilter::of)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChartOptions {
  pub activity: ActivityFilter,
  pub metric: Metric,
  pub period: Period,
}

/// ---------------------------------------------------------------------------
/// Buckets
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationBucket {
  pub label: String,
  pub date: NaiveDate,
  /// km (metres for swimming) or minutes, one decimal
  pub value: f64,
  pub total_distance: f64,
  pub total_duration: i64,
  pub workout_count: u32,
  /// min/km, or min/100m for swimming
  pub pace: Option<f64>,
  /// km/h, or m/min for swimming
  pub speed: Option<f64>,
  pub avg_heart_rate: Option<i64>,
  pub avg_cadence: Option<i64>,
  pub avg_swolf: Option<i64>,
  pub avg_power: Option<i64>,
}

/// Running sum of an optional metric with its own non-null counter
#[derive(Debug, Clone, Copy, Default)]
struct MetricSum {
  sum: f64,
  count: u32,
}

impl MetricSum {
  fn add(&mut self, value: Option<i64>) {
    if let Some(v) = value {
      self.sum += v as f64;
      self.count += 1;
    }
  }

  fn average(&self) -> Option<i64> {
    (self.count > 0).then(|| (self.sum / self.count as f64).round() as i64)
  }
}

#[derive(Debug, Clone)]
struct Slot {
  date: NaiveDate,
  distance: f64,
  duration: i64,
  count: u32,
  heart_rate: MetricSum,
  cadence: MetricSum,
  swolf: MetricSum,
  power: MetricSum,
}

impl Slot {
  fn new(date: NaiveDate) -> Self {
    Self {
      date,
      distance: 0.0,
      duration: 0,
      count: 0,
      heart_rate: MetricSum::default(),
      cadence: MetricSum::default(),
      swolf: MetricSum::default(),
      power: MetricSum::default(),
    }
  }

  fn add(&mut self, w: &Workout) {
    self.distance += w.distance_meters;
    self.duration += w.duration_seconds;
    self.count += 1;
    self.heart_rate.add(w.avg_heart_rate);
    self.cadence.add(w.cadence);
    self.swolf.add(w.swolf);
    self.power.add(w.avg_power);
  }
}

fn round_to(value: f64, decimals: i32) -> f64 {
  let factor = 10f64.powi(decimals);
  (value * factor).round() / factor
}

/// Minutes per km, or per 100 m when swimming. None without distance.
pub fn pace(distance_meters: f64, duration_seconds: i64, swimming: bool) -> Option<f64> {
  if distance_meters <= 0.0 {
    return None;
  }
  let divisor = if swimming { 100.0 } else { 1000.0 };
  Some((duration_seconds as f64 / 60.0) / (distance_meters / divisor))
}

/// km/h, or metres per minute when swimming. None without duration.
pub fn speed(distance_meters: f64, duration_seconds: i64, swimming: bool) -> Option<f64> {
  if duration_seconds <= 0 {
    return None;
  }
  let value = if swimming {
    distance_meters / (duration_seconds as f64 / 60.0)
  } else {
    (distance_meters / 1000.0) / (duration_seconds as f64 / 3600.0)
  };
  Some(value)
}

/// Bucket `workouts` into BUCKET_COUNT periods ending `offset` windows
/// before `today`, oldest bucket first. None when that window falls outside
/// the representable calendar.
pub fn aggregate(
  workouts: &[Workout],
  options: &ChartOptions,
  offset: u32,
  today: NaiveDate,
) -> Option<Vec<AggregationBucket>> {
  let period = options.period;
  let anchor = period.shift_back(today, offset.checked_mul(BUCKET_COUNT)?)?;

  let mut slots: Vec<Slot> = (0..BUCKET_COUNT)
    .rev()
    .map(|i| period.shift_back(anchor, i).map(Slot::new))
    .collect::<Option<_>>()?;

  for w in workouts.iter().filter(|w| options.activity.matches(w.workout_type)) {
    if let Some(slot) = slots
      .iter_mut()
      .find(|s| period.same_slot(s.date, w.workout_date))
    {
      slot.add(w);
    }
  }

  let swimming = options.activity.is_swimming();
  let buckets = slots
    .into_iter()
    .map(|s| {
      let value = match options.metric {
        Metric::Distance if swimming => s.distance,
        Metric::Distance => s.distance / 1000.0,
        Metric::Time => s.duration as f64 / 60.0,
      };

      AggregationBucket {
        label: period.label(s.date),
        date: s.date,
        value: round_to(value, 1),
        total_distance: s.distance,
        total_duration: s.duration,
        workout_count: s.count,
        pace: pace(s.distance, s.duration, swimming).map(|p| round_to(p, 2)),
        speed: speed(s.distance, s.duration, swimming).map(|v| round_to(v, 1)),
        avg_heart_rate: s.heart_rate.average(),
        avg_cadence: s.cadence.average(),
        avg_swolf: s.swolf.average(),
        avg_power: s.power.average(),
      }
    })
    .collect();
  Some(buckets)
}

/// The activity type of the most recent workout, used as the chart default
pub fn latest_activity(workouts: &[Workout]) -> Option<WorkoutType> {
  workouts
    .iter()
    .max_by_key(|w| (w.workout_date, w.created_at))
    .map(|w| w.workout_type)
}

/// ---------------------------------------------------------------------------
/// Goal Progress
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
  pub period: GoalPeriod,
  pub target: f64,
  /// km, or metres for swimming; one decimal
  pub actual: f64,
  pub has_goal: bool,
  /// 0-100
  pub percent: u32,
  pub unit: &'static str,
}

fn goal_slot(period: GoalPeriod) -> Period {
  match period {
    GoalPeriod::Weekly => Period::Weekly,
    GoalPeriod::Monthly => Period::Monthly,
    GoalPeriod::Yearly => Period::Yearly,
  }
}

/// Distance done this week / month / year against active distance goals
pub fn goal_progress(
  workouts: &[Workout],
  goals: &[PersonalGoal],
  activity: WorkoutType,
  today: NaiveDate,
) -> Vec<GoalProgress> {
  GoalPeriod::ALL
    .iter()
    .map(|&period| {
      let goal = goals.iter().find(|g| {
        g.is_active
          && g.activity_type == activity
          && g.period_type == period
          && g.metric_type == GoalMetric::Distance
      });

      let slot = goal_slot(period);
      let meters: f64 = workouts
        .iter()
        .filter(|w| w.workout_type == activity && slot.same_slot(w.workout_date, today))
        .map(|w| w.distance_meters)
        .sum();
      let actual = if activity.is_swimming() { meters } else { meters / 1000.0 };
      let actual = round_to(actual, 1);

      let target = goal.map_or(0.0, |g| g.target_value);
      let percent = if target > 0.0 {
        ((actual / target) * 100.0).round().clamp(0.0, 100.0) as u32
      } else {
        0
      };

      GoalProgress {
        period,
        target,
        actual,
        has_goal: goal.is_some(),
        percent,
        unit: activity.distance_unit(),
      }
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Group Leaderboard
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
  pub user_id: String,
  pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberStats {
  pub user_id: String,
  pub nickname: String,
  pub total_distance: f64,
  pub total_duration: i64,
  pub workout_count: u32,
  pub workout_days: u32,
  pub rank: u32,
}

/// Group views count treadmill sessions as running
pub fn counts_toward(selected: WorkoutType, actual: WorkoutType) -> bool {
  match selected {
    WorkoutType::Running => matches!(actual, WorkoutType::Running | WorkoutType::Treadmill),
    other => other == actual,
  }
}

/// Per-member totals for `selected`, active members only, by distance
pub fn leaderboard(members: &[Member], workouts: &[Workout], selected: WorkoutType) -> Vec<MemberStats> {
  let mut totals: HashMap<&str, (f64, i64, u32, HashSet<NaiveDate>)> = HashMap::new();

  for w in workouts.iter().filter(|w| counts_toward(selected, w.workout_type)) {
    let entry = totals
      .entry(w.user_id.as_str())
      .or_insert_with(|| (0.0, 0, 0, HashSet::new()));
    entry.0 += w.distance_meters;
    entry.1 += w.duration_seconds;
    entry.2 += 1;
    entry.3.insert(w.workout_date);
  }

  let mut stats: Vec<MemberStats> = members
    .iter()
    .filter_map(|m| {
      let (distance, duration, count, days) = totals.get(m.user_id.as_str())?;
      Some(MemberStats {
        user_id: m.user_id.clone(),
        nickname: m.nickname.clone(),
        total_distance: *distance,
        total_duration: *duration,
        workout_count: *count,
        workout_days: days.len() as u32,
        rank: 0,
      })
    })
    .collect();

  stats.sort_by(|a, b| b.total_distance.total_cmp(&a.total_distance));
  for (i, s) in stats.iter_mut().enumerate() {
    s.rank = i as u32 + 1;
  }
  stats
}

/// Look-back range for the group statistics view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum StatsRange {
  OneWeek,
  OneMonth,
  ThreeMonths,
  Custom { from: NaiveDate, to: NaiveDate },
}

impl StatsRange {
  pub fn bounds(&self, today: NaiveDate) -> DateWindow {
    let start = match self {
      StatsRange::OneWeek => today - Duration::weeks(1),
      StatsRange::OneMonth => today.checked_sub_months(Months::new(1)).unwrap_or(today),
      StatsRange::ThreeMonths => today.checked_sub_months(Months::new(3)).unwrap_or(today),
      StatsRange::Custom { from, to } => {
        return DateWindow {
          start: (*from).min(*to),
          end: (*from).max(*to),
        }
      }
    };
    DateWindow { start, end: today }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
