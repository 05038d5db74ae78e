//! Tracing subscriber setup

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Library noise kept down regardless of the configured filter
const QUIET_TARGETS: [&str; 3] = ["hyper=warn", "reqwest=warn", "sqlx::query=warn"];

/// Build the filter from a directive string such as `info` or
/// `workout_mate_lib=debug`; unparsable input falls back to `info`
pub fn build_filter(directives: &str) -> EnvFilter {
  let mut filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"));
  for target in QUIET_TARGETS {
    if let Ok(directive) = target.parse() {
      filter = filter.add_directive(directive);
    }
  }
  filter
}

/// Install the global subscriber. Returns false if one was already set,
/// which happens when several tests initialise the library.
pub fn init_tracing(directives: &str) -> bool {
  tracing_subscriber::registry()
    .with(build_filter(directives))
    .with(fmt::layer().with_target(true))
    .try_init()
    .is_ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_filter_accepts_directives() {
    let filter = build_filter("workout_mate_lib=debug");
    assert!(filter.to_string().contains("workout_mate_lib=debug"));
    assert!(filter.to_string().contains("hyper=warn"));
  }

  #[test]
  fn test_second_init_is_harmless() {
    init_tracing("info");
    assert!(!init_tracing("debug"));
  }
}
