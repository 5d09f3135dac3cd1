//! Relative duration strings such as `"1 seconds"`, `"2h"`, `"1.5d"` or `"250"`.
//!
//! A bare number is milliseconds. Units are case-insensitive and may be
//! separated from the number by spaces. A year is 365.25 days.

use std::time::Duration;

const SECOND_MS: f64 = 1_000.0;
const MINUTE_MS: f64 = SECOND_MS * 60.0;
const HOUR_MS: f64 = MINUTE_MS * 60.0;
const DAY_MS: f64 = HOUR_MS * 24.0;
const WEEK_MS: f64 = DAY_MS * 7.0;
const YEAR_MS: f64 = DAY_MS * 365.25;

const NANOS_PER_MS: f64 = 1_000_000.0;
const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Inputs longer than this are rejected outright.
const MAX_INPUT_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration: {0:?}")]
    Invalid(String),
}

/// Parse a relative duration string.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationError::Empty);
    }
    if trimmed.len() > MAX_INPUT_LEN {
        return Err(DurationError::Invalid(input.to_string()));
    }

    let number_end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, rest) = trimmed.split_at(number_end);
    if !is_decimal(number) {
        return Err(DurationError::Invalid(input.to_string()));
    }
    let value: f64 = number
        .parse()
        .map_err(|_| DurationError::Invalid(input.to_string()))?;

    let unit = rest.trim_start_matches(' ').to_ascii_lowercase();
    let factor =
        unit_factor(&unit).ok_or_else(|| DurationError::Invalid(input.to_string()))?;

    to_duration(value * factor).ok_or_else(|| DurationError::Invalid(input.to_string()))
}

/// Nanosecond-rounded `Duration`, or `None` when `millis` does not fit.
fn to_duration(millis: f64) -> Option<Duration> {
    let nanos = (millis * NANOS_PER_MS).round();
    if !nanos.is_finite() {
        return None;
    }
    let secs = (nanos / NANOS_PER_SEC).floor();
    if secs >= u64::MAX as f64 {
        return None;
    }
    let subsec = (nanos - secs * NANOS_PER_SEC) as u32;
    Some(Duration::new(secs as u64, subsec))
}

/// `\d*\.?\d+`: digits with at most one dot, never ending in a dot.
fn is_decimal(s: &str) -> bool {
    if s.is_empty() || s.ends_with('.') {
        return false;
    }
    s.chars().filter(|&c| c == '.').count() <= 1
}

/// Milliseconds per unit. An empty unit means milliseconds.
fn unit_factor(unit: &str) -> Option<f64> {
    let factor = match unit {
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => SECOND_MS,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE_MS,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR_MS,
        "d" | "day" | "days" => DAY_MS,
        "w" | "week" | "weeks" => WEEK_MS,
        "y" | "yr" | "yrs" | "year" | "years" => YEAR_MS,
        _ => return None,
    };
    Some(factor)
}
