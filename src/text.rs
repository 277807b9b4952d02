//! Text processing for raw sensor output
//!
//! Three small utilities sit between unpredictable device-formatted text and
//! the structured pipeline: a defensive field splitter, a numeric cleaner and
//! the snake-case normalizer used to derive Home Assistant entity keys.

use once_cell::sync::Lazy;
use regex::Regex;

static UPPER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new("([A-Z]+)").expect("static pattern"));
static CAPITALIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new("([A-Z][a-z]+)").expect("static pattern"));

/// Split `input` on `separator` and return exactly `count` trimmed fields.
///
/// Indices beyond the produced fields yield `default` instead of failing, so
/// short or malformed device output never aborts parsing. An empty input
/// yields `count` copies of the default.
pub fn split_fields(input: &str, separator: char, default: &str, count: usize) -> Vec<String> {
    if input.is_empty() {
        return vec![default.to_string(); count];
    }

    let parts: Vec<&str> = input.split(separator).collect();
    (0..count)
        .map(|idx| match parts.get(idx) {
            Some(part) => part.trim().to_string(),
            None => default.to_string(),
        })
        .collect()
}

/// Parse a raw token as a float rounded to `precision` decimal places.
///
/// Any parse failure, and any non-finite result, degrades to `fallback` so
/// downstream readings always hold a finite number.
pub fn clean_value(raw: &str, fallback: f64, precision: i32) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => round_value(value, precision),
        _ => fallback,
    }
}

/// Round an already-numeric value to `precision` decimal places.
pub fn round_value(value: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    (value * factor).round() / factor
}

/// Convert an arbitrary label into a lowercase underscore-joined identifier.
///
/// Hyphens become spaces, a space is inserted before uppercase runs and
/// before capitalized words (so `CamelCase` and `COtwo` style labels split on
/// casing transitions), periods become underscores, and the remaining
/// whitespace-delimited tokens are joined with underscores and lowercased.
/// The transformation is deterministic and idempotent.
pub fn snake_case(input: &str) -> String {
    let spaced = input.replace('-', " ");
    let spaced = UPPER_RUN.replace_all(&spaced, " ${1}");
    let spaced = CAPITALIZED.replace_all(&spaced, " ${1}");
    let spaced = spaced.replace('.', "_");

    spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}
