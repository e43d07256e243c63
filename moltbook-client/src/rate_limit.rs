use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;
use std::time::Duration;

/// Hint keys a 429 body may carry, scanned in this order.
pub const RATE_LIMIT_HINT_KEYS: [&str; 3] = [
    "retry_after_minutes",
    "retry_after_seconds",
    "daily_remaining",
];

/// Collects whichever hint keys are present into a single readable
/// annotation, e.g. `retry_after_minutes=2, daily_remaining=0`.
/// Presence is what counts; a zero or null value is still surfaced.
pub fn rate_limit_hint(payload: &Value) -> Option<String> {
    let object = payload.as_object()?;
    let hints: Vec<String> = RATE_LIMIT_HINT_KEYS
        .iter()
        .filter_map(|key| {
            object
                .get(*key)
                .map(|value| format!("{}={}", key, render_value(value)))
        })
        .collect();
    if hints.is_empty() {
        None
    } else {
        Some(hints.join(", "))
    }
}

/// Parses a numeric `Retry-After` response header. Date-formatted
/// values are ignored and fall back to exponential backoff.
pub fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
