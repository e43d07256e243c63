use serde_json::Value;
use std::sync::Arc;

/// Callback receiving one line per protocol event, suitable for a debug
/// pane or log file. The hook observes traffic only and never affects
/// request handling.
pub type DebugHook = Arc<dyn Fn(&str) + Send + Sync>;

/// How many characters of the bearer token survive redaction.
pub const TOKEN_PREVIEW_CHARS: usize = 12;

/// Maximum characters of an error body echoed into the transcript.
pub const ERROR_BODY_PREVIEW_CHARS: usize = 800;

/// Redacts an `Authorization` header value down to a short prefix so a
/// transcript can be shared without leaking the API key.
pub fn redact_authorization(value: &str) -> String {
    match value.strip_prefix("Bearer ") {
        Some(token) => format!("Bearer {}…", head_chars(token, TOKEN_PREVIEW_CHARS)),
        None => format!("{}…", head_chars(value, TOKEN_PREVIEW_CHARS)),
    }
}

/// Renders the outgoing header set with the bearer token redacted.
pub fn describe_headers(api_key: &str, json_content: bool) -> String {
    let auth = redact_authorization(&format!("Bearer {}", api_key));
    if json_content {
        format!("Authorization={}, Content-Type=application/json", auth)
    } else {
        format!("Authorization={}", auth)
    }
}

/// Top-level keys of a JSON body. Values are never echoed, only key
/// names, so request bodies stay out of the transcript.
pub fn json_keys(body: &Value) -> Vec<String> {
    body.as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

/// Truncates to `limit` characters, appending an ellipsis when cut.
pub fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let mut cut: String = text.chars().take(limit).collect();
        cut.push('…');
        cut
    } else {
        text.to_string()
    }
}

fn head_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}
