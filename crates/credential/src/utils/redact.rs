//! Log-safe rendering of federation responses and errors

use std::error::Error;

use serde_json::Value;

/// Maximum characters of a sanitized body written to logs
const MAX_BODY_LOG_CHARS: usize = 512;

/// Key fragments whose values are never logged (compared lowercase)
const SENSITIVE_KEY_FRAGMENTS: [&str; 3] = ["secret", "token", "password"];

/// Render a response body for logging with every sensitive value replaced
///
/// The whole body is parsed before truncation so a secret that straddles the
/// cut-off is still caught. A body that is not JSON is never echoed since it
/// cannot be redacted field by field.
pub fn sanitize_body_for_logging(body: &str) -> String {
    let Ok(mut json) = serde_json::from_str::<Value>(body) else {
        return format!("[non-JSON body, {} bytes]", body.len());
    };
    redact_value(&mut json);
    truncate_chars(&json.to_string(), MAX_BODY_LOG_CHARS)
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if is_sensitive(key) {
                    *field = Value::String("[REDACTED]".to_string());
                } else {
                    redact_value(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| key.contains(fragment))
}

/// Truncate to at most `max` characters, never splitting a code point
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}... [truncated, {} total bytes]", &text[..cut], text.len()),
        None => text.to_string(),
    }
}

/// Flatten an error and its `source()` chain into one line
///
/// reqwest hides the interesting part (refused connection, handshake alert,
/// unknown issuer) several sources deep.
pub fn error_chain(err: &dyn Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !rendered.contains(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = cause.source();
    }
    rendered
}
