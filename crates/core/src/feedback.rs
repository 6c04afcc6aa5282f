//! User-facing notifications and the normalization of backend failures into them.

use std::time::Duration;

use serde_json::Value;

use crate::http::Failure;

pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_secs(3);
pub const VALIDATION_NOTICE_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
    pub duration: Duration,
}

impl Notice {
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            duration: DEFAULT_NOTICE_DURATION,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Level::Success, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Level::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Level::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Level::Error, text)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Turns a failed write into one notification.
///
/// `400` payloads are flattened into one line per violation, `409` payloads are shown
/// verbatim, and everything else shows the payload's `message` or `fallback`.
pub fn present_failure(failure: &Failure, fallback: &str) -> Notice {
    let Failure::Status { status, body } = failure else {
        return Notice::error(fallback);
    };

    match *status {
        400 => {
            let lines = flatten_messages(body);
            if lines.is_empty() {
                Notice::error(fallback)
            } else {
                Notice::error(lines.join("\n")).with_duration(VALIDATION_NOTICE_DURATION)
            }
        }
        409 => Notice::error(payload_text(body).unwrap_or_else(|| fallback.to_string())),
        _ => Notice::error(message_field(body).unwrap_or_else(|| fallback.to_string())),
    }
}

/// One line per violation: `field: message` for mappings, one line per element for arrays,
/// strings unchanged.
pub fn flatten_messages(body: &Value) -> Vec<String> {
    match body {
        Value::Null => Vec::new(),
        Value::String(text) => {
            if text.trim().is_empty() {
                Vec::new()
            } else {
                vec![text.clone()]
            }
        }
        Value::Array(items) => items.iter().filter_map(element_text).collect(),
        Value::Object(map) => map
            .iter()
            .flat_map(|(field, value)| match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| format!("{field}: {}", scalar_text(item)))
                    .collect::<Vec<_>>(),
                other => vec![format!("{field}: {}", scalar_text(other))],
            })
            .collect(),
        other => vec![other.to_string()],
    }
}

/// The payload as plain text: strings as-is, objects by their `message`, anything else as JSON.
pub fn payload_text(body: &Value) -> Option<String> {
    match body {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => message_field(other).or_else(|| Some(other.to_string())),
    }
}

fn message_field(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|msg| !msg.trim().is_empty())
        .map(str::to_string)
}

fn element_text(item: &Value) -> Option<String> {
    match item {
        Value::Null => None,
        Value::Object(map) => {
            let message = map
                .get("message")
                .or_else(|| map.get("defaultMessage"))
                .map(scalar_text);
            match (map.get("field").and_then(Value::as_str), message) {
                (Some(field), Some(message)) => Some(format!("{field}: {message}")),
                (None, Some(message)) => Some(message),
                _ => Some(item.to_string()),
            }
        }
        other => Some(scalar_text(other)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
