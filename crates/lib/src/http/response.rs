//! Response classification.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::HttpError;

/// A successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Blob(Vec<u8>),
    Empty,
}

impl Payload {
    /// Deserialize a JSON body; an empty body reads as `null`.
    pub fn into_json<T: DeserializeOwned>(self, path: &str) -> Result<T, HttpError> {
        let value = match self {
            Payload::Json(value) => value,
            Payload::Empty => Value::Null,
            Payload::Blob(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| HttpError::Decode {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?
            }
        };
        serde_json::from_value(value).map_err(|e| HttpError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Raw body bytes, JSON bodies re-serialized.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Blob(bytes) => bytes,
            Payload::Json(value) => value.to_string().into_bytes(),
            Payload::Empty => Vec::new(),
        }
    }
}

/// Human-readable message for a rejected request.
///
/// Prefers a `detail`, `error` or `message` string, then a field-keyed
/// validation map flattened into one sentence, then `HTTP <status>`.
pub fn error_message(status: u16, body: &[u8]) -> String {
    let fallback = || format!("HTTP {status}");
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return fallback();
    };

    match value {
        Value::Object(map) => {
            for key in ["detail", "error", "message"] {
                if let Some(message) = map.get(key).and_then(message_text) {
                    return message;
                }
            }
            let parts: Vec<String> = map
                .iter()
                .filter_map(|(field, value)| {
                    message_text(value).map(|msg| {
                        if field == "non_field_errors" {
                            msg
                        } else {
                            format!("{field}: {msg}")
                        }
                    })
                })
                .collect();
            if parts.is_empty() {
                fallback()
            } else {
                parts.join(". ")
            }
        }
        other => message_text(&other).unwrap_or_else(fallback),
    }
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(message_text).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    }
}
