//! Free-text → structured object decoding for provider responses.
//!
//! Model output is rarely clean JSON: it may be fenced, or an object
//! embedded in surrounding prose. The accepted grammar is, in order:
//!
//! 1. a raw JSON object,
//! 2. a fenced code block (```json ... ```) containing a JSON object,
//! 3. the first `{...}` block found anywhere in the text.
//!
//! Anything else is a [`DecodeError`]. Callers treat a decode failure
//! exactly like a provider failure.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

static OBJECT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("object block regex"));
static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[a-zA-Z0-9_-]*\n").expect("fence open regex"));
static FENCE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n```$").expect("fence close regex"));

/// Decoding failure — no well-formed object could be located.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no JSON object found in model output")]
    NoObject,
    #[error("located JSON is not an object")]
    NotAnObject,
    #[error("malformed JSON object: {0}")]
    Syntax(#[from] serde_json::Error),
}

/// Extract exactly one JSON object from free-form model output.
pub fn decode_object(text: &str) -> Result<Map<String, Value>, DecodeError> {
    let mut cleaned = text.trim().to_string();

    if cleaned.starts_with("```") {
        cleaned = FENCE_OPEN.replace(&cleaned, "").into_owned();
        cleaned = FENCE_CLOSE.replace(&cleaned, "").trim().to_string();
    }

    // Direct parse first; fall back to the first {...} block.
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(map);
    }

    let block = OBJECT_BLOCK
        .find(&cleaned)
        .ok_or(DecodeError::NoObject)?
        .as_str();
    match serde_json::from_str::<Value>(block)? {
        Value::Object(map) => Ok(map),
        _ => Err(DecodeError::NotAnObject),
    }
}

/// Fetch a string field, tolerating non-string scalars.
pub fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
