//! Object attributes returned by a HEAD request, and the normalization applied
//! to user metadata before it reaches API clients.

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// User metadata key holding the thumbnail descriptor.
pub const THUMBNAIL_KEY: &str = "thumbnail";

/// Attributes of a stored object, without its body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectMetadata {
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,

    /// User-defined metadata (`x-amz-meta-*`) exactly as the backend returned it.
    pub user: BTreeMap<String, String>,
}

impl ObjectMetadata {
    /// Raw thumbnail descriptor, possibly RFC 2047 encoded.
    pub fn thumbnail(&self) -> Option<&str> {
        self.user.get(THUMBNAIL_KEY).map(String::as_str)
    }

    /// User metadata as a JSON object: camelCase keys, numeric strings coerced
    /// to numbers. The thumbnail descriptor is left out; it has its own endpoint.
    pub fn normalized_fields(&self) -> Map<String, Value> {
        self.user
            .iter()
            .filter(|(key, _)| !key.eq_ignore_ascii_case(THUMBNAIL_KEY))
            .map(|(key, value)| (camel_case_key(key), coerce_value(value)))
            .collect()
    }
}

/// `emotion-score` / `emotion_score` / `Emotion-Score` -> `emotionScore`.
pub fn camel_case_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '-' || ch == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// Turn numeric strings into JSON numbers; everything else stays a string.
pub fn coerce_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Number(int.into());
    }
    if looks_like_decimal(trimmed) {
        if let Some(number) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    Value::String(raw.to_string())
}

/// f64 parsing also accepts `inf` and `NaN`; only plain decimal notation counts.
fn looks_like_decimal(value: &str) -> bool {
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
}
