//! Thumbnail descriptors stored as JSON in object metadata.

use crate::rfc2047;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("thumbnail metadata is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Decode a stored descriptor into JSON.
///
/// The value may arrive as an RFC 2047 encoded-word. Uploaders sometimes
/// leave whitespace inside the image URL; it is removed.
pub fn parse_descriptor(raw: &str) -> Result<Value, ThumbnailError> {
    let decoded = if rfc2047::is_encoded_word(raw) {
        rfc2047::decode_mime_words(raw)
    } else {
        raw.to_string()
    };

    let mut descriptor: Value = serde_json::from_str(&decoded)?;
    if let Some(Value::String(url)) = descriptor.get_mut("url") {
        url.retain(|c| c != ' ');
    }
    Ok(descriptor)
}
