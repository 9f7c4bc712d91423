//! Storage keys for the resources this service serves.
//!
//! Every object lives at `<author>/<title>.<ext>`, where the extension is fixed
//! by the kind of resource.

use std::fmt;
use thiserror::Error;

const MAX_SEGMENT_LEN: usize = 512;

/// Kind of object addressed by a key; decides the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// WebM audio container.
    Audio,
    /// Cover image stored next to the audio.
    ThumbnailImage,
}

impl ResourceKind {
    pub fn extension(self) -> &'static str {
        match self {
            ResourceKind::Audio => "webm",
            ResourceKind::ThumbnailImage => "webp",
        }
    }

    /// Content type used when the backend does not report one.
    pub fn default_content_type(self) -> &'static str {
        match self {
            ResourceKind::Audio => "audio/webm",
            ResourceKind::ThumbnailImage => "image/webp",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    #[error("`{0}` is too long")]
    TooLong(&'static str),
    #[error("`{0}` contains a path separator")]
    PathSeparator(&'static str),
    #[error("`{0}` contains a relative path component")]
    RelativePath(&'static str),
    #[error("`{0}` contains control characters")]
    ControlCharacter(&'static str),
}

/// A validated `<author>/<title>.<ext>` object key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceKey {
    key: String,
}

impl ResourceKey {
    /// Build a key from untrusted segments, rejecting anything that could
    /// escape the `<author>/` prefix.
    pub fn new(kind: ResourceKind, author: &str, title: &str) -> Result<Self, KeyError> {
        validate_segment("author", author)?;
        validate_segment("title", title)?;
        Ok(Self {
            key: format!("{}/{}.{}", author, title, kind.extension()),
        })
    }

    /// Recover `(author, title)` from a stored key of the given kind.
    ///
    /// Only keys whose segments would pass `new` match, so every parsed pair
    /// can be turned back into the same key.
    pub fn parse(kind: ResourceKind, key: &str) -> Option<(String, String)> {
        let stem = key.strip_suffix(kind.extension())?.strip_suffix('.')?;
        let (author, title) = stem.split_once('/')?;
        validate_segment("author", author).ok()?;
        validate_segment("title", title).ok()?;
        Some((author.to_string(), title.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Allow-list check for one untrusted key segment; `field` names it in errors.
pub fn validate_segment(field: &'static str, segment: &str) -> Result<(), KeyError> {
    if segment.is_empty() {
        return Err(KeyError::Empty(field));
    }
    if segment.len() > MAX_SEGMENT_LEN {
        return Err(KeyError::TooLong(field));
    }
    if segment.contains('/') || segment.contains('\\') {
        return Err(KeyError::PathSeparator(field));
    }
    if segment == "." || segment == ".." {
        return Err(KeyError::RelativePath(field));
    }
    if segment.chars().any(char::is_control) {
        return Err(KeyError::ControlCharacter(field));
    }
    Ok(())
}
