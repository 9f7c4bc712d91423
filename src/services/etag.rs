//! Entity-tag helpers for validators this service evaluates itself.
//!
//! Object reads forward `If-None-Match` to the backend untouched; only the
//! listing, which has no backend-side tag, is checked here.

use crate::services::backend::ListedObject;

/// `If-None-Match` evaluation with weak comparison (RFC 9110 §13.1.2).
pub fn if_none_match_matches(header: &str, etag: &str) -> bool {
    let current = opaque_tag(etag);
    header
        .split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .any(|candidate| candidate == "*" || opaque_tag(candidate) == current)
}

/// Weak tag over the keys (and their versions) that make up a listing.
///
/// Reordering the input does not change the tag.
pub fn listing_etag<'a, I>(objects: I) -> String
where
    I: IntoIterator<Item = &'a ListedObject>,
{
    let mut lines: Vec<String> = objects
        .into_iter()
        .map(|obj| {
            format!(
                "{}\0{}\0{}",
                obj.key,
                obj.etag.as_deref().unwrap_or(""),
                obj.last_modified.map(|t| t.timestamp()).unwrap_or_default()
            )
        })
        .collect();
    lines.sort();

    let mut digest = md5::Context::new();
    for line in &lines {
        digest.consume(line.as_bytes());
        digest.consume(b"\n");
    }
    format!("W/\"{:x}\"", digest.compute())
}

fn opaque_tag(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}
