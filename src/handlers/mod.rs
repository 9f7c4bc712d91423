//! HTTP handlers. Each one validates its query, makes one fetcher call and
//! maps the outcome to a response.

pub mod catalog_handlers;
pub mod health_handlers;
pub mod music_handlers;
pub mod params;

use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Header value as text; absent or non-ASCII values are treated as missing.
fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// The entity tag an `If-None-Match` names, when it names exactly one.
fn single_validator(value: Option<&str>) -> Option<&str> {
    let tag = value?.trim();
    (!tag.is_empty() && tag != "*" && !tag.contains(',')).then_some(tag)
}

/// Empty 304 carrying the tag the client's copy is still valid under.
fn not_modified(etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    if let Some(value) = etag.and_then(|tag| HeaderValue::from_str(tag).ok()) {
        response.headers_mut().insert(header::ETAG, value);
    }
    response
}
