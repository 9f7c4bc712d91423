//! HTTP handlers answering from object metadata: the track listing and the
//! thumbnail descriptor.

use crate::{
    errors::AppError,
    handlers::{header_str, not_modified, params::track_key, single_validator},
    models::{resource::ResourceKind, thumbnail::parse_descriptor},
    services::fetcher::{ConditionalObjectFetcher, HeadOutcome, ListOutcome},
};
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::warn;

const THUMBNAIL_CACHE_CONTROL: &str = "public, max-age=3600, immutable";

/// `GET /list`: every track as `{author, title, metadata?}`.
///
/// The listing carries a weak ETag; a matching `If-None-Match` gets a 304.
pub async fn list_tracks(
    State(fetcher): State<ConditionalObjectFetcher>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    match fetcher.list(header_str(&headers, header::IF_NONE_MATCH)).await {
        ListOutcome::Entries { entries, etag } => {
            let mut response = Json(entries).into_response();
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&etag) {
                headers.insert(header::ETAG, value);
            }
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            Ok(response)
        }
        ListOutcome::NotModified { etag } => Ok(not_modified(Some(&etag))),
        ListOutcome::BackendError(err) => Err(err.into()),
    }
}

/// `GET /thumbnail?author=&title=`: the decoded thumbnail descriptor stored
/// on `<author>/<title>.webm`, or `null` when the track has none.
pub async fn get_thumbnail(
    State(fetcher): State<ConditionalObjectFetcher>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let key = track_key(&query, ResourceKind::Audio, "author")?;

    let validator = header_str(&headers, header::IF_NONE_MATCH);
    let metadata = match fetcher.head_metadata(&key, validator).await {
        HeadOutcome::Found(metadata) => metadata,
        HeadOutcome::NotModified => return Ok(not_modified(single_validator(validator))),
        HeadOutcome::BackendError(err) => return Err(err.into()),
    };

    let descriptor = match metadata.thumbnail() {
        Some(raw) => parse_descriptor(raw).map_err(|err| {
            warn!(key = %key, "unreadable thumbnail metadata: {}", err);
            AppError::internal(err.to_string())
        })?,
        None => Value::Null,
    };

    let mut response = Json(descriptor).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(THUMBNAIL_CACHE_CONTROL),
    );
    if let Some(value) = metadata
        .etag
        .as_deref()
        .and_then(|tag| HeaderValue::from_str(tag).ok())
    {
        headers.insert(header::ETAG, value);
    }
    Ok(response)
}
