//! HTTP handlers that serve object bodies (audio, cover images) and presigned
//! download links.
//! Bodies are streamed from the backend as they arrive; nothing is buffered.

use crate::{
    errors::AppError,
    handlers::{header_str, not_modified, params::track_key, single_validator},
    models::{
        resource::{ResourceKey, ResourceKind},
        signed_url::SIGNED_URL_TTL,
    },
    services::fetcher::{ConditionalObjectFetcher, FetchOutcome},
};
use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

/// Audio never changes under the same key; let clients keep it for a month.
const AUDIO_CACHE_CONTROL: &str = "public, max-age=2592000, immutable";
const IMAGE_CACHE_CONTROL: &str = "public, max-age=3600, immutable";

/// `GET /music?artist=&title=`: stream `<artist>/<title>.webm`.
///
/// Honors `If-None-Match` (304) and `Range` (206).
pub async fn get_music(
    State(fetcher): State<ConditionalObjectFetcher>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let key = track_key(&query, ResourceKind::Audio, "artist")?;
    stream_object(&fetcher, &key, &headers, ResourceKind::Audio, AUDIO_CACHE_CONTROL).await
}

/// `GET /thumbnail/image?author=&title=`: stream `<author>/<title>.webp`.
pub async fn get_thumbnail_image(
    State(fetcher): State<ConditionalObjectFetcher>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let key = track_key(&query, ResourceKind::ThumbnailImage, "author")?;
    stream_object(
        &fetcher,
        &key,
        &headers,
        ResourceKind::ThumbnailImage,
        IMAGE_CACHE_CONTROL,
    )
    .await
}

/// `GET /signed-url?artist=&title=`: redirect (302) to a 7-day presigned URL.
///
/// Clients sending `Accept: application/json` get the grant itself instead.
pub async fn get_signed_url(
    State(fetcher): State<ConditionalObjectFetcher>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let key = track_key(&query, ResourceKind::Audio, "artist")?;
    let grant = fetcher.sign(&key, SIGNED_URL_TTL).await?;

    let wants_json = header_str(&headers, header::ACCEPT)
        .is_some_and(|accept| accept.contains("application/json"));
    if wants_json {
        return Ok(Json(grant).into_response());
    }

    let location = HeaderValue::from_str(&grant.url)
        .map_err(|_| AppError::internal("presigned URL is not a valid Location header"))?;
    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, location),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
    )
        .into_response())
}

/// Fetch `key` under the request's validator and range, and map the outcome
/// onto a 200 / 206 / 304 response or a JSON error.
async fn stream_object(
    fetcher: &ConditionalObjectFetcher,
    key: &ResourceKey,
    headers: &HeaderMap,
    kind: ResourceKind,
    cache_control: &'static str,
) -> Result<Response, AppError> {
    let validator = header_str(headers, header::IF_NONE_MATCH);
    let outcome = fetcher
        .fetch(key, validator, header_str(headers, header::RANGE))
        .await;

    match outcome {
        FetchOutcome::Full {
            body,
            etag,
            content_type,
            content_length,
            last_modified,
        } => {
            let mut response = Response::new(Body::from_stream(body.into_stream()));
            *response.status_mut() = StatusCode::OK;
            let headers = response.headers_mut();
            set_object_headers(
                headers,
                content_type.as_deref().unwrap_or(kind.default_content_type()),
                content_length,
                etag.as_deref(),
                cache_control,
            );
            if let Some(value) = last_modified.and_then(http_date) {
                headers.insert(header::LAST_MODIFIED, value);
            }
            Ok(response)
        }
        FetchOutcome::Partial {
            body,
            etag,
            content_type,
            content_range,
            content_length,
        } => {
            let mut response = Response::new(Body::from_stream(body.into_stream()));
            *response.status_mut() = StatusCode::PARTIAL_CONTENT;
            let headers = response.headers_mut();
            set_object_headers(
                headers,
                content_type.as_deref().unwrap_or(kind.default_content_type()),
                content_length,
                etag.as_deref(),
                cache_control,
            );
            if let Ok(value) = HeaderValue::from_str(&content_range) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            Ok(response)
        }
        FetchOutcome::NotModified => Ok(not_modified(single_validator(validator))),
        FetchOutcome::BackendError(err) => Err(err.into()),
    }
}

fn set_object_headers(
    headers: &mut HeaderMap,
    content_type: &str,
    content_length: Option<u64>,
    etag: Option<&str>,
    cache_control: &'static str,
) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if let Some(length) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    if let Some(value) = etag.and_then(|tag| HeaderValue::from_str(tag).ok()) {
        headers.insert(header::ETAG, value);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
fn http_date(time: DateTime<Utc>) -> Option<HeaderValue> {
    HeaderValue::from_str(&time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()).ok()
}
