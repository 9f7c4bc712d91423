//! Defines routes for the music endpoints.
//!
//! ## Structure
//! - `GET /music?artist=&title=`  stream audio (ETag / Range aware)
//! - `GET /signed-url?artist=&title=`  302 to a presigned download URL
//! - `GET /thumbnail?author=&title=`  decoded thumbnail descriptor
//! - `GET /thumbnail/image?author=&title=`  stream the cover image
//! - `GET /list`  every track, optionally with metadata
//! - `GET /healthz`  liveness
//!
//! Every route answers CORS preflight (`OPTIONS`) with 200 and the same header set.

use crate::{
    handlers::{
        catalog_handlers::{get_thumbnail, list_tracks},
        health_handlers::healthz,
        music_handlers::{get_music, get_signed_url, get_thumbnail_image},
    },
    services::fetcher::ConditionalObjectFetcher,
};
use axum::{
    Router,
    http::{Method, header},
    routing::get,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

/// Build and return the router for all endpoints.
///
/// The router carries the fetcher as shared state; CORS and request tracing
/// wrap every route.
pub fn routes() -> Router<ConditionalObjectFetcher> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/music", get(get_music))
        .route("/signed-url", get(get_signed_url))
        .route("/thumbnail", get(get_thumbnail))
        .route("/thumbnail/image", get(get_thumbnail_image))
        .route("/list", get(list_tracks))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(AllowMethods::list([Method::GET, Method::OPTIONS]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::IF_NONE_MATCH,
            header::RANGE,
        ]))
        .expose_headers(ExposeHeaders::list([
            header::ETAG,
            header::CONTENT_RANGE,
            header::CONTENT_LENGTH,
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{fetcher::FetcherOptions, memory_backend::MemoryBackend};
    use axum::{
        body::Body,
        http::{Request, Response, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt; // for oneshot

    fn app(backend: Arc<MemoryBackend>) -> Router {
        routes().with_state(ConditionalObjectFetcher::new(
            backend,
            FetcherOptions::default(),
        ))
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: Response<Body>) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn seeded() -> Arc<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_with_metadata(
            "IU/Palette.webm",
            b"0123456789",
            Some("audio/webm"),
            &[
                ("emotion-score", "42"),
                ("mood", "calm"),
                (
                    "thumbnail",
                    "=?utf-8?Q?{\"url\":\"https://img.test/IU_palette.webp\"}?=",
                ),
            ],
        );
        backend.insert("IU/Palette.webp", b"RIFF....WEBP", Some("image/webp"));
        backend
    }

    #[tokio::test]
    async fn music_streams_full_body_with_caching_headers() {
        let response = app(seeded())
            .oneshot(get_req("/music?artist=IU&title=Palette"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "audio/webm");
        assert_eq!(headers[header::CONTENT_LENGTH], "10");
        assert_eq!(
            headers[header::CACHE_CONTROL],
            "public, max-age=2592000, immutable"
        );
        assert!(headers.contains_key(header::ETAG));
        assert!(headers.contains_key(header::LAST_MODIFIED));
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_bytes(response).await, b"0123456789");
    }

    #[tokio::test]
    async fn music_answers_304_for_current_etag() {
        let backend = seeded();
        let first = app(backend.clone())
            .oneshot(get_req("/music?artist=IU&title=Palette"))
            .await
            .unwrap();
        let etag = first.headers()[header::ETAG].clone();

        let second = app(backend)
            .oneshot(
                Request::builder()
                    .uri("/music?artist=IU&title=Palette")
                    .header(header::IF_NONE_MATCH, etag.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(second.headers()[header::ETAG], etag);
        assert!(body_bytes(second).await.is_empty());
    }

    #[tokio::test]
    async fn music_serves_ranges() {
        let response = app(seeded())
            .oneshot(
                Request::builder()
                    .uri("/music?artist=IU&title=Palette")
                    .header(header::RANGE, "bytes=0-3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-3/10");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
        assert_eq!(body_bytes(response).await, b"0123");
    }

    #[tokio::test]
    async fn music_missing_title_is_400_echoing_params() {
        let backend = seeded();
        let response = app(backend.clone())
            .oneshot(get_req("/music?artist=IU"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["artist"], json!("IU"));
        assert_eq!(body["title"], Value::Null);
        assert!(body["error"].is_string());
        assert_eq!(backend.gets(), 0);
    }

    #[tokio::test]
    async fn music_rejects_traversal_before_reaching_storage() {
        let backend = seeded();
        let response = app(backend.clone())
            .oneshot(get_req("/music?artist=..&title=secret"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(backend.gets(), 0);
    }

    #[tokio::test]
    async fn music_not_found_passes_backend_error_through() {
        let response = app(seeded())
            .oneshot(get_req("/music?artist=IU&title=Missing"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"error": "The specified key does not exist."})
        );
    }

    #[tokio::test]
    async fn thumbnail_returns_decoded_descriptor() {
        let backend = seeded();
        let response = app(backend.clone())
            .oneshot(get_req("/thumbnail?author=IU&title=Palette"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=3600, immutable"
        );
        let etag = response.headers()[header::ETAG].clone();
        assert_eq!(
            body_json(response).await,
            json!({"url": "https://img.test/IUpalette.webp"})
        );

        let cached = app(backend)
            .oneshot(
                Request::builder()
                    .uri("/thumbnail?author=IU&title=Palette")
                    .header(header::IF_NONE_MATCH, etag.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(cached.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(cached.headers()[header::ETAG], etag);
    }

    #[tokio::test]
    async fn thumbnail_without_descriptor_is_null() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("A/B.webm", b"x", None);
        let response = app(backend)
            .oneshot(get_req("/thumbnail?author=A&title=B"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, Value::Null);
    }

    #[tokio::test]
    async fn thumbnail_image_streams_webp() {
        let response = app(seeded())
            .oneshot(get_req("/thumbnail/image?author=IU&title=Palette"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/webp");
        assert_eq!(body_bytes(response).await, b"RIFF....WEBP");
    }

    #[tokio::test]
    async fn list_returns_enriched_entries_and_honors_etag() {
        let backend = seeded();
        backend.insert("AKMU/Dinosaur.webm", b"abc", None);

        let response = app(backend.clone())
            .oneshot(get_req("/list"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let etag = response.headers()[header::ETAG].clone();
        assert_eq!(
            body_json(response).await,
            json!([
                {"author": "AKMU", "title": "Dinosaur", "metadata": {}},
                {
                    "author": "IU",
                    "title": "Palette",
                    "metadata": {"emotionScore": 42, "mood": "calm"}
                }
            ])
        );

        let cached = app(backend)
            .oneshot(
                Request::builder()
                    .uri("/list")
                    .header(header::IF_NONE_MATCH, "*")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(cached.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(cached.headers()[header::ETAG], etag);
    }

    #[tokio::test]
    async fn every_listed_track_can_be_fetched() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("Epik High/Wait....webm", b"trailing dots", None);
        backend.insert("Mr. Big/So Long...webm", b"two dots", None);

        let listing = app(backend.clone())
            .oneshot(get_req("/list"))
            .await
            .unwrap();
        assert_eq!(listing.status(), StatusCode::OK);
        let entries = body_json(listing).await;
        let entries = entries.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["title"], json!("Wait..."));
        assert_eq!(entries[1]["title"], json!("So Long.."));

        for entry in entries {
            let uri = format!(
                "/music?artist={}&title={}",
                entry["author"].as_str().unwrap().replace(' ', "%20"),
                entry["title"].as_str().unwrap().replace(' ', "%20"),
            );
            let response = app(backend.clone()).oneshot(get_req(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn signed_url_redirects_without_reading() {
        let backend = seeded();
        let response = app(backend.clone())
            .oneshot(get_req("/signed-url?artist=IU&title=Palette"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.contains("IU/Palette.webm"));
        assert!(location.contains("X-Amz-Expires=604800"));
        assert_eq!(backend.gets() + backend.heads(), 0);
    }

    #[tokio::test]
    async fn signed_url_as_json() {
        let response = app(seeded())
            .oneshot(
                Request::builder()
                    .uri("/signed-url?artist=IU&title=Palette")
                    .header(header::ACCEPT, "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["expiresIn"], json!(604800));
        assert!(body["url"].as_str().unwrap().contains("IU/Palette.webm"));
        assert!(body["expiresAt"].is_string());
    }

    #[tokio::test]
    async fn preflight_gets_cors_headers_on_every_route() {
        for uri in ["/music", "/list", "/thumbnail", "/thumbnail/image", "/signed-url"] {
            let response = app(seeded())
                .oneshot(
                    Request::builder()
                        .method(Method::OPTIONS)
                        .uri(uri)
                        .header(header::ORIGIN, "https://player.test")
                        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let headers = response.headers();
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
            let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
            assert!(methods.contains("GET") && methods.contains("OPTIONS"));
            let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
                .to_str()
                .unwrap()
                .to_ascii_lowercase();
            assert!(allowed.contains("content-type"));
            assert!(allowed.contains("if-none-match"));
            assert!(body_bytes(response).await.is_empty());
        }
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let response = app(Arc::new(MemoryBackend::new()))
            .oneshot(get_req("/healthz"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }
}
