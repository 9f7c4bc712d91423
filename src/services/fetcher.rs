//! ConditionalObjectFetcher: the single entry point handlers use to reach
//! storage.
//!
//! Each operation issues the minimum number of backend requests (one read,
//! one HEAD, one enumeration plus optional per-entry HEADs, or a local
//! signature) and folds every backend outcome into a typed value. Backend
//! failures never escape as errors the HTTP layer has to interpret; they come
//! back as `FetchError` with the backend's status and message.

use crate::{
    models::{
        listing::ListingEntry,
        metadata::ObjectMetadata,
        resource::{ResourceKey, ResourceKind},
        signed_url::SignedUrlGrant,
    },
    services::{
        backend::{BackendError, GetConditions, ListedObject, ObjectBackend, ObjectBody},
        etag::{if_none_match_matches, listing_etag},
    },
};
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Normalized backend failure handed to the HTTP layer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message} (status {status})")]
pub struct FetchError {
    pub status: u16,
    pub message: String,
}

impl From<BackendError> for FetchError {
    fn from(err: BackendError) -> Self {
        Self {
            status: err.status.unwrap_or(500),
            message: err.message,
        }
    }
}

/// Result of a conditional object read.
#[derive(Debug)]
pub enum FetchOutcome {
    Full {
        body: ObjectBody,
        etag: Option<String>,
        content_type: Option<String>,
        content_length: Option<u64>,
        last_modified: Option<DateTime<Utc>>,
    },
    Partial {
        body: ObjectBody,
        etag: Option<String>,
        content_type: Option<String>,
        content_range: String,
        content_length: Option<u64>,
    },
    NotModified,
    BackendError(FetchError),
}

/// Result of a metadata-only read.
#[derive(Debug)]
pub enum HeadOutcome {
    Found(ObjectMetadata),
    NotModified,
    BackendError(FetchError),
}

/// Result of a bucket listing.
#[derive(Debug)]
pub enum ListOutcome {
    Entries {
        entries: Vec<ListingEntry>,
        etag: String,
    },
    /// The validator still matches; `etag` is the current listing tag.
    NotModified { etag: String },
    BackendError(FetchError),
}

#[derive(Clone, Debug)]
pub struct FetcherOptions {
    /// Maximum number of HEAD requests in flight while enriching a listing.
    pub listing_concurrency: usize,

    /// Attach per-object metadata to listing entries.
    pub enrich_listing: bool,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            listing_concurrency: 8,
            enrich_listing: true,
        }
    }
}

/// Stateless facade over one `ObjectBackend`; cheap to clone into handlers.
#[derive(Clone)]
pub struct ConditionalObjectFetcher {
    backend: Arc<dyn ObjectBackend>,
    options: FetcherOptions,
}

impl fmt::Debug for ConditionalObjectFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalObjectFetcher")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ConditionalObjectFetcher {
    pub fn new(backend: Arc<dyn ObjectBackend>, options: FetcherOptions) -> Self {
        Self { backend, options }
    }

    /// Read one object, forwarding `validator` as `If-None-Match` and `range`
    /// as `Range` exactly as received.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn fetch(
        &self,
        key: &ResourceKey,
        validator: Option<&str>,
        range: Option<&str>,
    ) -> FetchOutcome {
        let conditions = GetConditions {
            if_none_match: validator.map(str::to_string),
            range: range.map(str::to_string),
        };

        match self.backend.get_object(key.as_str(), &conditions).await {
            Ok(object) => match (range, object.content_range) {
                (Some(_), Some(content_range)) => FetchOutcome::Partial {
                    body: object.body,
                    etag: object.etag,
                    content_type: object.content_type,
                    content_range,
                    content_length: object.content_length,
                },
                _ => FetchOutcome::Full {
                    body: object.body,
                    etag: object.etag,
                    content_type: object.content_type,
                    content_length: object.content_length,
                    last_modified: object.last_modified,
                },
            },
            Err(err) if err.is_not_modified() => {
                debug!("validator matched, not modified");
                FetchOutcome::NotModified
            }
            Err(err) => {
                debug!(status = ?err.status, "backend read failed: {}", err.message);
                FetchOutcome::BackendError(err.into())
            }
        }
    }

    /// Metadata-only read of one object.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn head_metadata(&self, key: &ResourceKey, validator: Option<&str>) -> HeadOutcome {
        self.head_raw(key.as_str(), validator).await
    }

    async fn head_raw(&self, key: &str, validator: Option<&str>) -> HeadOutcome {
        match self.backend.head_object(key, validator).await {
            Ok(metadata) => HeadOutcome::Found(metadata),
            Err(err) if err.is_not_modified() => HeadOutcome::NotModified,
            Err(err) => HeadOutcome::BackendError(err.into()),
        }
    }

    /// Enumerate every `<author>/<title>.webm` object, sorted by author then
    /// title, optionally enriched with normalized metadata.
    ///
    /// The listing tag is checked before enrichment, so a matching validator
    /// costs a single enumeration.
    #[instrument(skip(self))]
    pub async fn list(&self, validator: Option<&str>) -> ListOutcome {
        let listed = match self.backend.list_objects().await {
            Ok(listed) => listed,
            Err(err) => {
                warn!(status = ?err.status, "listing failed: {}", err.message);
                return ListOutcome::BackendError(err.into());
            }
        };

        let mut tracks: Vec<(ListedObject, String, String)> = listed
            .into_iter()
            .filter_map(|obj| {
                let (author, title) = ResourceKey::parse(ResourceKind::Audio, &obj.key)?;
                Some((obj, author, title))
            })
            .collect();
        tracks.sort_by(|a, b| (&a.1, &a.2).cmp(&(&b.1, &b.2)));

        let etag = listing_etag(tracks.iter().map(|(obj, _, _)| obj));
        if validator.is_some_and(|v| if_none_match_matches(v, &etag)) {
            return ListOutcome::NotModified { etag };
        }

        let entries: Vec<ListingEntry> = if self.options.enrich_listing {
            stream::iter(tracks)
                .map(|(obj, author, title)| self.enrich(obj.key, author, title))
                .buffered(self.options.listing_concurrency.max(1))
                .collect()
                .await
        } else {
            tracks
                .into_iter()
                .map(|(_, author, title)| ListingEntry::new(author, title))
                .collect()
        };

        debug!("listed {} tracks", entries.len());
        ListOutcome::Entries { entries, etag }
    }

    /// One HEAD per entry; a failure degrades only this entry.
    async fn enrich(&self, key: String, author: String, title: String) -> ListingEntry {
        let mut entry = ListingEntry::new(author, title);
        match self.head_raw(&key, None).await {
            HeadOutcome::Found(metadata) => {
                entry.metadata = Some(metadata.normalized_fields());
            }
            HeadOutcome::NotModified => {}
            HeadOutcome::BackendError(err) => {
                warn!(key = %key, status = err.status, "metadata enrichment failed: {}", err.message);
                entry.metadata_error = Some(err.message);
            }
        }
        entry
    }

    /// Presign a direct download. No existence check: an unknown key yields a
    /// URL that answers 404 when followed.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn sign(&self, key: &ResourceKey, ttl: Duration) -> Result<SignedUrlGrant, FetchError> {
        let url = self.backend.presign_get(key.as_str(), ttl).await?;
        Ok(SignedUrlGrant::new(url, ttl, Utc::now()))
    }
}
