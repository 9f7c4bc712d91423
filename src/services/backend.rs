//! The object-storage collaborator behind the fetcher.
//!
//! `S3Backend` is the only production implementation; the trait is the seam
//! that lets tests run against an in-memory store.

use crate::models::metadata::ObjectMetadata;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, Stream, StreamExt};
use std::{fmt, io, time::Duration};
use thiserror::Error;

/// Failure reported by the storage backend, with the HTTP status it answered
/// with when there was one.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == Some(304)
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Preconditions forwarded verbatim on a GET.
#[derive(Clone, Debug, Default)]
pub struct GetConditions {
    pub if_none_match: Option<String>,
    pub range: Option<String>,
}

/// Streaming object payload.
pub struct ObjectBody(BoxStream<'static, io::Result<Bytes>>);

impl ObjectBody {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self(stream.boxed())
    }

    #[cfg(test)]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::from_stream(futures::stream::once(futures::future::ready(Ok(bytes.into()))))
    }

    pub fn into_stream(self) -> BoxStream<'static, io::Result<Bytes>> {
        self.0
    }

    #[cfg(test)]
    pub async fn collect_bytes(self) -> io::Result<Vec<u8>> {
        use futures::TryStreamExt;
        self.0
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
    }
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ObjectBody(..)")
    }
}

/// Successful GET: the body plus what the backend said about it.
#[derive(Debug)]
pub struct BackendObject {
    pub body: ObjectBody,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub content_range: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One key from a bucket enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedObject {
    pub key: String,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Read one object, honoring the forwarded preconditions.
    ///
    /// A satisfied `If-None-Match` surfaces as an error with status 304.
    async fn get_object(&self, key: &str, conditions: &GetConditions)
    -> BackendResult<BackendObject>;

    /// Metadata-only read.
    async fn head_object(&self, key: &str, if_none_match: Option<&str>)
    -> BackendResult<ObjectMetadata>;

    /// Enumerate every key in the bucket.
    async fn list_objects(&self) -> BackendResult<Vec<ListedObject>>;

    /// Presign a GET for `key`. Must not touch the object itself.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> BackendResult<String>;
}
