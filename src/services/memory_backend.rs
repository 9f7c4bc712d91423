//! In-memory `ObjectBackend` used by unit and router tests.
//!
//! Mimics the S3 behaviors the fetcher relies on: quoted MD5 ETags, 304 for a
//! satisfied `If-None-Match`, single byte ranges with `Content-Range`, 404
//! for unknown keys. Keys are listed in insertion order.

use crate::{
    models::metadata::ObjectMetadata,
    services::{
        backend::{
            BackendError, BackendObject, BackendResult, GetConditions, ListedObject,
            ObjectBackend, ObjectBody,
        },
        etag::if_none_match_matches,
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

#[derive(Clone)]
struct StoredObject {
    body: Bytes,
    etag: String,
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
    user: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct MemoryBackend {
    objects: Mutex<Vec<(String, StoredObject)>>,
    failing_heads: Mutex<HashSet<String>>,
    gets: AtomicUsize,
    heads: AtomicUsize,
    lists: AtomicUsize,
    presigns: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, body: &[u8], content_type: Option<&str>) {
        self.insert_with_metadata(key, body, content_type, &[]);
    }

    pub fn insert_with_metadata(
        &self,
        key: &str,
        body: &[u8],
        content_type: Option<&str>,
        user: &[(&str, &str)],
    ) {
        let stored = StoredObject {
            body: Bytes::copy_from_slice(body),
            etag: format!("\"{:x}\"", md5::compute(body)),
            content_type: content_type.map(str::to_string),
            last_modified: Utc::now(),
            user: user
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let mut objects = self.objects.lock().unwrap();
        objects.retain(|(existing, _)| existing != key);
        objects.push((key.to_string(), stored));
    }

    /// Make every HEAD of `key` fail with a 500.
    pub fn fail_head(&self, key: &str) {
        self.failing_heads.lock().unwrap().insert(key.to_string());
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn heads(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn presigns(&self) -> usize {
        self.presigns.load(Ordering::SeqCst)
    }

    fn lookup(&self, key: &str) -> BackendResult<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, obj)| obj.clone())
            .ok_or_else(|| BackendError::new(Some(404), "The specified key does not exist."))
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn get_object(
        &self,
        key: &str,
        conditions: &GetConditions,
    ) -> BackendResult<BackendObject> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let stored = self.lookup(key)?;

        if let Some(tag) = &conditions.if_none_match {
            if if_none_match_matches(tag, &stored.etag) {
                return Err(BackendError::new(Some(304), "Not Modified"));
            }
        }

        let total = stored.body.len() as u64;
        let (body, content_range) = match conditions.range.as_deref().and_then(parse_range) {
            Some(spec) => {
                let (start, end) = spec.resolve(total).ok_or_else(|| {
                    BackendError::new(Some(416), "The requested range is not satisfiable")
                })?;
                let slice = stored.body.slice(start as usize..=end as usize);
                (slice, Some(format!("bytes {}-{}/{}", start, end, total)))
            }
            None => (stored.body.clone(), None),
        };

        Ok(BackendObject {
            content_length: Some(body.len() as u64),
            body: ObjectBody::from_bytes(body),
            etag: Some(stored.etag),
            content_type: stored.content_type,
            content_range,
            last_modified: Some(stored.last_modified),
        })
    }

    async fn head_object(
        &self,
        key: &str,
        if_none_match: Option<&str>,
    ) -> BackendResult<ObjectMetadata> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        if self.failing_heads.lock().unwrap().contains(key) {
            return Err(BackendError::new(Some(500), "We encountered an internal error."));
        }
        let stored = self.lookup(key)?;
        if let Some(tag) = if_none_match {
            if if_none_match_matches(tag, &stored.etag) {
                return Err(BackendError::new(Some(304), "Not Modified"));
            }
        }

        Ok(ObjectMetadata {
            etag: Some(stored.etag),
            content_type: stored.content_type,
            content_length: Some(stored.body.len() as u64),
            last_modified: Some(stored.last_modified),
            user: stored.user,
        })
    }

    async fn list_objects(&self) -> BackendResult<Vec<ListedObject>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, obj)| ListedObject {
                key: key.clone(),
                etag: Some(obj.etag.clone()),
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> BackendResult<String> {
        self.presigns.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "https://storage.test/bucket/{}?X-Amz-Expires={}",
            key,
            expires_in.as_secs()
        ))
    }
}

enum RangeSpec {
    From(u64, Option<u64>),
    Suffix(u64),
}

impl RangeSpec {
    /// Inclusive byte bounds within an object of `total` bytes.
    fn resolve(&self, total: u64) -> Option<(u64, u64)> {
        match *self {
            RangeSpec::From(start, _) if start >= total => None,
            RangeSpec::From(start, end) => {
                let end = end.map_or(total - 1, |end| end.min(total - 1));
                (start <= end).then_some((start, end))
            }
            RangeSpec::Suffix(0) => None,
            RangeSpec::Suffix(_) if total == 0 => None,
            RangeSpec::Suffix(len) => Some((total.saturating_sub(len), total - 1)),
        }
    }
}

/// Single-range `bytes=` header; anything else is ignored, like S3 does.
fn parse_range(header: &str) -> Option<RangeSpec> {
    let spec = header.trim().strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }
    let (start, end) = spec.split_once('-')?;
    match (start.trim(), end.trim()) {
        ("", "") => None,
        ("", suffix) => suffix.parse().ok().map(RangeSpec::Suffix),
        (start, "") => start.parse().ok().map(|s| RangeSpec::From(s, None)),
        (start, end) => Some(RangeSpec::From(start.parse().ok()?, Some(end.parse().ok()?))),
    }
}
