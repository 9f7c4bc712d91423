//! Presigned download grants.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Validity of every presigned URL this service hands out (7 days, the S3 maximum).
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A time-boxed URL that lets the client read one object directly from storage.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlGrant {
    pub url: String,

    /// Validity in seconds.
    pub expires_in: u64,

    pub expires_at: DateTime<Utc>,
}

impl SignedUrlGrant {
    pub fn new(url: String, ttl: Duration, issued_at: DateTime<Utc>) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .unwrap_or(issued_at);
        Self {
            url,
            expires_in: ttl.as_secs(),
            expires_at,
        }
    }
}
