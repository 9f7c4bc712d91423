//! One row of the `/list` response.

use serde::Serialize;
use serde_json::{Map, Value};

/// A track reconstructed from its storage key.
///
/// `metadata` is present when enrichment succeeded; when the per-object HEAD
/// failed, `metadata_error` carries the reason and the entry is still listed.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    pub author: String,
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_error: Option<String>,
}

impl ListingEntry {
    pub fn new(author: String, title: String) -> Self {
        Self {
            author,
            title,
            metadata: None,
            metadata_error: None,
        }
    }
}
