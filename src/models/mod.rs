//! Data types shared by the fetcher and the HTTP handlers.
//!
//! Everything here is built per request and dropped with the response;
//! nothing is persisted.

pub mod listing;
pub mod metadata;
pub mod resource;
pub mod signed_url;
pub mod thumbnail;
