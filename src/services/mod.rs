pub mod backend;
pub mod etag;
pub mod fetcher;
#[cfg(test)]
pub mod memory_backend;
pub mod s3_backend;
