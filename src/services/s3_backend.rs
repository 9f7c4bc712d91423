//! S3-compatible backend (AWS S3, Cloudflare R2, MinIO) on `aws-sdk-s3`.

use crate::{
    config::AppConfig,
    models::metadata::ObjectMetadata,
    services::backend::{
        BackendError, BackendObject, BackendResult, GetConditions, ListedObject, ObjectBackend,
        ObjectBody,
    },
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    Client,
    config::{Builder as S3ConfigBuilder, Credentials},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    presigning::PresigningConfig,
    primitives::DateTime as AwsDateTime,
};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};

pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    /// Build the client once at startup from explicit credentials and endpoint.
    pub async fn connect(cfg: &AppConfig) -> Self {
        let credentials = Credentials::new(
            &cfg.access_key,
            &cfg.secret_key,
            None,
            None,
            "environment",
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint_url)
            .force_path_style(cfg.force_path_style)
            .build();

        debug!(
            "Created S3 client for bucket '{}' at {} (region {})",
            cfg.bucket_name, cfg.endpoint_url, cfg.region
        );

        Self {
            client: Client::from_conf(s3_config),
            bucket: cfg.bucket_name.clone(),
        }
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    #[instrument(skip(self, conditions), fields(bucket = %self.bucket))]
    async fn get_object(
        &self,
        key: &str,
        conditions: &GetConditions,
    ) -> BackendResult<BackendObject> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_if_none_match(conditions.if_none_match.clone())
            .set_range(conditions.range.clone())
            .send()
            .await
            .map_err(backend_error)?;

        debug!(
            content_length = ?output.content_length,
            content_range = ?output.content_range,
            "object read started"
        );

        Ok(BackendObject {
            etag: output.e_tag,
            content_type: output.content_type,
            content_length: output.content_length.and_then(|len| u64::try_from(len).ok()),
            content_range: output.content_range,
            last_modified: output.last_modified.as_ref().and_then(to_chrono),
            body: ObjectBody::from_stream(ReaderStream::new(output.body.into_async_read())),
        })
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn head_object(
        &self,
        key: &str,
        if_none_match: Option<&str>,
    ) -> BackendResult<ObjectMetadata> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .set_if_none_match(if_none_match.map(str::to_string))
            .send()
            .await
            .map_err(backend_error)?;

        Ok(ObjectMetadata {
            etag: output.e_tag,
            content_type: output.content_type,
            content_length: output.content_length.and_then(|len| u64::try_from(len).ok()),
            last_modified: output.last_modified.as_ref().and_then(to_chrono),
            user: output.metadata.unwrap_or_default().into_iter().collect(),
        })
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list_objects(&self) -> BackendResult<Vec<ListedObject>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(backend_error)?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                objects.push(ListedObject {
                    key: key.to_string(),
                    etag: object.e_tag().map(str::to_string),
                    last_modified: object.last_modified().and_then(to_chrono),
                });
            }
        }

        debug!("Listed {} objects", objects.len());
        Ok(objects)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn presign_get(&self, key: &str, expires_in: Duration) -> BackendResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|err| BackendError::new(None, err.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(backend_error)?;

        Ok(request.uri().to_string())
    }
}

/// Keep the HTTP status the service answered with; transport failures have none.
///
/// HEAD errors carry no body, so the error code stands in for the message.
fn backend_error<E>(err: SdkError<E>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|raw| raw.status().as_u16());
    let message = err
        .message()
        .or_else(|| err.code())
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    BackendError::new(status, message)
}

fn to_chrono(value: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}
