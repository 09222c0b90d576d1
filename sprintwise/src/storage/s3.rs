use super::{ObjectStore, public_url};
use crate::config::StorageConfig;
use crate::errors::{Error, Result};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{Client, config::Region, error::DisplayErrorContext, primitives::ByteStream};
use std::path::Path;
use tracing::{debug, info, instrument};

/// S3 storage backend.
///
/// Credentials come from the standard AWS provider chain (environment, profile, instance role).
pub struct S3ObjectStore {
    client: Client,
    config: StorageConfig,
}

impl S3ObjectStore {
    /// Build a client for the configured region (and custom endpoint, if any).
    ///
    /// No request is made here, so this succeeds even when the bucket is unset.
    pub async fn new(config: StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // Custom endpoints are addressed path-style
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint_url.is_some())
            .build();

        Self::with_client(Client::from_conf(s3_config), config)
    }

    /// Use an already configured client, e.g. one with explicit credentials.
    pub fn with_client(client: Client, config: StorageConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, local_path), err)]
    async fn store(&self, local_path: &Path, content_type: &str, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(Error::BadRequest {
                message: "Storage key cannot be empty".to_string(),
            });
        }
        let bucket = self.config.require_bucket()?;

        let body = ByteStream::from_path(local_path)
            .await
            .with_context(|| format!("Failed to read {} for upload", local_path.display()))?;

        debug!(bucket, key, "Uploading object");
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to upload {key} to bucket {bucket}: {}", DisplayErrorContext(e)))?;

        let url = public_url(&self.config, bucket, key);
        info!(key, url = %url, "Stored object");
        Ok(url)
    }
}
