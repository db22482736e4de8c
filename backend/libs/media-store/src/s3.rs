use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::{MediaStore, MediaStoreError, Result};

/// Media store backed by an S3 bucket
#[derive(Clone)]
pub struct S3MediaStore {
    client: Arc<Client>,
    config: StorageConfig,
}

impl S3MediaStore {
    /// Build the client from the default AWS credential chain
    pub async fn new(config: StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = config.custom_endpoint() {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        // Custom endpoints (MinIO and friends) only speak path-style addressing.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.custom_endpoint().is_some())
            .build();

        Self {
            client: Arc::new(Client::from_conf(s3_config)),
            config,
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String> {
        let key = self.config.prefixed_key(key);
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| MediaStoreError::Backend(e.to_string()))?;

        tracing::debug!(key = %key, size, "object uploaded");
        Ok(self.config.public_url(&key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = self.config.prefixed_key(key);

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| MediaStoreError::Backend(e.to_string()))?;

        tracing::debug!(key = %key, "object deleted");
        Ok(())
    }
}
