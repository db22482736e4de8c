//! Media storage for the archive service.
//!
//! Uploaded images, video, audio and documents are written to an object
//! store and referenced from the database by key and public URL.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod config;
pub mod s3;

pub use config::StorageConfig;
pub use s3::S3MediaStore;

#[derive(Debug, thiserror::Error)]
pub enum MediaStoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("object not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, MediaStoreError>;

/// Object storage used for post media
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store an object and return its public URL
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String>;

    /// Remove an object
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// In-process store for development and tests
#[derive(Clone, Default)]
pub struct MemoryMediaStore {
    base_url: String,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl MemoryMediaStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Arc::default(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| MediaStoreError::NotFound(key.to_string()))
    }
}
