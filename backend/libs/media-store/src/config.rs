//! Storage configuration for the media bucket

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Public base URL objects are served from (bucket website or CDN)
    pub base_url: String,
    /// Key prefix for every object written by the archive
    #[serde(default)]
    pub prefix: String,
    /// Custom endpoint for S3-compatible storage (MinIO, R2, ...)
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl StorageConfig {
    /// Public URL for an object key
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key.trim_start_matches('/'))
    }

    /// Endpoint override, if one is actually set; `STORAGE__ENDPOINT=` yields `Some("")`
    pub fn custom_endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// Apply the configured prefix to a relative key
    pub fn prefixed_key(&self, key: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", prefix, key)
        }
    }
}
