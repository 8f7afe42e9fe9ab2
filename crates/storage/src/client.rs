//! HTTP client for the storage resolution service.
//!
//! The service exposes a narrow contract: given a bucket-relative object
//! path it returns a directly fetchable URL, and it accepts binary
//! uploads that return the same kind of URL. Everything else about the
//! service is opaque to this crate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use serde::Deserialize;

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::resolver::encode_object_path;

/// HTTP request timeout for a single call to the service.
///
/// Deliberately above the resolver's own 15 s race so the resolver's
/// timeout is the one that fires.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upload body chunk size for progress reporting.
const UPLOAD_CHUNK_BYTES: usize = 256 * 1024;

/// Caller-owned progress callback: `(bytes_sent, bytes_total)`.
///
/// Passed explicitly into [`ObjectStore::upload_object`]; there is no
/// ambient progress state.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// The storage service contract.
///
/// Implemented over HTTP by [`StorageClient`]; tests substitute stub
/// implementations.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Resolve a bucket-relative object path to a directly fetchable URL.
    async fn resolve_download_url(&self, object_path: &str) -> Result<String, StorageError>;

    /// Upload binary content to an object path, returning its fetchable
    /// URL. Progress is reported through `progress` as chunks go out.
    async fn upload_object(
        &self,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        progress: Option<ProgressFn>,
    ) -> Result<String, StorageError>;
}

/// Response body of the resolution endpoint.
#[derive(Debug, Deserialize)]
struct ResolveResponse {
    url: String,
}

/// HTTP implementation of [`ObjectStore`].
pub struct StorageClient {
    client: reqwest::Client,
    api_url: String,
    bucket: String,
}

impl StorageClient {
    /// Create a client for the configured service endpoint.
    pub fn new(config: &StorageConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
        }
    }

    /// Endpoint for one object path.
    fn object_url(&self, object_path: &str) -> String {
        format!(
            "{}/v0/b/{}/o/{}",
            self.api_url,
            self.bucket,
            encode_object_path(object_path)
        )
    }
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn resolve_download_url(&self, object_path: &str) -> Result<String, StorageError> {
        let url = self.object_url(object_path);
        tracing::debug!(object_path, "Requesting download URL from storage service");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::from_status(status));
        }

        let body: ResolveResponse = response.json().await?;
        Ok(body.url)
    }

    async fn upload_object(
        &self,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        progress: Option<ProgressFn>,
    ) -> Result<String, StorageError> {
        let url = self.object_url(object_path);
        let total = bytes.len() as u64;
        tracing::debug!(object_path, total, "Uploading object to storage service");

        // Chunk the body so the caller's progress callback sees bytes as
        // they are handed to the transport.
        let chunks: Vec<Vec<u8>> = bytes
            .chunks(UPLOAD_CHUNK_BYTES)
            .map(|c| c.to_vec())
            .collect();
        let mut sent: u64 = 0;
        let body_stream = stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            if let Some(cb) = &progress {
                cb(sent, total);
            }
            Ok::<_, std::convert::Infallible>(chunk)
        });

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body_stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::from_status(status));
        }

        let body: ResolveResponse = response.json().await?;
        Ok(body.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_encodes_path_separators() {
        let config = StorageConfig {
            api_url: "http://localhost:9199/".into(),
            bucket: "evidence".into(),
            ..Default::default()
        };
        let client = StorageClient::new(&config);
        assert_eq!(
            client.object_url("evidencias/store-1/a.jpg"),
            "http://localhost:9199/v0/b/evidence/o/evidencias%2Fstore-1%2Fa.jpg"
        );
    }
}
