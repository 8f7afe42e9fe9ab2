//! Evidence reference resolution.
//!
//! [`EvidenceResolver::resolve`] turns whatever string is stored on a
//! photo request into a directly fetchable URL:
//!
//! 1. direct storage-service links get a fresh cache-busting parameter;
//! 2. other direct links pass through untouched;
//! 3. everything else is normalized to a bare object path and resolved
//!    through the storage service, racing a fixed timeout;
//! 4. on failure, a known evidence-folder path is turned into a
//!    hand-synthesized download URL as a last resort.
//!
//! Resolution never surfaces an error to the caller: the return value is
//! `Some(url)` or `None` (reference is broken for this attempt).

use std::sync::Arc;

use chrono::Utc;
use shelfvision_core::reference::{
    is_directly_fetchable, is_storage_service_url, log_storage_link_diagnostics, BUCKET_SCHEME,
};

use crate::client::ObjectStore;
use crate::config::StorageConfig;
use crate::error::StorageError;

/// Folder prefix under which evidence photos are stored.
const EVIDENCE_FOLDER: &str = "evidencias/";

/// Query parameter appended to defeat client-side caching.
const CACHE_BUSTER_PARAM: &str = "_t";

/// Resolves evidence references against the storage service.
pub struct EvidenceResolver {
    store: Arc<dyn ObjectStore>,
    config: StorageConfig,
}

impl EvidenceResolver {
    /// Create a resolver over the given store and configuration.
    pub fn new(store: Arc<dyn ObjectStore>, config: StorageConfig) -> Self {
        Self { store, config }
    }

    /// The configuration this resolver operates with.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Resolve a stored reference to a directly fetchable URL.
    ///
    /// Returns `None` only when every stage, including the last-resort
    /// synthesis, is inapplicable; the caller must then treat the
    /// reference as broken for this attempt.
    pub async fn resolve(&self, reference: &str) -> Option<String> {
        if is_directly_fetchable(reference) {
            if is_storage_service_url(reference, &self.config.storage_host) {
                log_storage_link_diagnostics(reference);
                let url = append_cache_buster(reference, Utc::now().timestamp_millis());
                tracing::debug!(reference, "Refreshed cache buster on direct storage link");
                return Some(url);
            }
            // Direct link to some other host: usable as-is.
            return Some(reference.to_string());
        }

        // Storage path, or malformed input resolved as a best effort.
        let path = normalize_object_path(reference);
        tracing::debug!(reference, path = %path, "Resolving storage path");

        let outcome = match tokio::time::timeout(
            self.config.resolve_timeout,
            self.store.resolve_download_url(&path),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StorageError::TimedOut),
        };

        match outcome {
            Ok(url) => {
                let url = append_cache_buster(&url, Utc::now().timestamp_millis());
                tracing::debug!(path = %path, "Storage path resolved");
                Some(url)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path,
                    class = e.class(),
                    error = %e,
                    "Storage resolution failed"
                );
                if path.starts_with(EVIDENCE_FOLDER) {
                    let url = self.synthesize_download_url(&path);
                    tracing::info!(path = %path, "Falling back to synthesized download URL");
                    Some(url)
                } else {
                    tracing::warn!(reference, "Reference is unresolvable");
                    None
                }
            }
        }
    }

    /// Hand-build a download URL for a known evidence-folder path.
    ///
    /// Derives the project identifier from the configured public host and
    /// returns the constructed URL on faith -- it is not probed.
    fn synthesize_download_url(&self, object_path: &str) -> String {
        format!(
            "https://{}/v0/b/{}.appspot.com/o/{}?alt=media",
            self.config.storage_host,
            self.config.project_id(),
            encode_object_path(object_path)
        )
    }
}

/// Normalize a raw reference to a bare bucket-relative object path.
///
/// Strips a `gs://<bucket>/` prefix, leading path separators, and any
/// trailing query string.
pub fn normalize_object_path(reference: &str) -> String {
    let mut path = reference;

    if let Some(rest) = path.strip_prefix(BUCKET_SCHEME) {
        // Drop the bucket segment; what follows is the object path.
        path = rest.split_once('/').map(|(_, p)| p).unwrap_or("");
    }

    let path = path.trim_start_matches('/');
    let path = path.split('?').next().unwrap_or(path);
    path.to_string()
}

/// Append a current-time cache-busting parameter to a URL.
///
/// Not idempotent by design: each call appends another parameter, which
/// is exactly what defeats a stale browser cache.
pub fn append_cache_buster(url: &str, epoch_millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{CACHE_BUSTER_PARAM}={epoch_millis}")
}

/// Percent-encode an object path for use as a single URL path segment.
///
/// Everything outside the unreserved set is encoded, including `/`, which
/// the storage service expects as `%2F` inside object names.
pub fn encode_object_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            other => {
                encoded.push_str(&format!("%{other:02X}"));
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::client::ProgressFn;

    /// Stub store with a scriptable outcome and optional delay.
    struct StubStore {
        delay: Option<Duration>,
        outcome: Box<dyn Fn(&str) -> Result<String, StorageError> + Send + Sync>,
        calls: Mutex<Vec<String>>,
    }

    impl StubStore {
        fn ok(url: &'static str) -> Self {
            Self {
                delay: None,
                outcome: Box::new(move |_| Ok(url.to_string())),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(make: fn() -> StorageError) -> Self {
            Self {
                delay: None,
                outcome: Box::new(move |_| Err(make())),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn slow(delay: Duration, url: &'static str) -> Self {
            Self {
                delay: Some(delay),
                outcome: Box::new(move |_| Ok(url.to_string())),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ObjectStore for StubStore {
        async fn resolve_download_url(&self, object_path: &str) -> Result<String, StorageError> {
            self.calls.lock().unwrap().push(object_path.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.outcome)(object_path)
        }

        async fn upload_object(
            &self,
            _object_path: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
            _progress: Option<ProgressFn>,
        ) -> Result<String, StorageError> {
            Err(StorageError::Unexpected("upload not supported in stub".into()))
        }
    }

    fn test_config() -> StorageConfig {
        StorageConfig {
            storage_host: "storage.example".into(),
            bucket: "my-bucket".into(),
            public_host: "vision.example.app".into(),
            resolve_timeout: Duration::from_secs(15),
            ..Default::default()
        }
    }

    fn resolver_with(store: StubStore) -> (EvidenceResolver, Arc<StubStore>) {
        let store = Arc::new(store);
        let resolver = EvidenceResolver::new(store.clone(), test_config());
        (resolver, store)
    }

    // ---- pure helpers ----

    #[test]
    fn normalize_strips_bucket_prefix_and_query() {
        assert_eq!(
            normalize_object_path("gs://my-bucket/evidencias/a/b.jpg?ignored=1"),
            "evidencias/a/b.jpg"
        );
    }

    #[test]
    fn normalize_strips_leading_separators() {
        assert_eq!(normalize_object_path("/evidencias/a.jpg"), "evidencias/a.jpg");
        assert_eq!(normalize_object_path("evidencias/a.jpg"), "evidencias/a.jpg");
    }

    #[test]
    fn normalize_handles_bucket_only_reference() {
        assert_eq!(normalize_object_path("gs://my-bucket"), "");
    }

    #[test]
    fn cache_buster_separator_depends_on_existing_query() {
        assert_eq!(
            append_cache_buster("https://h/o/x?alt=media", 123),
            "https://h/o/x?alt=media&_t=123"
        );
        assert_eq!(append_cache_buster("https://h/o/x", 123), "https://h/o/x?_t=123");
    }

    #[test]
    fn encode_keeps_unreserved_and_encodes_separators() {
        assert_eq!(
            encode_object_path("evidencias/store 1/a.jpg"),
            "evidencias%2Fstore%201%2Fa.jpg"
        );
        assert_eq!(encode_object_path("a-b_c.d~e"), "a-b_c.d~e");
    }

    // ---- resolve: direct links ----

    #[tokio::test]
    async fn direct_storage_link_gets_one_cache_buster_per_call() {
        let (resolver, store) = resolver_with(StubStore::ok("unused"));

        let input = "https://storage.example/o/x?alt=media";
        let first = resolver.resolve(input).await.unwrap();
        assert!(first.starts_with("https://storage.example/o/x?alt=media&_t="));
        assert_eq!(first.matches("_t=").count(), 1);

        // Not idempotent: a second pass appends a second parameter.
        let second = resolver.resolve(&first).await.unwrap();
        assert_eq!(second.matches("_t=").count(), 2);

        // No resolution call was issued for direct links.
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn direct_foreign_link_passes_through_unchanged() {
        let (resolver, store) = resolver_with(StubStore::ok("unused"));

        let input = "https://cdn.example/a.jpg";
        assert_eq!(resolver.resolve(input).await.unwrap(), input);
        assert!(store.calls().is_empty());
    }

    // ---- resolve: storage paths ----

    #[tokio::test]
    async fn storage_path_is_normalized_before_resolution() {
        let (resolver, store) = resolver_with(StubStore::ok("https://storage.example/o/ok"));

        let url = resolver
            .resolve("gs://my-bucket/evidencias/a/b.jpg?ignored=1")
            .await
            .unwrap();

        assert_eq!(store.calls(), vec!["evidencias/a/b.jpg".to_string()]);
        assert!(url.starts_with("https://storage.example/o/ok?_t="));
    }

    #[tokio::test]
    async fn failed_evidence_path_falls_back_to_synthesized_url() {
        let (resolver, _) = resolver_with(StubStore::failing(|| StorageError::NotFound));

        let url = resolver.resolve("evidencias/store-1/a.jpg").await.unwrap();

        assert_eq!(
            url,
            "https://storage.example/v0/b/vision.appspot.com/o/evidencias%2Fstore-1%2Fa.jpg?alt=media"
        );
    }

    #[tokio::test]
    async fn failed_foreign_path_is_unresolvable() {
        let (resolver, _) = resolver_with(StubStore::failing(|| StorageError::Unauthorized));

        assert_eq!(resolver.resolve("otros/a.jpg").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_resolution_times_out_into_the_fallback() {
        let (resolver, store) = resolver_with(StubStore::slow(
            Duration::from_secs(60),
            "https://storage.example/o/late",
        ));

        let url = resolver.resolve("evidencias/a.jpg").await.unwrap();

        // The timeout branch settled first and synthesis took over.
        assert!(url.ends_with("o/evidencias%2Fa.jpg?alt=media"));
        assert_eq!(store.calls(), vec!["evidencias/a.jpg".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_resolution_on_foreign_path_returns_none() {
        let (resolver, _) = resolver_with(StubStore::slow(
            Duration::from_secs(60),
            "https://storage.example/o/late",
        ));

        assert_eq!(resolver.resolve("otros/a.jpg").await, None);
    }

    #[tokio::test]
    async fn malformed_reference_still_gets_a_resolution_attempt() {
        let (resolver, store) = resolver_with(StubStore::failing(|| StorageError::NotFound));

        // Unrecognized scheme: normalization leaves it mostly intact and
        // the attempt fails through to None (not an evidence path).
        assert_eq!(resolver.resolve("ftp://example.com/a.jpg").await, None);
        assert_eq!(store.calls().len(), 1);
    }
}
