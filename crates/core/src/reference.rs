//! Evidence image reference validation and classification.
//!
//! An evidence reference is a plain string that is re-examined every time
//! it is read -- the variant is never stored. Three shapes occur in the
//! wild:
//!
//! - a **direct link** (`http://` / `https://`) fetchable as-is,
//! - a **storage path** (bucket-relative, possibly `gs://`-prefixed) that
//!   must be resolved through the storage service first,
//! - anything else, which is treated as malformed but still handed to the
//!   resolver as a best-effort fallback.

use serde::Serialize;

/// URI scheme prefixes accepted as directly fetchable.
const DIRECT_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Bucket-URI prefix marking an unresolved storage path.
pub const BUCKET_SCHEME: &str = "gs://";

/// Query marker expected on storage-service download links.
const ALT_MEDIA_MARKER: &str = "alt=media";

/// Encoded path separator expected in storage-service object paths.
const ENCODED_PATH_MARKER: &str = "%2F";

/// The shape of an evidence reference, derived at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Fully qualified URL, fetchable without resolution.
    DirectLink,
    /// Bucket-relative path requiring a resolution call.
    StoragePath,
    /// Neither of the above; resolution is attempted anyway.
    Malformed,
}

impl ReferenceKind {
    /// Classify a reference string.
    ///
    /// Empty strings and strings carrying a scheme other than
    /// `http(s)://` or `gs://` classify as [`ReferenceKind::Malformed`].
    pub fn classify(reference: &str) -> Self {
        if is_directly_fetchable(reference) {
            return Self::DirectLink;
        }
        if reference.is_empty() {
            return Self::Malformed;
        }
        if reference.starts_with(BUCKET_SCHEME) {
            return Self::StoragePath;
        }
        // An unrecognized scheme (ftp://, data:, ...) is malformed; a bare
        // relative path is a storage path.
        if reference.contains("://") {
            Self::Malformed
        } else {
            Self::StoragePath
        }
    }
}

/// Whether a reference is usable as-is, without a resolution call.
///
/// Returns `false` for empty input and `true` exactly when the string
/// starts with `http://` or `https://`.
pub fn is_directly_fetchable(reference: &str) -> bool {
    if reference.is_empty() {
        return false;
    }
    DIRECT_SCHEMES.iter().any(|s| reference.starts_with(s))
}

/// Whether a direct link targets the storage service itself.
///
/// Matched by host substring; `storage_host` comes from configuration.
pub fn is_storage_service_url(reference: &str, storage_host: &str) -> bool {
    is_directly_fetchable(reference) && reference.contains(storage_host)
}

/// Log diagnostics for a storage-service link that is missing the markers
/// a well-formed download URL carries.
///
/// The verdict of [`is_directly_fetchable`] is never affected: links
/// without an `alt=media` marker or an encoded object path are still
/// returned as fetchable. Intentionally log-only.
pub fn log_storage_link_diagnostics(reference: &str) {
    if !reference.contains(ALT_MEDIA_MARKER) {
        tracing::warn!(
            reference,
            "Storage link is missing the alt=media marker; it may not serve raw content"
        );
    }
    if !reference.contains(ENCODED_PATH_MARKER) {
        tracing::warn!(
            reference,
            "Storage link has no encoded object path; it may not point at an object"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reference_is_not_fetchable() {
        assert!(!is_directly_fetchable(""));
    }

    #[test]
    fn http_and_https_prefixes_are_fetchable() {
        assert!(is_directly_fetchable("http://example.com/a.jpg"));
        assert!(is_directly_fetchable("https://example.com/a.jpg"));
    }

    #[test]
    fn other_strings_are_not_fetchable() {
        assert!(!is_directly_fetchable("evidencias/store-1/a.jpg"));
        assert!(!is_directly_fetchable("gs://bucket/evidencias/a.jpg"));
        assert!(!is_directly_fetchable("ftp://example.com/a.jpg"));
        assert!(!is_directly_fetchable("httpx://example.com"));
    }

    #[test]
    fn classify_direct_link() {
        assert_eq!(
            ReferenceKind::classify("https://storage.example/o/x?alt=media"),
            ReferenceKind::DirectLink
        );
    }

    #[test]
    fn classify_storage_paths() {
        assert_eq!(
            ReferenceKind::classify("evidencias/store-1/a.jpg"),
            ReferenceKind::StoragePath
        );
        assert_eq!(
            ReferenceKind::classify("gs://bucket/evidencias/a.jpg"),
            ReferenceKind::StoragePath
        );
    }

    #[test]
    fn classify_malformed() {
        assert_eq!(ReferenceKind::classify(""), ReferenceKind::Malformed);
        assert_eq!(
            ReferenceKind::classify("ftp://example.com/a.jpg"),
            ReferenceKind::Malformed
        );
    }

    #[test]
    fn storage_service_detection_requires_direct_link() {
        let host = "storage.example";
        assert!(is_storage_service_url(
            "https://storage.example/o/x?alt=media",
            host
        ));
        assert!(!is_storage_service_url("storage.example/o/x", host));
        assert!(!is_storage_service_url(
            "https://cdn.example/o/x?alt=media",
            host
        ));
    }

    #[test]
    fn diagnostics_do_not_change_the_verdict() {
        // Missing both markers: still fetchable.
        let bare = "https://storage.example/o/x";
        log_storage_link_diagnostics(bare);
        assert!(is_directly_fetchable(bare));
    }
}
