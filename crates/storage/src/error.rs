//! Failure taxonomy for the storage resolution service.

use reqwest::StatusCode;

/// Error type for storage service operations.
///
/// The resolver classifies every failure into one of these kinds for
/// structured logging; no caller branches on the kind.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The object does not exist.
    #[error("Object not found")]
    NotFound,

    /// The caller lacks permission for the object.
    #[error("Unauthorized access to object")]
    Unauthorized,

    /// The caller is not authenticated at all.
    #[error("Unauthenticated request")]
    Unauthenticated,

    /// The object path is not a valid reference.
    #[error("Invalid object reference: {0}")]
    InvalidReference(String),

    /// The project's storage quota is exhausted.
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// The service is rate-limiting requests.
    #[error("Rate limited by storage service")]
    RateLimited,

    /// The operation was canceled before completion.
    #[error("Operation canceled")]
    Canceled,

    /// The bounded wait elapsed before the service answered.
    #[error("Resolution timed out")]
    TimedOut,

    /// The underlying HTTP request failed (network, DNS, TLS, ...).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Anything the service returned that fits no known class.
    #[error("Unexpected storage failure: {0}")]
    Unexpected(String),
}

impl StorageError {
    /// Map an HTTP status code from the storage service to an error.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::FORBIDDEN => Self::Unauthorized,
            StatusCode::UNAUTHORIZED => Self::Unauthenticated,
            StatusCode::BAD_REQUEST => Self::InvalidReference("rejected by service".into()),
            StatusCode::PAYMENT_REQUIRED | StatusCode::INSUFFICIENT_STORAGE => Self::QuotaExceeded,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            other => Self::Unexpected(format!("HTTP {other}")),
        }
    }

    /// Stable classification label used in log fields.
    pub fn class(&self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::Unauthorized => "unauthorized",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidReference(_) => "invalid-reference",
            Self::QuotaExceeded => "quota-exceeded",
            Self::RateLimited => "rate-limited",
            Self::Canceled => "canceled",
            Self::TimedOut => "timed-out",
            Self::Request(_) | Self::Unexpected(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn status_mapping_covers_known_classes() {
        assert_matches!(
            StorageError::from_status(StatusCode::NOT_FOUND),
            StorageError::NotFound
        );
        assert_matches!(
            StorageError::from_status(StatusCode::FORBIDDEN),
            StorageError::Unauthorized
        );
        assert_matches!(
            StorageError::from_status(StatusCode::UNAUTHORIZED),
            StorageError::Unauthenticated
        );
        assert_matches!(
            StorageError::from_status(StatusCode::TOO_MANY_REQUESTS),
            StorageError::RateLimited
        );
        assert_matches!(
            StorageError::from_status(StatusCode::BAD_GATEWAY),
            StorageError::Unexpected(_)
        );
    }

    #[test]
    fn classes_are_stable_labels() {
        assert_eq!(StorageError::TimedOut.class(), "timed-out");
        assert_eq!(StorageError::Canceled.class(), "canceled");
        assert_eq!(
            StorageError::Unexpected("boom".into()).class(),
            "unknown"
        );
    }
}
