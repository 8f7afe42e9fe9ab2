//! Storage service configuration.

use std::time::Duration;

/// Configuration for the object-storage service and the resolver.
///
/// All fields have defaults suitable for local development; override via
/// environment variables in production.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base URL of the storage resolution API (default:
    /// `http://localhost:9199`).
    pub api_url: String,
    /// Host name that identifies already-resolved storage links (default:
    /// `firebasestorage.googleapis.com`).
    pub storage_host: String,
    /// Bucket holding evidence objects (default: `shelfvision-evidence`).
    pub bucket: String,
    /// Public host of the deployed application. The first DNS label is
    /// used as the project identifier for last-resort URL synthesis
    /// (default: `localhost`).
    pub public_host: String,
    /// Bounded wait for a single resolution call (default: 15 s).
    pub resolve_timeout: Duration,
}

/// Default resolution timeout in seconds.
const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 15;

impl StorageConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                            |
    /// |------------------------|------------------------------------|
    /// | `STORAGE_API_URL`      | `http://localhost:9199`            |
    /// | `STORAGE_HOST`         | `firebasestorage.googleapis.com`   |
    /// | `STORAGE_BUCKET`       | `shelfvision-evidence`             |
    /// | `PUBLIC_HOST`          | `localhost`                        |
    /// | `RESOLVE_TIMEOUT_SECS` | `15`                               |
    pub fn from_env() -> Self {
        let api_url =
            std::env::var("STORAGE_API_URL").unwrap_or_else(|_| "http://localhost:9199".into());

        let storage_host = std::env::var("STORAGE_HOST")
            .unwrap_or_else(|_| "firebasestorage.googleapis.com".into());

        let bucket =
            std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "shelfvision-evidence".into());

        let public_host = std::env::var("PUBLIC_HOST").unwrap_or_else(|_| "localhost".into());

        let resolve_timeout_secs: u64 = std::env::var("RESOLVE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RESOLVE_TIMEOUT_SECS);

        Self {
            api_url,
            storage_host,
            bucket,
            public_host,
            resolve_timeout: Duration::from_secs(resolve_timeout_secs),
        }
    }

    /// Project identifier derived from the public host's first DNS label.
    ///
    /// `vision.example.app` yields `vision`; a bare host is used as-is.
    pub fn project_id(&self) -> &str {
        self.public_host
            .split('.')
            .next()
            .unwrap_or(&self.public_host)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:9199".into(),
            storage_host: "firebasestorage.googleapis.com".into(),
            bucket: "shelfvision-evidence".into(),
            public_host: "localhost".into(),
            resolve_timeout: Duration::from_secs(DEFAULT_RESOLVE_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_id_is_first_dns_label() {
        let config = StorageConfig {
            public_host: "vision.example.app".into(),
            ..Default::default()
        };
        assert_eq!(config.project_id(), "vision");
    }

    #[test]
    fn bare_host_is_its_own_project_id() {
        let config = StorageConfig::default();
        assert_eq!(config.project_id(), "localhost");
    }
}
