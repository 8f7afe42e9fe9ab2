//! Object-storage client and evidence reference resolver.
//!
//! Evidence photos live in an external object-storage service. This crate
//! provides:
//!
//! - [`ObjectStore`] — the narrow request/response contract with that
//!   service (URL resolution and binary upload), with an HTTP
//!   implementation in [`StorageClient`].
//! - [`EvidenceResolver`] — turns any stored image reference (direct
//!   link, bucket path, or malformed string) into a directly fetchable
//!   URL, with a bounded wait and a layered fallback strategy.
//! - [`StorageError`] — the failure taxonomy observed from the service.

pub mod client;
pub mod config;
pub mod error;
pub mod resolver;

pub use client::{ObjectStore, ProgressFn, StorageClient};
pub use config::StorageConfig;
pub use error::StorageError;
pub use resolver::EvidenceResolver;
