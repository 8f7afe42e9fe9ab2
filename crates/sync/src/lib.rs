//! Evidence synchronization for photo requests.
//!
//! Keeps a per-layout, ordered in-memory view of the `photo_requests`
//! collection in step with the database and with the object-storage
//! service:
//!
//! - [`feed`] — the live collection feed: polls the table, diffs against
//!   the previous snapshot, and emits change sets.
//! - [`reconciler`] — rebuilds the ordered list from each snapshot and
//!   detects evidence-received transitions.
//! - [`synchronizer`] — resolves unresolved image references through the
//!   [`EvidenceResolver`](shelfvision_storage::EvidenceResolver) with
//!   bounded fan-out, updating memory first and persisting best-effort.
//! - [`session`] / [`manager`] — one long-lived task pair per watched
//!   layout, with subscribe/unsubscribe lifecycle.

pub mod feed;
pub mod manager;
pub mod reconciler;
pub mod session;
pub mod synchronizer;

pub use feed::{DocChange, FeedConfig, RequestFeed, RequestSnapshot};
pub use manager::{SyncManager, SyncManagerError};
pub use reconciler::Reconciler;
pub use synchronizer::{EvidenceStore, PgEvidenceStore, Synchronizer, RESOLVE_BATCH_LIMIT};
