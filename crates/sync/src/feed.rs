//! Live collection feed over `photo_requests`.
//!
//! [`RequestFeed`] polls the table for one layout on a fixed interval and
//! publishes a [`RequestSnapshot`] whenever the document set changed. Each
//! snapshot carries both the full document list and the fine-grained
//! add/modify/remove diff versus the previous poll.
//!
//! On a database error the feed logs and stops publishing -- fail-stop, no
//! auto-reconnect. Starting a new sync session is the resubscription path.

use std::collections::HashMap;
use std::time::Duration;

use shelfvision_core::types::DbId;
use shelfvision_db::models::photo_request::PhotoRequest;
use shelfvision_db::repositories::PhotoRequestRepo;
use shelfvision_db::DbPool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default interval between polls of the backing table.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Tunable parameters for the request feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Interval between change-detection polls.
    pub poll_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// One change observed between two consecutive snapshots.
#[derive(Debug, Clone)]
pub enum DocChange {
    /// The document appeared.
    Added(PhotoRequest),
    /// The document changed; both versions are carried so consumers can
    /// detect state transitions.
    Modified {
        previous: PhotoRequest,
        current: PhotoRequest,
    },
    /// The document disappeared (prior version carried).
    Removed(PhotoRequest),
}

/// A full view of the collection plus the diff against the previous view.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    /// Every document currently in the collection, in query order.
    pub documents: Vec<PhotoRequest>,
    /// Fine-grained changes versus the previous snapshot. On the first
    /// snapshot this lists every document as [`DocChange::Added`].
    pub changes: Vec<DocChange>,
}

/// Compute the add/modify/remove diff between two document sets.
pub fn diff_documents(
    previous: &HashMap<DbId, PhotoRequest>,
    current: &[PhotoRequest],
) -> Vec<DocChange> {
    let mut changes = Vec::new();

    for doc in current {
        match previous.get(&doc.id) {
            None => changes.push(DocChange::Added(doc.clone())),
            Some(prev) if prev != doc => changes.push(DocChange::Modified {
                previous: prev.clone(),
                current: doc.clone(),
            }),
            Some(_) => {}
        }
    }

    for (id, prev) in previous {
        if !current.iter().any(|doc| doc.id == *id) {
            changes.push(DocChange::Removed(prev.clone()));
        }
    }

    changes
}

/// Poll-based live feed for one layout's photo requests.
pub struct RequestFeed {
    pool: DbPool,
    layout_id: DbId,
    config: FeedConfig,
}

impl RequestFeed {
    /// Create a feed for the given layout.
    pub fn new(pool: DbPool, layout_id: DbId, config: FeedConfig) -> Self {
        Self {
            pool,
            layout_id,
            config,
        }
    }

    /// Run the polling loop until cancellation, the receiver closing, or a
    /// database error (fail-stop).
    ///
    /// The first successful poll always publishes a snapshot; later polls
    /// publish only when the document set changed.
    pub async fn run(self, tx: mpsc::Sender<RequestSnapshot>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        let mut known: Option<HashMap<DbId, PhotoRequest>> = None;

        tracing::info!(
            layout_id = self.layout_id,
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "Request feed started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(layout_id = self.layout_id, "Request feed cancelled");
                    return;
                }
                _ = interval.tick() => {
                    let documents = match PhotoRequestRepo::list_for_layout(
                        &self.pool,
                        self.layout_id,
                    )
                    .await
                    {
                        Ok(docs) => docs,
                        Err(e) => {
                            // Fail-stop: the session sees the channel close
                            // and ends; a fresh session resubscribes.
                            tracing::error!(
                                layout_id = self.layout_id,
                                error = %e,
                                "Request feed query failed, stopping feed"
                            );
                            return;
                        }
                    };

                    let changes = match &known {
                        None => documents.iter().cloned().map(DocChange::Added).collect(),
                        Some(prev) => diff_documents(prev, &documents),
                    };

                    let first = known.is_none();
                    known = Some(documents.iter().map(|d| (d.id, d.clone())).collect());

                    if first || !changes.is_empty() {
                        let snapshot = RequestSnapshot { documents, changes };
                        if tx.send(snapshot).await.is_err() {
                            tracing::debug!(
                                layout_id = self.layout_id,
                                "Snapshot receiver dropped, stopping feed"
                            );
                            return;
                        }
                    }
                }
            }
        }
    }
}
