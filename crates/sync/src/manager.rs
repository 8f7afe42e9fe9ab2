//! Per-layout sync session manager.
//!
//! [`SyncManager`] owns the subscribe/unsubscribe lifecycle: at most one
//! sync session per layout, each running a feed task and a session task
//! under a child [`CancellationToken`]. Created once at startup and shared
//! via `Arc` into request handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use shelfvision_core::types::DbId;
use shelfvision_db::models::photo_request::PhotoRequest;
use shelfvision_db::DbPool;
use shelfvision_events::EventBus;
use shelfvision_storage::EvidenceResolver;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_util::sync::CancellationToken;

use crate::feed::{FeedConfig, RequestFeed};
use crate::session::run_session;
use crate::synchronizer::PgEvidenceStore;

/// Buffer size for the feed-to-session snapshot channel.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 16;

/// Bounded wait for each task during shutdown.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// Errors that can occur when interacting with the manager.
#[derive(Debug, thiserror::Error)]
pub enum SyncManagerError {
    /// A session for this layout is already running.
    #[error("Sync session for layout {0} is already running")]
    AlreadyRunning(DbId),

    /// No session is running for this layout.
    #[error("No sync session running for layout {0}")]
    NotRunning(DbId),
}

/// Internal bookkeeping for one watched layout.
struct SyncSession {
    list_rx: watch::Receiver<Vec<PhotoRequest>>,
    /// Per-session cancellation token (child of the manager token).
    cancel: CancellationToken,
    feed_handle: tokio::task::JoinHandle<()>,
    session_handle: tokio::task::JoinHandle<()>,
}

/// Manages evidence sync sessions across layouts.
pub struct SyncManager {
    sessions: RwLock<HashMap<DbId, SyncSession>>,
    pool: DbPool,
    resolver: Arc<EvidenceResolver>,
    bus: Arc<EventBus>,
    feed_config: FeedConfig,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

impl SyncManager {
    /// Create a manager with no active sessions.
    pub fn new(
        pool: DbPool,
        resolver: Arc<EvidenceResolver>,
        bus: Arc<EventBus>,
        feed_config: FeedConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            pool,
            resolver,
            bus,
            feed_config,
            cancel: CancellationToken::new(),
        })
    }

    /// Start a sync session for a layout.
    ///
    /// Spawns the feed and session task pair. Fails if a session for this
    /// layout already exists (stop it first to resubscribe).
    pub async fn start(&self, layout_id: DbId) -> Result<(), SyncManagerError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&layout_id) {
            return Err(SyncManagerError::AlreadyRunning(layout_id));
        }

        let (snap_tx, snap_rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let (list_tx, list_rx) = watch::channel(Vec::new());
        let cancel = self.cancel.child_token();

        let feed = RequestFeed::new(self.pool.clone(), layout_id, self.feed_config.clone());
        let feed_handle = tokio::spawn(feed.run(snap_tx, cancel.clone()));

        let store = Arc::new(PgEvidenceStore::new(self.pool.clone()));
        let session_handle = tokio::spawn(run_session(
            layout_id,
            Arc::clone(&self.resolver),
            store,
            Arc::clone(&self.bus),
            snap_rx,
            list_tx,
            cancel.clone(),
        ));

        sessions.insert(
            layout_id,
            SyncSession {
                list_rx,
                cancel,
                feed_handle,
                session_handle,
            },
        );

        tracing::info!(layout_id, "Sync session started");
        Ok(())
    }

    /// Stop the sync session for a layout.
    ///
    /// Cancels both tasks and waits briefly for a clean exit. Pending
    /// write-backs are not awaited; a late failure is just a log line.
    pub async fn stop(&self, layout_id: DbId) -> Result<(), SyncManagerError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&layout_id)
            .ok_or(SyncManagerError::NotRunning(layout_id))?;

        session.cancel.cancel();
        let _ = tokio::time::timeout(SHUTDOWN_WAIT, session.session_handle).await;
        let _ = tokio::time::timeout(SHUTDOWN_WAIT, session.feed_handle).await;

        tracing::info!(layout_id, "Sync session stopped");
        Ok(())
    }

    /// Subscribe to the live reconciled list for a layout.
    ///
    /// Returns `None` when no session is running.
    pub async fn subscribe(&self, layout_id: DbId) -> Option<watch::Receiver<Vec<PhotoRequest>>> {
        self.sessions
            .read()
            .await
            .get(&layout_id)
            .map(|s| s.list_rx.clone())
    }

    /// Whether a session is currently tracked for a layout.
    ///
    /// A fail-stopped session stays tracked (its last list remains
    /// readable) until explicitly stopped.
    pub async fn is_running(&self, layout_id: DbId) -> bool {
        self.sessions.read().await.contains_key(&layout_id)
    }

    /// IDs of all layouts with a tracked session.
    pub async fn active_layouts(&self) -> Vec<DbId> {
        self.sessions.read().await.keys().copied().collect()
    }

    /// Gracefully shut down all sessions.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down sync manager");
        self.cancel.cancel();

        let mut sessions = self.sessions.write().await;
        for (layout_id, session) in sessions.drain() {
            tracing::info!(layout_id, "Stopping sync session");
            let _ = tokio::time::timeout(SHUTDOWN_WAIT, session.session_handle).await;
            let _ = tokio::time::timeout(SHUTDOWN_WAIT, session.feed_handle).await;
        }

        tracing::info!("Sync manager shut down complete");
    }
}
