//! One sync session: feed consumption, reconciliation, resolution.
//!
//! [`run_session`] is the long-lived task behind every watched layout. It
//! owns the in-memory list: snapshots come in over a channel, the
//! reconciled list goes out over a `watch` channel, and each cycle's
//! resolutions are applied before the next snapshot is consumed.

use std::sync::Arc;

use shelfvision_core::types::DbId;
use shelfvision_db::models::photo_request::PhotoRequest;
use shelfvision_events::EventBus;
use shelfvision_storage::EvidenceResolver;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::feed::RequestSnapshot;
use crate::reconciler::Reconciler;
use crate::synchronizer::{EvidenceStore, Synchronizer};

/// Consume snapshots until cancellation or the feed stops.
///
/// Per snapshot: reconcile and publish the ordered list immediately, then
/// run one bounded resolution cycle (which republishes as entries
/// resolve). When the snapshot channel closes -- the feed hit its
/// fail-stop path -- the session ends; a new session is the resubscribe.
pub async fn run_session(
    layout_id: DbId,
    resolver: Arc<EvidenceResolver>,
    store: Arc<dyn EvidenceStore>,
    bus: Arc<EventBus>,
    mut snapshots: mpsc::Receiver<RequestSnapshot>,
    list_tx: watch::Sender<Vec<PhotoRequest>>,
    cancel: CancellationToken,
) {
    let mut reconciler = Reconciler::new(layout_id, Arc::clone(&bus));
    let mut synchronizer = Synchronizer::new(resolver, store, bus);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(layout_id, "Sync session cancelled");
                break;
            }
            snapshot = snapshots.recv() => {
                let Some(snapshot) = snapshot else {
                    tracing::warn!(
                        layout_id,
                        "Snapshot feed closed, sync session ending"
                    );
                    break;
                };

                let mut list = reconciler.apply(snapshot);
                // Publish the reordered list before any resolution work.
                let _ = list_tx.send(list.clone());

                let applied = synchronizer.sync_cycle(&mut list, &list_tx).await;
                if applied > 0 {
                    tracing::debug!(
                        layout_id,
                        applied,
                        resolved_total = synchronizer.resolved_count(),
                        "Resolution cycle applied updates"
                    );
                }
            }
        }
    }

    tracing::info!(
        layout_id,
        resolved_total = synchronizer.resolved_count(),
        "Sync session ended"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use shelfvision_storage::client::{ObjectStore, ProgressFn};
    use shelfvision_storage::{StorageConfig, StorageError};

    struct EchoStore;

    #[async_trait]
    impl ObjectStore for EchoStore {
        async fn resolve_download_url(&self, object_path: &str) -> Result<String, StorageError> {
            Ok(format!("https://storage.example/o/{object_path}"))
        }

        async fn upload_object(
            &self,
            _object_path: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
            _progress: Option<ProgressFn>,
        ) -> Result<String, StorageError> {
            Err(StorageError::Unexpected("unused".into()))
        }
    }

    struct NullStore;

    #[async_trait]
    impl EvidenceStore for NullStore {
        async fn persist_image_reference(
            &self,
            _request_id: DbId,
            _image_reference: &str,
        ) -> Result<(), sqlx::Error> {
            Ok(())
        }
    }

    fn request(id: DbId, image_reference: Option<&str>) -> PhotoRequest {
        let now = Utc::now();
        PhotoRequest {
            id,
            request_key: format!("REQ-{id}"),
            title: format!("request {id}"),
            layout_id: 1,
            layout_name: None,
            due_date: None,
            description: None,
            created_by: None,
            completed: image_reference.is_some(),
            completed_at: None,
            completed_by: None,
            image_reference: image_reference.map(String::from),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn session_publishes_reconciled_and_resolved_lists() {
        let resolver = Arc::new(EvidenceResolver::new(
            Arc::new(EchoStore),
            StorageConfig {
                storage_host: "storage.example".into(),
                ..Default::default()
            },
        ));
        let bus = Arc::new(EventBus::default());
        let (snap_tx, snap_rx) = mpsc::channel(4);
        let (list_tx, mut list_rx) = watch::channel(Vec::new());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_session(
            1,
            resolver,
            Arc::new(NullStore),
            bus,
            snap_rx,
            list_tx,
            cancel.clone(),
        ));

        let doc = request(1, Some("evidencias/a.jpg"));
        snap_tx
            .send(RequestSnapshot {
                documents: vec![doc.clone()],
                changes: vec![crate::feed::DocChange::Added(doc)],
            })
            .await
            .unwrap();

        // The watch channel keeps only the latest value, so wait until the
        // published list carries the resolved link.
        let resolved = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            loop {
                list_rx.changed().await.unwrap();
                let current = list_rx.borrow_and_update().clone();
                if current.len() == 1 {
                    if let Some(reference) = current[0].image_reference.as_deref() {
                        if reference.starts_with("https://storage.example/o/evidencias/a.jpg") {
                            return current;
                        }
                    }
                }
            }
        })
        .await
        .expect("resolved list should be published");
        assert!(resolved[0].completed);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn session_ends_when_the_feed_closes() {
        let resolver = Arc::new(EvidenceResolver::new(
            Arc::new(EchoStore),
            StorageConfig::default(),
        ));
        let bus = Arc::new(EventBus::default());
        let (snap_tx, snap_rx) = mpsc::channel::<RequestSnapshot>(1);
        let (list_tx, _list_rx) = watch::channel(Vec::new());

        let handle = tokio::spawn(run_session(
            1,
            resolver,
            Arc::new(NullStore),
            bus,
            snap_rx,
            list_tx,
            CancellationToken::new(),
        ));

        // Dropping the sender is the fail-stop signal.
        drop(snap_tx);
        handle.await.unwrap();
    }
}
