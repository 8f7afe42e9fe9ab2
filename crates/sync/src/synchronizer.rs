//! Evidence synchronizer.
//!
//! Drives the [`EvidenceResolver`] over every reconciled entry whose image
//! reference still needs resolution. In-memory state is updated and
//! published the moment a resolution completes; the durable write-back to
//! `photo_requests` is spawned fire-and-forget and its failure never rolls
//! the in-memory update back.
//!
//! Resolution state is session-local: a restarted session re-resolves
//! everything once.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use shelfvision_core::reference::is_directly_fetchable;
use shelfvision_core::types::DbId;
use shelfvision_db::models::photo_request::PhotoRequest;
use shelfvision_db::repositories::PhotoRequestRepo;
use shelfvision_db::DbPool;
use shelfvision_events::bus::EVIDENCE_RESOLVED;
use shelfvision_events::{DomainEvent, EventBus};
use shelfvision_storage::EvidenceResolver;
use tokio::sync::watch;

/// Upper bound on resolver calls in flight per reconciliation cycle.
///
/// Entries beyond the cap are picked up on a later cycle triggered by the
/// next snapshot.
pub const RESOLVE_BATCH_LIMIT: usize = 5;

/// Best-effort durable write of a resolved reference.
///
/// The trait seam lets tests observe write-backs without a database.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Persist the resolved reference for a request. Returns the result so
    /// callers that need durability can queue retries externally; this
    /// workflow only logs failures.
    async fn persist_image_reference(
        &self,
        request_id: DbId,
        image_reference: &str,
    ) -> Result<(), sqlx::Error>;
}

/// PostgreSQL-backed [`EvidenceStore`].
pub struct PgEvidenceStore {
    pool: DbPool,
}

impl PgEvidenceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvidenceStore for PgEvidenceStore {
    async fn persist_image_reference(
        &self,
        request_id: DbId,
        image_reference: &str,
    ) -> Result<(), sqlx::Error> {
        let updated = PhotoRequestRepo::update_image_reference(
            &self.pool,
            request_id,
            image_reference,
            Utc::now(),
        )
        .await?;
        if !updated {
            // The request vanished while resolution was in flight; the
            // write is simply lost.
            tracing::warn!(request_id, "Write-back target no longer exists");
        }
        Ok(())
    }
}

/// Orchestrates bounded resolution over the reconciled list.
pub struct Synchronizer {
    resolver: Arc<EvidenceResolver>,
    store: Arc<dyn EvidenceStore>,
    bus: Arc<EventBus>,
    /// Requests whose reference resolved (or was already direct) this session.
    resolved: HashSet<DbId>,
    /// Requests whose resolution failed this session; not retried until a
    /// fresh session starts.
    attempted: HashSet<DbId>,
}

impl Synchronizer {
    /// Create a synchronizer with empty session state.
    pub fn new(
        resolver: Arc<EvidenceResolver>,
        store: Arc<dyn EvidenceStore>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            resolver,
            store,
            bus,
            resolved: HashSet::new(),
            attempted: HashSet::new(),
        }
    }

    /// Number of references resolved so far in this session.
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Run one resolution cycle over the current list.
    ///
    /// Applies successful resolutions to `list` in completion order,
    /// publishing the updated list through `list_tx` after each one, and
    /// spawns the best-effort write-back per resolution. Returns how many
    /// entries were rewritten.
    pub async fn sync_cycle(
        &mut self,
        list: &mut Vec<PhotoRequest>,
        list_tx: &watch::Sender<Vec<PhotoRequest>>,
    ) -> usize {
        let mut candidates: Vec<(DbId, String)> = Vec::new();

        for doc in list.iter() {
            let Some(reference) = doc.evidence_reference() else {
                continue;
            };
            if self.resolved.contains(&doc.id) || self.attempted.contains(&doc.id) {
                continue;
            }
            if is_directly_fetchable(reference) {
                // Usable as-is: mark resolved without any I/O.
                self.resolved.insert(doc.id);
                continue;
            }
            candidates.push((doc.id, reference.to_string()));
        }

        if candidates.is_empty() {
            return 0;
        }

        let deferred = candidates.len().saturating_sub(RESOLVE_BATCH_LIMIT);
        if deferred > 0 {
            tracing::debug!(
                deferred,
                "Resolution cap reached; remaining entries wait for the next cycle"
            );
        }
        candidates.truncate(RESOLVE_BATCH_LIMIT);

        let resolver = Arc::clone(&self.resolver);
        let mut resolutions = stream::iter(candidates.into_iter().map(move |(id, reference)| {
            let resolver = Arc::clone(&resolver);
            async move {
                let resolved = resolver.resolve(&reference).await;
                (id, reference, resolved)
            }
        }))
        .buffer_unordered(RESOLVE_BATCH_LIMIT);

        let mut applied = 0;
        while let Some((id, reference, resolved)) = resolutions.next().await {
            match resolved {
                Some(url) => {
                    self.resolved.insert(id);
                    if let Some(entry) = list.iter_mut().find(|doc| doc.id == id) {
                        entry.image_reference = Some(url.clone());
                        applied += 1;
                        // Memory first: consumers see the resolved link
                        // before the durable write settles.
                        let _ = list_tx.send(list.clone());
                    }

                    self.bus.publish(
                        DomainEvent::new(EVIDENCE_RESOLVED)
                            .with_source("photo_request", id)
                            .with_payload(serde_json::json!({ "reference": reference })),
                    );

                    let store = Arc::clone(&self.store);
                    tokio::spawn(async move {
                        if let Err(e) = store.persist_image_reference(id, &url).await {
                            tracing::warn!(
                                request_id = id,
                                error = %e,
                                "Best-effort write-back of resolved reference failed"
                            );
                        }
                    });
                }
                None => {
                    self.attempted.insert(id);
                    tracing::warn!(
                        request_id = id,
                        reference = %reference,
                        "Reference unresolvable; keeping original value this session"
                    );
                }
            }
        }

        applied
    }
}
