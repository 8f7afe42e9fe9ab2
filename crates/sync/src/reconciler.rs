//! Snapshot reconciliation.
//!
//! [`Reconciler`] consumes [`RequestSnapshot`]s and rebuilds the full
//! ordered list every time (due-date ascending, undated entries last). The
//! fine-grained diff is inspected only for side-channel logging and for
//! publishing an `evidence.received` event when a modified request
//! transitions into the completed-with-evidence state.

use std::cmp::Ordering;
use std::sync::Arc;

use shelfvision_core::types::DbId;
use shelfvision_db::models::photo_request::PhotoRequest;
use shelfvision_events::bus::EVIDENCE_RECEIVED;
use shelfvision_events::{DomainEvent, EventBus};

use crate::feed::{DocChange, RequestSnapshot};

/// Order requests by due date ascending, missing due dates last.
///
/// The sort is stable, so entries that compare equal keep query order
/// (creation order).
pub fn order_requests(mut documents: Vec<PhotoRequest>) -> Vec<PhotoRequest> {
    documents.sort_by(|a, b| match (a.due_date, b.due_date) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    documents
}

/// Whether a modification carried the request into the
/// completed-with-evidence state it previously lacked.
pub fn evidence_received(previous: &PhotoRequest, current: &PhotoRequest) -> bool {
    current.has_evidence() && !previous.has_evidence()
}

/// Rebuilds the ordered list from snapshots and raises domain events.
///
/// The first snapshot is published immediately without diff inspection
/// (there is no prior state to have transitioned from); every later
/// snapshot is inspected change by change.
pub struct Reconciler {
    layout_id: DbId,
    bus: Arc<EventBus>,
    initialized: bool,
}

impl Reconciler {
    /// Create a reconciler for one layout's feed.
    pub fn new(layout_id: DbId, bus: Arc<EventBus>) -> Self {
        Self {
            layout_id,
            bus,
            initialized: false,
        }
    }

    /// Apply a snapshot, returning the freshly ordered list.
    pub fn apply(&mut self, snapshot: RequestSnapshot) -> Vec<PhotoRequest> {
        let ordered = order_requests(snapshot.documents);

        if !self.initialized {
            self.initialized = true;
            tracing::info!(
                layout_id = self.layout_id,
                count = ordered.len(),
                "Initial request snapshot reconciled"
            );
            return ordered;
        }

        for change in &snapshot.changes {
            match change {
                DocChange::Added(doc) => {
                    tracing::debug!(
                        layout_id = self.layout_id,
                        request_id = doc.id,
                        request_key = %doc.request_key,
                        "Photo request added"
                    );
                }
                DocChange::Modified { previous, current } => {
                    tracing::debug!(
                        layout_id = self.layout_id,
                        request_id = current.id,
                        request_key = %current.request_key,
                        "Photo request modified"
                    );
                    if evidence_received(previous, current) {
                        tracing::info!(
                            layout_id = self.layout_id,
                            request_id = current.id,
                            request_key = %current.request_key,
                            "Evidence received for photo request"
                        );
                        self.bus.publish(
                            DomainEvent::new(EVIDENCE_RECEIVED)
                                .with_source("photo_request", current.id)
                                .with_payload(serde_json::json!({
                                    "layout_id": self.layout_id,
                                    "request_key": current.request_key,
                                })),
                        );
                    }
                }
                DocChange::Removed(doc) => {
                    tracing::debug!(
                        layout_id = self.layout_id,
                        request_id = doc.id,
                        request_key = %doc.request_key,
                        "Photo request removed"
                    );
                }
            }
        }

        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shelfvision_core::types::Timestamp;

    fn request(id: DbId, due_date: Option<Timestamp>) -> PhotoRequest {
        let now = Utc::now();
        PhotoRequest {
            id,
            request_key: format!("REQ-{id}"),
            title: format!("request {id}"),
            layout_id: 1,
            layout_name: None,
            due_date,
            description: None,
            created_by: None,
            completed: false,
            completed_at: None,
            completed_by: None,
            image_reference: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn orders_by_due_date_with_undated_last() {
        let docs = vec![
            request(1, Some(date(2024, 5, 1))),
            request(2, None),
            request(3, Some(date(2024, 3, 1))),
        ];

        let ordered = order_requests(docs);
        let ids: Vec<DbId> = ordered.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn stable_order_for_equal_due_dates() {
        let due = Some(date(2024, 4, 1));
        let docs = vec![request(1, due), request(2, due), request(3, None)];

        let ordered = order_requests(docs);
        let ids: Vec<DbId> = ordered.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn transition_into_evidence_is_detected() {
        let before = request(1, None);
        let mut after = request(1, None);
        after.completed = true;
        after.image_reference = Some("evidencias/a.jpg".into());

        assert!(evidence_received(&before, &after));
        // Already had evidence: no transition.
        assert!(!evidence_received(&after, &after));
        // Completed without a reference: not evidence.
        let mut half = request(1, None);
        half.completed = true;
        assert!(!evidence_received(&before, &half));
    }

    #[tokio::test]
    async fn evidence_transition_publishes_event_after_first_snapshot() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let mut reconciler = Reconciler::new(1, bus.clone());

        let before = request(7, None);
        let first = RequestSnapshot {
            documents: vec![before.clone()],
            changes: vec![DocChange::Added(before.clone())],
        };
        reconciler.apply(first);

        // First snapshot never raises events, even with changes listed.
        assert!(rx.try_recv().is_err());

        let mut after = before.clone();
        after.completed = true;
        after.image_reference = Some("evidencias/a.jpg".into());
        let second = RequestSnapshot {
            documents: vec![after.clone()],
            changes: vec![DocChange::Modified {
                previous: before,
                current: after,
            }],
        };
        reconciler.apply(second);

        let event = rx.recv().await.expect("event should be published");
        assert_eq!(event.event_type, EVIDENCE_RECEIVED);
        assert_eq!(event.source_entity_id, Some(7));
        assert_eq!(event.payload["request_key"], "REQ-7");
    }
}
