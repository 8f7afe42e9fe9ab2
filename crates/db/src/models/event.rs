//! Persisted domain event entity model.

use serde::Serialize;
use shelfvision_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `events` table.
///
/// `event_type` is stored as text (dot-separated name); this system has a
/// small fixed event vocabulary, so no lookup table is kept.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredEvent {
    pub id: DbId,
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub actor: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
