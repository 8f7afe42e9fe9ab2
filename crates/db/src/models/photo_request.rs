//! Photo request entity model and DTOs.
//!
//! A photo request asks a store employee for one compliance photo of a
//! planogram layout. `image_reference` stays `NULL` until the request is
//! fulfilled; the completion invariant (`image_reference` non-empty iff
//! `completed`) is enforced best-effort at write time only.

use serde::{Deserialize, Serialize};
use shelfvision_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `photo_requests` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PhotoRequest {
    pub id: DbId,
    /// Store-assigned unique identifier.
    pub request_key: String,
    pub title: String,
    pub layout_id: DbId,
    /// Denormalized layout display name, captured at creation.
    pub layout_name: Option<String>,
    pub due_date: Option<Timestamp>,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub completed: bool,
    pub completed_at: Option<Timestamp>,
    pub completed_by: Option<String>,
    /// Evidence image reference: a direct URL or an unresolved storage
    /// path. Rewritten to its resolved form by the evidence synchronizer.
    pub image_reference: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PhotoRequest {
    /// The evidence reference, if one has been attached.
    ///
    /// Empty strings are treated as absent.
    pub fn evidence_reference(&self) -> Option<&str> {
        self.image_reference.as_deref().filter(|r| !r.is_empty())
    }

    /// Whether this request carries received evidence: completed with a
    /// non-empty image reference.
    pub fn has_evidence(&self) -> bool {
        self.completed && self.evidence_reference().is_some()
    }
}

/// DTO for creating a new photo request (administrator path).
///
/// The new row always starts with `completed = false` and no image
/// reference; a missing `request_key` is generated server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePhotoRequest {
    pub request_key: Option<String>,
    pub title: String,
    pub due_date: Option<Timestamp>,
    pub description: Option<String>,
    pub created_by: Option<String>,
}

/// DTO for the fulfilling actor's one-shot completion mutation.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletePhotoRequest {
    pub image_reference: String,
    pub completed_by: Option<String>,
}

/// DTO for updating request metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePhotoRequest {
    pub title: Option<String>,
    pub due_date: Option<Timestamp>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(completed: bool, image_reference: Option<&str>) -> PhotoRequest {
        PhotoRequest {
            id: 1,
            request_key: "REQ-1".into(),
            title: "Gondola left".into(),
            layout_id: 7,
            layout_name: Some("Entrance gondola".into()),
            due_date: None,
            description: None,
            created_by: None,
            completed,
            completed_at: None,
            completed_by: None,
            image_reference: image_reference.map(String::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_reference_counts_as_absent() {
        assert_eq!(request(false, Some("")).evidence_reference(), None);
        assert_eq!(
            request(false, Some("evidencias/a.jpg")).evidence_reference(),
            Some("evidencias/a.jpg")
        );
    }

    #[test]
    fn has_evidence_requires_both_halves() {
        assert!(request(true, Some("evidencias/a.jpg")).has_evidence());
        assert!(!request(true, None).has_evidence());
        assert!(!request(true, Some("")).has_evidence());
        assert!(!request(false, Some("evidencias/a.jpg")).has_evidence());
    }
}
