//! Repository for the `photo_requests` table.
//!
//! Listing is always due-date ascending with missing due dates last, the
//! same order the sync layer publishes. `update_image_reference` is the
//! synchronizer's write-back: a partial update that never touches
//! completion state.

use shelfvision_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::photo_request::{
    CompletePhotoRequest, CreatePhotoRequest, PhotoRequest, UpdatePhotoRequest,
};

/// Column list for `photo_requests` queries.
const REQUEST_COLUMNS: &str = "\
    id, request_key, title, layout_id, layout_name, due_date, description, \
    created_by, completed, completed_at, completed_by, image_reference, \
    created_at, updated_at";

/// Provides CRUD and sync operations for photo requests.
pub struct PhotoRequestRepo;

impl PhotoRequestRepo {
    /// Create a new photo request for a layout.
    ///
    /// The row always starts unfulfilled (`completed = false`, no image
    /// reference). The layout display name is denormalized from the
    /// `layouts` table at insert time; a missing `request_key` gets a
    /// generated UUID.
    pub async fn create(
        pool: &PgPool,
        layout_id: DbId,
        input: &CreatePhotoRequest,
    ) -> Result<PhotoRequest, sqlx::Error> {
        let request_key = input
            .request_key
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let query = format!(
            "INSERT INTO photo_requests \
                (request_key, title, layout_id, layout_name, due_date, description, created_by) \
             VALUES ($1, $2, $3, (SELECT name FROM layouts WHERE id = $3), $4, $5, $6) \
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, PhotoRequest>(&query)
            .bind(&request_key)
            .bind(&input.title)
            .bind(layout_id)
            .bind(input.due_date)
            .bind(&input.description)
            .bind(&input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a photo request by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PhotoRequest>, sqlx::Error> {
        let query = format!("SELECT {REQUEST_COLUMNS} FROM photo_requests WHERE id = $1");
        sqlx::query_as::<_, PhotoRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all requests for a layout, due-date ascending, undated last.
    pub async fn list_for_layout(
        pool: &PgPool,
        layout_id: DbId,
    ) -> Result<Vec<PhotoRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM photo_requests \
             WHERE layout_id = $1 \
             ORDER BY due_date ASC NULLS LAST, created_at ASC"
        );
        sqlx::query_as::<_, PhotoRequest>(&query)
            .bind(layout_id)
            .fetch_all(pool)
            .await
    }

    /// Update request metadata. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePhotoRequest,
    ) -> Result<Option<PhotoRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE photo_requests SET \
                title = COALESCE($2, title), \
                due_date = COALESCE($3, due_date), \
                description = COALESCE($4, description), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, PhotoRequest>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(input.due_date)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// The fulfilling actor's one-shot completion mutation.
    ///
    /// Sets the image reference and completion metadata. Guarded by
    /// `completed = false`, so a second completion attempt returns `None`
    /// rather than overwriting the first.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        input: &CompletePhotoRequest,
    ) -> Result<Option<PhotoRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE photo_requests SET \
                image_reference = $2, \
                completed = TRUE, \
                completed_at = now(), \
                completed_by = $3, \
                updated_at = now() \
             WHERE id = $1 AND completed = FALSE \
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, PhotoRequest>(&query)
            .bind(id)
            .bind(&input.image_reference)
            .bind(&input.completed_by)
            .fetch_optional(pool)
            .await
    }

    /// Rewrite the image reference to its resolved canonical form.
    ///
    /// The synchronizer's best-effort durable write-back. Touches only
    /// `image_reference` and `updated_at`; completion state is left alone.
    /// Returns `false` when the row no longer exists (e.g. the request was
    /// deleted while resolution was in flight).
    pub async fn update_image_reference(
        pool: &PgPool,
        id: DbId,
        image_reference: &str,
        resolved_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE photo_requests SET image_reference = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(image_reference)
        .bind(resolved_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
