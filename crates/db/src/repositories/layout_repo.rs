//! Repository for the `layouts` table.

use shelfvision_core::types::DbId;
use sqlx::PgPool;

use crate::models::layout::{CreateLayout, Layout, UpdateLayout};

/// Column list for `layouts` queries.
const LAYOUT_COLUMNS: &str = "id, name, store_name, created_at, updated_at";

/// Provides CRUD operations for planogram layouts.
pub struct LayoutRepo;

impl LayoutRepo {
    /// Create a new layout.
    pub async fn create(pool: &PgPool, input: &CreateLayout) -> Result<Layout, sqlx::Error> {
        let query = format!(
            "INSERT INTO layouts (name, store_name) \
             VALUES ($1, $2) \
             RETURNING {LAYOUT_COLUMNS}"
        );
        sqlx::query_as::<_, Layout>(&query)
            .bind(&input.name)
            .bind(&input.store_name)
            .fetch_one(pool)
            .await
    }

    /// Find a layout by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Layout>, sqlx::Error> {
        let query = format!("SELECT {LAYOUT_COLUMNS} FROM layouts WHERE id = $1");
        sqlx::query_as::<_, Layout>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all layouts ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Layout>, sqlx::Error> {
        let query = format!("SELECT {LAYOUT_COLUMNS} FROM layouts ORDER BY name ASC");
        sqlx::query_as::<_, Layout>(&query).fetch_all(pool).await
    }

    /// Update a layout. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateLayout,
    ) -> Result<Option<Layout>, sqlx::Error> {
        let query = format!(
            "UPDATE layouts SET \
                name = COALESCE($2, name), \
                store_name = COALESCE($3, store_name), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {LAYOUT_COLUMNS}"
        );
        sqlx::query_as::<_, Layout>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.store_name)
            .fetch_optional(pool)
            .await
    }

    /// Delete a layout. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM layouts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
