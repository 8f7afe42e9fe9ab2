//! Planogram layout entity model.

use serde::{Deserialize, Serialize};
use shelfvision_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `layouts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Layout {
    pub id: DbId,
    pub name: String,
    pub store_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new layout.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLayout {
    pub name: String,
    pub store_name: Option<String>,
}

/// DTO for updating an existing layout.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLayout {
    pub name: Option<String>,
    pub store_name: Option<String>,
}
