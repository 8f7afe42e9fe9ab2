//! Planogram layout CRUD endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use shelfvision_core::error::CoreError;
use shelfvision_core::types::DbId;
use shelfvision_db::models::layout::{CreateLayout, UpdateLayout};
use shelfvision_db::repositories::LayoutRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/layouts
///
/// List all layouts.
async fn list_layouts(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let layouts = LayoutRepo::list(&state.pool).await?;

    Ok(Json(DataResponse { data: layouts }))
}

/// POST /api/v1/layouts
///
/// Create a new layout.
async fn create_layout(
    State(state): State<AppState>,
    Json(input): Json<CreateLayout>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Layout name is required".into(),
        )));
    }

    let layout = LayoutRepo::create(&state.pool, &input).await?;

    tracing::info!(layout_id = layout.id, name = %layout.name, "Layout created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: layout })))
}

/// GET /api/v1/layouts/{id}
///
/// Retrieve a single layout by ID.
async fn get_layout(
    State(state): State<AppState>,
    Path(layout_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let layout = LayoutRepo::find_by_id(&state.pool, layout_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Layout",
            id: layout_id,
        }))?;

    Ok(Json(DataResponse { data: layout }))
}

/// PUT /api/v1/layouts/{id}
///
/// Partially update a layout.
async fn update_layout(
    State(state): State<AppState>,
    Path(layout_id): Path<DbId>,
    Json(input): Json<UpdateLayout>,
) -> AppResult<impl IntoResponse> {
    let layout = LayoutRepo::update(&state.pool, layout_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Layout",
            id: layout_id,
        }))?;

    Ok(Json(DataResponse { data: layout }))
}

/// DELETE /api/v1/layouts/{id}
///
/// Delete a layout and (via cascade) its photo requests.
async fn delete_layout(
    State(state): State<AppState>,
    Path(layout_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = LayoutRepo::delete(&state.pool, layout_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Layout",
            id: layout_id,
        }));
    }

    tracing::info!(layout_id, "Layout deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Mount layout routes under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/layouts", get(list_layouts).post(create_layout))
        .route(
            "/layouts/{id}",
            get(get_layout).put(update_layout).delete(delete_layout),
        )
}
