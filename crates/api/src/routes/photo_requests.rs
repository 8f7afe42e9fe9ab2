//! Photo request endpoints.
//!
//! Creation is the administrator path; completion is the fulfilling
//! actor's one-shot mutation that attaches the evidence reference. Both
//! publish domain events on the bus.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use shelfvision_core::error::CoreError;
use shelfvision_core::types::DbId;
use shelfvision_db::models::photo_request::{CompletePhotoRequest, CreatePhotoRequest};
use shelfvision_db::repositories::{LayoutRepo, PhotoRequestRepo};
use shelfvision_events::bus::{REQUEST_COMPLETED, REQUEST_CREATED};
use shelfvision_events::DomainEvent;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/layouts/{id}/photo-requests
///
/// List a layout's photo requests, due-date ascending, undated last.
async fn list_requests(
    State(state): State<AppState>,
    Path(layout_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let requests = PhotoRequestRepo::list_for_layout(&state.pool, layout_id).await?;

    Ok(Json(DataResponse { data: requests }))
}

/// POST /api/v1/layouts/{id}/photo-requests
///
/// Create a new photo request for a layout.
async fn create_request(
    State(state): State<AppState>,
    Path(layout_id): Path<DbId>,
    Json(input): Json<CreatePhotoRequest>,
) -> AppResult<impl IntoResponse> {
    if input.title.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Request title is required".into(),
        )));
    }

    LayoutRepo::find_by_id(&state.pool, layout_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Layout",
            id: layout_id,
        }))?;

    let request = PhotoRequestRepo::create(&state.pool, layout_id, &input).await?;

    tracing::info!(
        request_id = request.id,
        layout_id,
        request_key = %request.request_key,
        "Photo request created",
    );

    let mut event = DomainEvent::new(REQUEST_CREATED)
        .with_source("photo_request", request.id)
        .with_payload(serde_json::json!({
            "layout_id": layout_id,
            "request_key": request.request_key,
        }));
    if let Some(creator) = &request.created_by {
        event = event.with_actor(creator.clone());
    }
    state.event_bus.publish(event);

    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

/// GET /api/v1/photo-requests/{id}
///
/// Retrieve a single photo request by ID.
async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let request = PhotoRequestRepo::find_by_id(&state.pool, request_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PhotoRequest",
            id: request_id,
        }))?;

    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/photo-requests/{id}/complete
///
/// Attach the evidence reference and completion metadata. One-shot: a
/// request that is already completed conflicts rather than being
/// overwritten.
async fn complete_request(
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<CompletePhotoRequest>,
) -> AppResult<impl IntoResponse> {
    // Write-time half of the completion invariant: evidence must carry a
    // non-empty reference.
    if input.image_reference.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "An image reference is required to complete a request".into(),
        )));
    }

    PhotoRequestRepo::find_by_id(&state.pool, request_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PhotoRequest",
            id: request_id,
        }))?;

    let request = PhotoRequestRepo::complete(&state.pool, request_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::Conflict(
            "Photo request is already completed".into(),
        )))?;

    tracing::info!(
        request_id,
        request_key = %request.request_key,
        "Photo request completed with evidence",
    );

    let mut event = DomainEvent::new(REQUEST_COMPLETED)
        .with_source("photo_request", request.id)
        .with_payload(serde_json::json!({
            "layout_id": request.layout_id,
            "request_key": request.request_key,
        }));
    if let Some(actor) = &request.completed_by {
        event = event.with_actor(actor.clone());
    }
    state.event_bus.publish(event);

    Ok(Json(DataResponse { data: request }))
}

/// Mount photo request routes under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/layouts/{id}/photo-requests",
            get(list_requests).post(create_request),
        )
        .route("/photo-requests/{id}", get(get_request))
        .route("/photo-requests/{id}/complete", post(complete_request))
}
