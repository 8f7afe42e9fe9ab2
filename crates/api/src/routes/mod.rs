pub mod health;
pub mod layouts;
pub mod photo_requests;
pub mod sync;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /layouts                               list, create
/// /layouts/{id}                          get, update, delete
/// /layouts/{id}/photo-requests           list, create
/// /layouts/{id}/sync                     start (POST), stop (DELETE)
/// /layouts/{id}/sync/requests            live reconciled list (GET)
///
/// /photo-requests/{id}                   get
/// /photo-requests/{id}/complete          fulfil with evidence (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(layouts::router())
        .merge(photo_requests::router())
        .merge(sync::router())
}
