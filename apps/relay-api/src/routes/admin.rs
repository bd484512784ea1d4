//! Administrative endpoints: broadcast, list and directed send.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ApiError, ApiErrorBody};
use crate::gateway::admin;
use crate::gateway::events::Envelope;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/broadcast", post(broadcast))
        .route("/list", get(list))
        .route("/send/{peer_id}", post(send))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// POST /api/broadcast
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/broadcast",
    tag = "Admin",
    request_body = Envelope,
    responses(
        (status = 200, description = "Envelope accepted for broadcast", body = StatusResponse),
        (status = 400, description = "Malformed envelope", body = ApiErrorBody),
    )
)]
pub async fn broadcast(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    admin::admin_broadcast(&state.fanout, &body).await?;
    Ok(StatusResponse::ok())
}

// ---------------------------------------------------------------------------
// GET /api/list
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse {
    pub count: usize,
    pub peers: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/list",
    tag = "Admin",
    responses((status = 200, description = "Connected peers", body = ListResponse))
)]
pub async fn list(State(state): State<AppState>) -> Json<ListResponse> {
    let peers: Vec<String> = admin::admin_list(&state.registry)
        .iter()
        .map(ToString::to_string)
        .collect();
    Json(ListResponse {
        count: peers.len(),
        peers,
    })
}

// ---------------------------------------------------------------------------
// POST /api/send/:peer_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/send/{peer_id}",
    tag = "Admin",
    params(("peer_id" = String, Path, description = "Target peer identity")),
    request_body = Envelope,
    responses(
        (status = 200, description = "Envelope accepted for delivery", body = StatusResponse),
        (status = 400, description = "Invalid identity or malformed envelope", body = ApiErrorBody),
        (status = 404, description = "No peer with that identity", body = ApiErrorBody),
    )
)]
pub async fn send(
    State(state): State<AppState>,
    Path(peer_id): Path<String>,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    admin::admin_send(&state.fanout, &peer_id, &body).await?;
    Ok(StatusResponse::ok())
}
