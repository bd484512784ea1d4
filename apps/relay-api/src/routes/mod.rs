pub mod admin;
pub mod health;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .nest("/api", admin::router())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Admin
        admin::broadcast,
        admin::list,
        admin::send,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            // Wire format
            crate::gateway::events::Envelope,
            // Route request/response types
            health::HealthResponse,
            admin::StatusResponse,
            admin::ListResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Admin", description = "Administrative relay operations"),
    )
)]
pub struct ApiDoc;
