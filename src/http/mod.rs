//! HTTP API for the dependency service.
//!
//! This is the service boundary described by the product: edge creation and
//! soft removal, plus read endpoints for chains, eligibility, and blocked
//! tasks. Built on axum with CORS and request tracing layers.

pub mod handlers;

use crate::db::Database;
use crate::error::ApiError;
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiServer {
    db: Arc<Database>,
}

impl ApiServer {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Build the API router.
pub fn router(db: Arc<Database>) -> Router {
    let state = ApiServer::new(db);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(handlers::get_task)
                .patch(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/api/tasks/{id}/dependencies", get(handlers::task_dependencies))
        .route("/api/tasks/{id}/chain", get(handlers::dependency_chain))
        .route("/api/tasks/{id}/can-start", get(handlers::can_start))
        .route("/api/tasks/{id}/blocked", get(handlers::blocked_tasks))
        .route(
            "/api/tasks/{id}/available-predecessors",
            get(handlers::available_predecessors),
        )
        .route("/api/dependencies", post(handlers::create_dependency))
        .route("/api/dependencies/{id}", delete(handlers::remove_dependency))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve the API until shutdown.
pub async fn serve(db: Arc<Database>, addr: &str) -> anyhow::Result<()> {
    let app = router(db);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
