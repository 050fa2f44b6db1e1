//! Request handlers for the HTTP API.

use super::ApiServer;
use crate::error::{ApiError, ApiResult};
use crate::types::{DependencyEdge, DependencyKind, EdgeId, Task, TaskId, TaskStatus};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub team_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    pub team_id: Option<String>,
}

pub async fn create_task(
    State(state): State<ApiServer>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let task = state
        .db()
        .create_task(&req.title, req.team_id.as_deref())
        .map_err(log_failure("create_task"))?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<ApiServer>,
    Query(params): Query<TaskListParams>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state
        .db()
        .list_tasks(params.team_id.as_deref())
        .map_err(log_failure("list_tasks"))?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<ApiServer>,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<Task>> {
    match state.db().get_task(task_id).map_err(log_failure("get_task"))? {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::task_not_found(task_id)),
    }
}

pub async fn update_task(
    State(state): State<ApiServer>,
    Path(task_id): Path<TaskId>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let status = TaskStatus::parse(&req.status).ok_or_else(|| {
        ApiError::invalid_value(
            "status",
            "status must be one of: pending, in_progress, completed, cancelled",
        )
    })?;

    let task = state
        .db()
        .update_task_status(task_id, status)
        .map_err(log_failure("update_task"))?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<ApiServer>,
    Path(task_id): Path<TaskId>,
) -> ApiResult<StatusCode> {
    state
        .db()
        .soft_delete_task(task_id)
        .map_err(log_failure("delete_task"))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateDependencyRequest {
    pub successor_id: TaskId,
    pub predecessor_id: TaskId,
    #[serde(default)]
    pub kind: DependencyKind,
}

pub async fn create_dependency(
    State(state): State<ApiServer>,
    Json(req): Json<CreateDependencyRequest>,
) -> ApiResult<impl IntoResponse> {
    let edge = state
        .db()
        .add_dependency(req.successor_id, req.predecessor_id, req.kind)
        .map_err(log_failure("create_dependency"))?;
    debug!(
        edge_id = edge.id,
        predecessor = edge.predecessor_id,
        successor = edge.successor_id,
        "Dependency created"
    );
    Ok((StatusCode::CREATED, Json(edge)))
}

pub async fn remove_dependency(
    State(state): State<ApiServer>,
    Path(edge_id): Path<EdgeId>,
) -> ApiResult<StatusCode> {
    state
        .db()
        .remove_dependency(edge_id)
        .map_err(log_failure("remove_dependency"))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn task_dependencies(
    State(state): State<ApiServer>,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<Vec<DependencyEdge>>> {
    let edges = state
        .db()
        .get_dependencies(task_id)
        .map_err(log_failure("task_dependencies"))?;
    Ok(Json(edges))
}

#[derive(Serialize)]
pub struct ChainResponse {
    pub task_id: TaskId,
    pub chain: Vec<TaskId>,
}

pub async fn dependency_chain(
    State(state): State<ApiServer>,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<ChainResponse>> {
    let chain = state
        .db()
        .get_dependency_chain(task_id)
        .map_err(log_failure("dependency_chain"))?;
    Ok(Json(ChainResponse { task_id, chain }))
}

#[derive(Serialize)]
pub struct CanStartResponse {
    pub task_id: TaskId,
    pub can_start: bool,
}

pub async fn can_start(
    State(state): State<ApiServer>,
    Path(task_id): Path<TaskId>,
) -> Json<CanStartResponse> {
    // Fail-open semantics live in the db layer; this endpoint never errors.
    let can_start = state.db().can_task_start(task_id);
    Json(CanStartResponse { task_id, can_start })
}

pub async fn blocked_tasks(
    State(state): State<ApiServer>,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state
        .db()
        .get_blocked_tasks(task_id)
        .map_err(log_failure("blocked_tasks"))?;
    Ok(Json(tasks))
}

#[derive(Debug, Deserialize)]
pub struct AvailablePredecessorParams {
    pub team_id: Option<String>,
}

pub async fn available_predecessors(
    State(state): State<ApiServer>,
    Path(task_id): Path<TaskId>,
    Query(params): Query<AvailablePredecessorParams>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state
        .db()
        .get_available_predecessors(task_id, params.team_id.as_deref())
        .map_err(log_failure("available_predecessors"))?;
    Ok(Json(tasks))
}

/// Convert a db-layer error into a structured response, logging unexpected
/// failures at the boundary.
fn log_failure(operation: &'static str) -> impl Fn(anyhow::Error) -> ApiError {
    move |err| {
        let api_err = ApiError::from(err);
        if api_err.status_code() >= 500 {
            warn!(operation, error = %api_err, "Request failed");
        } else {
            debug!(operation, code = ?api_err.code, "Request rejected");
        }
        api_err
    }
}
