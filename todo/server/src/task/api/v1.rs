use crate::response::{ErrorMessage, Response};
use crate::task::{Filter, Task, TaskUseCase};
use axum::{
    Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

/// Shared state of the task endpoints.
#[derive(Clone)]
pub struct TaskState {
    pub use_case: Arc<dyn TaskUseCase>,
}

type ApiError = (StatusCode, Json<ErrorMessage>);
type ApiResult<T> = Result<(StatusCode, Json<Response<T>>), ApiError>;

/// Reasons a task payload is rejected before it reaches the use case.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The body is not valid JSON, is not a task object, or has unknown fields.
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("Wrong type provided for field {0}")]
    WrongType(&'static str),
    /// A required text field is empty or only whitespace.
    #[error("Required field {0}")]
    RequiredField(&'static str),
}

const TEXT_FIELDS: [&str; 5] = ["id", "title", "description", "updated_at", "created_at"];

/// Strictly decodes a task body.
///
/// A `null` field is read as absent. Type mismatches are reported by field
/// name; anything else serde rejects (syntax, unknown fields, unparseable
/// identifiers or timestamps) is reported as malformed.
pub fn decode_task(body: &[u8]) -> Result<Task, PayloadError> {
    let mut value: serde_json::Value =
        serde_json::from_slice(body).map_err(|err| PayloadError::Malformed(err.to_string()))?;

    if let Some(fields) = value.as_object_mut() {
        fields.retain(|_, value| !value.is_null());
        let mismatch = TEXT_FIELDS
            .into_iter()
            .find(|field| fields.get(*field).is_some_and(|value| !value.is_string()));
        if let Some(field) = mismatch {
            return Err(PayloadError::WrongType(field));
        }
    }

    serde_json::from_value(value).map_err(|err| PayloadError::Malformed(err.to_string()))
}

/// Checks required fields, title first.
pub fn validate(task: &Task) -> Result<(), PayloadError> {
    if task.title.trim().is_empty() {
        return Err(PayloadError::RequiredField("title"));
    }
    if task.description.trim().is_empty() {
        return Err(PayloadError::RequiredField("description"));
    }
    Ok(())
}

fn decode_valid_task(body: &[u8]) -> Result<Task, ApiError> {
    let task = decode_task(body).and_then(|task| validate(&task).map(|()| task));
    task.map_err(|err| {
        tracing::warn!(error = %err, "Rejected task payload");
        error_response(StatusCode::BAD_REQUEST, err)
    })
}

fn error_response(status: StatusCode, err: impl Display) -> ApiError {
    (status, Json(ErrorMessage::new(err.to_string())))
}

/// Handler for GET /task/ - Returns one page of tasks with pagination metadata.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/task/",
    params(
        ("offset" = Option<u64>, Query, description = "Number of tasks to skip (default 0)"),
        ("limit" = Option<u64>, Query, description = "Maximum number of tasks to return (default 10)"),
        ("sort_by" = Option<String>, Query, description = "Accepted but currently ignored")
    ),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = Response<Vec<Task>>),
        (status = 500, description = "Storage failure", body = ErrorMessage)
    ),
    tag = "Tasks"
)]
pub async fn fetch_tasks_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Vec<Task>> {
    tracing::info!(method = "GET", route = "/task/", "Fetch");
    let filter = Filter::from_query(&query);

    match state.use_case.fetch(&filter).await {
        Ok(tasks) => Ok((
            StatusCode::OK,
            Json(Response::page(tasks.data, tasks.total, &filter)),
        )),
        Err(err) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, err)),
    }
}

/// Handler for POST /task/ - Creates a task.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    post,
    path = "/task/",
    request_body = Task,
    responses(
        (status = 202, description = "Task created", body = Response<Task>),
        (status = 400, description = "Invalid payload or storage failure", body = ErrorMessage)
    ),
    tag = "Tasks"
)]
pub async fn insert_task_handler(
    State(state): State<Arc<TaskState>>,
    body: Bytes,
) -> ApiResult<Task> {
    tracing::info!(method = "POST", route = "/task/", "Insert");
    let task = decode_valid_task(&body)?;

    match state.use_case.insert(task).await {
        Ok(task) => Ok((StatusCode::ACCEPTED, Json(Response::data(task)))),
        Err(err) => Err(error_response(StatusCode::BAD_REQUEST, err)),
    }
}

/// Handler for GET /task/{task_id}/ - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/task/{task_id}/",
    params(("task_id" = String, Path, description = "Task identifier (UUID)")),
    responses(
        (status = 200, description = "Task found", body = Response<Task>),
        (status = 404, description = "Task not found or identifier malformed", body = ErrorMessage)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(task_id): Path<String>,
) -> ApiResult<Task> {
    tracing::info!(method = "GET", route = "/task/{task_id}/", "Get by id");

    match state.use_case.get_by_id(&task_id).await {
        Ok(task) => Ok((StatusCode::OK, Json(Response::data(task)))),
        Err(err) => Err(error_response(StatusCode::NOT_FOUND, err)),
    }
}

/// Handler for PUT /task/{task_id}/ - Replaces title and description of a task.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    put,
    path = "/task/{task_id}/",
    params(("task_id" = String, Path, description = "Task identifier (UUID)")),
    request_body = Task,
    responses(
        (status = 202, description = "Task updated", body = Response<Task>),
        (status = 400, description = "Invalid payload, unknown task or storage failure", body = ErrorMessage)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(task_id): Path<String>,
    body: Bytes,
) -> ApiResult<Task> {
    tracing::info!(method = "PUT", route = "/task/{task_id}/", "Update");
    let task = decode_valid_task(&body)?;

    match state.use_case.update(&task_id, task).await {
        Ok(task) => Ok((StatusCode::ACCEPTED, Json(Response::data(task)))),
        Err(err) => Err(error_response(StatusCode::BAD_REQUEST, err)),
    }
}

/// Handler for DELETE /task/{task_id}/ - Removes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/task/{task_id}/",
    params(("task_id" = String, Path, description = "Task identifier (UUID)")),
    responses(
        (status = 202, description = "Task deleted, empty body `{}`"),
        (status = 404, description = "Task not found or identifier malformed", body = ErrorMessage)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(task_id): Path<String>,
) -> ApiResult<()> {
    tracing::info!(method = "DELETE", route = "/task/{task_id}/", "Delete");

    match state.use_case.delete(&task_id).await {
        Ok(()) => Ok((StatusCode::ACCEPTED, Json(Response::empty()))),
        Err(err) => Err(error_response(StatusCode::NOT_FOUND, err)),
    }
}

/// Creates and returns the task router.
pub fn create_task_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/task/", get(fetch_tasks_handler).post(insert_task_handler))
        .route(
            "/task/{task_id}/",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(state)
}
