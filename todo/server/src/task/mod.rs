use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod api;
pub mod repository;
pub mod usecase;

pub use api::v1::{TaskState, create_task_router};
pub use repository::MySqlTaskRepository;
pub use usecase::TaskService;

/// A single to-do item.
///
/// `id`, `created_at` and `updated_at` are owned by the repository: whatever a
/// caller puts there is overwritten on insert and update.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Unique identifier, assigned on insert
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a task that has not been persisted yet.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }
}

/// One page of tasks plus the number of tasks stored overall.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Tasks {
    pub data: Vec<Task>,
    /// Row count of the whole table, ignoring `offset` and `limit`
    pub total: u64,
}

impl Tasks {
    pub fn new(data: Vec<Task>, total: u64) -> Self {
        Self { data, total }
    }
}

/// Pagination parameters of a list request.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Filter {
    pub offset: u64,
    pub limit: u64,
    /// Accepted and echoed, but ordering is always by creation time.
    pub sort_by: String,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 10,
            sort_by: String::new(),
        }
    }
}

impl Filter {
    /// Builds a filter from raw query parameters.
    ///
    /// Never fails: a missing, empty or unparseable value falls back to the
    /// default for that key, and unparseable values are logged.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            offset: int_or_default(query, "offset", defaults.offset),
            limit: int_or_default(query, "limit", defaults.limit),
            sort_by: query
                .get("sort_by")
                .filter(|value| !value.is_empty())
                .cloned()
                .unwrap_or(defaults.sort_by),
        }
    }
}

fn int_or_default(query: &HashMap<String, String>, key: &str, default: u64) -> u64 {
    match query.get(key).map(String::as_str) {
        None | Some("") => default,
        Some(raw) => raw.parse().unwrap_or_else(|err| {
            tracing::warn!(key, raw, error = %err, "Ignoring malformed query parameter");
            default
        }),
    }
}

/// Mutating statement kind, used to tag conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Insert => f.write_str("insert"),
            Mutation::Update => f.write_str("update"),
            Mutation::Delete => f.write_str("delete"),
        }
    }
}

/// Errors surfaced by the task repository and use case.
///
/// The display form of each variant is a stable tag that is sent to clients
/// as-is. Underlying storage errors are logged where they occur and never
/// carried in this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The identifier is not a valid UUID.
    #[error("uuid_format")]
    InvalidIdentifier,
    /// A read query could not be executed.
    #[error("query_context")]
    QueryExecution,
    /// A statement could not be prepared on a connection.
    #[error("query_prepare_ctx")]
    Prepare,
    /// A mutating statement failed to execute.
    #[error("query_exec")]
    Execution,
    /// A row could not be decoded into a task.
    #[error("row_data_types")]
    RowDecode,
    /// The result cursor failed part way through, or yielded no rows where one was required.
    #[error("row_corrupt")]
    RowIteration,
    /// No task has the requested identifier.
    #[error("not_found")]
    NotFound,
    /// A single-row statement affected an unexpected number of rows.
    #[error("conflict_{0}")]
    Conflict(Mutation),
}

/// Persistence contract for tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Returns one page of tasks ordered by creation time, plus the total row count.
    async fn fetch(&self, filter: &Filter) -> Result<Tasks, TaskError>;

    /// Looks up a task by its textual UUID.
    async fn get_by_id(&self, id: &str) -> Result<Task, TaskError>;

    /// Stores a new task, assigning its identifier and timestamps.
    async fn insert(&self, task: Task) -> Result<Task, TaskError>;

    /// Replaces title and description of the task `id`, refreshing `updated_at`.
    async fn update(&self, id: &str, task: Task) -> Result<Task, TaskError>;

    /// Removes the task `id`.
    async fn delete(&self, id: &str) -> Result<(), TaskError>;
}

/// Orchestration seam between the HTTP layer and the repository.
///
/// Same contract as [`TaskRepository`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskUseCase: Send + Sync {
    async fn fetch(&self, filter: &Filter) -> Result<Tasks, TaskError>;

    async fn get_by_id(&self, id: &str) -> Result<Task, TaskError>;

    async fn insert(&self, task: Task) -> Result<Task, TaskError>;

    async fn update(&self, id: &str, task: Task) -> Result<Task, TaskError>;

    async fn delete(&self, id: &str) -> Result<(), TaskError>;
}
