//! MySQL-backed [`TaskRepository`].
//!
//! This is the only place that knows the SQL text, the `BINARY(16)` encoding
//! of task identifiers and how storage failures map onto [`TaskError`].
//! Every storage error is logged here; callers only ever see the tag.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use futures::StreamExt;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult, QueryResult,
    Statement, StreamTrait, Value,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::task::{Filter, Mutation, Task, TaskError, TaskRepository, Tasks};

const SELECT_PAGE: &str =
    "SELECT id, title, description, created_at, updated_at FROM task ORDER BY created_at ASC LIMIT ? OFFSET ?";
const COUNT_TASKS: &str = "SELECT COUNT(*) AS total FROM task";
const SELECT_BY_ID: &str =
    "SELECT id, title, description, created_at, updated_at FROM task WHERE id = ?";
const INSERT_TASK: &str =
    "INSERT INTO task (id, title, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)";
const UPDATE_TASK: &str =
    "UPDATE task SET title = ?, description = ?, updated_at = ? WHERE id = ?";
const DELETE_TASK: &str = "DELETE FROM task WHERE id = ?";

/// Raw shape of a `task` row.
#[derive(Debug, FromQueryResult)]
struct TaskRow {
    id: Vec<u8>,
    title: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = uuid::Error;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: Uuid::from_slice(&row.id)?,
            title: row.title,
            description: row.description,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        })
    }
}

pub struct MySqlTaskRepository {
    db: Arc<DatabaseConnection>,
}

impl MySqlTaskRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Runs a task query and decodes every row.
    ///
    /// Rows are pulled one at a time so that a failure of the statement itself
    /// (reported before the first row) can be told apart from the cursor
    /// breaking after rows have already been read.
    async fn query_tasks(&self, sql: &str, values: Vec<Value>) -> Result<Vec<Task>, TaskError> {
        let stream = self.db.stream(statement(sql, values)).await.map_err(|err| {
            tracing::error!(error = %err, sql, "Failed to execute task query");
            TaskError::QueryExecution
        })?;
        let mut rows = std::pin::pin!(stream);

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await {
            let row = row.map_err(|err| {
                tracing::error!(error = %err, sql, read = tasks.len(), "Task cursor failed");
                classify_cursor_error(tasks.len())
            })?;
            tasks.push(decode_task(&row)?);
        }
        Ok(tasks)
    }

    async fn count(&self) -> Result<u64, TaskError> {
        let row = self
            .db
            .query_one(statement(COUNT_TASKS, Vec::new()))
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "Failed to count tasks");
                TaskError::QueryExecution
            })?
            .ok_or_else(|| {
                tracing::error!("Count query returned no rows");
                TaskError::RowIteration
            })?;

        let total: i64 = row.try_get("", "total").map_err(|err| {
            tracing::error!(error = %err, "Failed to decode task count");
            TaskError::RowDecode
        })?;
        u64::try_from(total).map_err(|err| {
            tracing::error!(error = %err, total, "Task count out of range");
            TaskError::RowDecode
        })
    }

    /// Executes a mutating statement and returns the affected-row count.
    async fn execute(&self, sql: &str, values: Vec<Value>) -> Result<u64, TaskError> {
        self.db
            .execute(statement(sql, values))
            .await
            .map(|result| result.rows_affected())
            .map_err(|err| {
                tracing::error!(error = %err, sql, "Failed to execute statement");
                classify_execution_error(&err)
            })
    }
}

#[async_trait]
impl TaskRepository for MySqlTaskRepository {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, filter: &Filter) -> Result<Tasks, TaskError> {
        let tasks = self
            .query_tasks(SELECT_PAGE, vec![filter.limit.into(), filter.offset.into()])
            .await?;
        let total = self.count().await?;
        Ok(Tasks::new(tasks, total))
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Task, TaskError> {
        let id = parse_identifier(id)?;
        self.query_tasks(SELECT_BY_ID, vec![binary(&id)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                tracing::warn!(%id, "Task not found");
                TaskError::NotFound
            })
    }

    #[tracing::instrument(skip(self, task))]
    async fn insert(&self, mut task: Task) -> Result<Task, TaskError> {
        let created_at = now();
        task.id = Uuid::new_v4();
        task.created_at = Some(created_at);
        task.updated_at = Some(created_at);

        let affected = self
            .execute(
                INSERT_TASK,
                vec![
                    binary(&task.id),
                    task.title.clone().into(),
                    task.description.clone().into(),
                    created_at.into(),
                    created_at.into(),
                ],
            )
            .await?;
        if affected != 1 {
            tracing::error!(affected, id = %task.id, "Unexpected affected rows on insert");
            return Err(TaskError::Conflict(Mutation::Insert));
        }
        Ok(task)
    }

    #[tracing::instrument(skip(self, task))]
    async fn update(&self, id: &str, mut task: Task) -> Result<Task, TaskError> {
        let id = parse_identifier(id)?;
        let updated_at = now();
        task.id = id;
        task.updated_at = Some(updated_at);

        let affected = self
            .execute(
                UPDATE_TASK,
                vec![
                    task.title.clone().into(),
                    task.description.clone().into(),
                    updated_at.into(),
                    binary(&id),
                ],
            )
            .await?;
        check_single_row(affected, Mutation::Update, &id)?;
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), TaskError> {
        let id = parse_identifier(id)?;
        let affected = self.execute(DELETE_TASK, vec![binary(&id)]).await?;
        check_single_row(affected, Mutation::Delete, &id)
    }
}

fn statement(sql: &str, values: Vec<Value>) -> Statement {
    Statement::from_sql_and_values(DbBackend::MySql, sql, values)
}

fn parse_identifier(id: &str) -> Result<Uuid, TaskError> {
    Uuid::parse_str(id).map_err(|err| {
        tracing::warn!(error = %err, id, "Malformed task identifier");
        TaskError::InvalidIdentifier
    })
}

/// Identifiers are stored and compared in their 16-byte form.
fn binary(id: &Uuid) -> Value {
    id.as_bytes().to_vec().into()
}

/// Current time at the precision of a `TIMESTAMP(6)` column.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn decode_task(row: &QueryResult) -> Result<Task, TaskError> {
    let row = TaskRow::from_query_result(row, "").map_err(|err| {
        tracing::error!(error = %err, "Failed to decode task row");
        TaskError::RowDecode
    })?;
    Task::try_from(row).map_err(|err| {
        tracing::error!(error = %err, "Stored task identifier is not a UUID");
        TaskError::RowDecode
    })
}

/// A cursor that fails before yielding anything means the query itself failed.
fn classify_cursor_error(rows_read: usize) -> TaskError {
    if rows_read == 0 {
        TaskError::QueryExecution
    } else {
        TaskError::RowIteration
    }
}

fn classify_execution_error(err: &DbErr) -> TaskError {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => TaskError::Prepare,
        _ => TaskError::Execution,
    }
}

fn check_single_row(affected: u64, mutation: Mutation, id: &Uuid) -> Result<(), TaskError> {
    match affected {
        1 => Ok(()),
        0 => {
            tracing::warn!(%id, %mutation, "Task not found");
            Err(TaskError::NotFound)
        }
        _ => {
            tracing::error!(affected, %id, %mutation, "Unexpected affected rows");
            Err(TaskError::Conflict(mutation))
        }
    }
}
