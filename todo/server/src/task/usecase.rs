use async_trait::async_trait;
use std::sync::Arc;

use crate::task::{Filter, Task, TaskError, TaskRepository, TaskUseCase, Tasks};

/// Default [`TaskUseCase`]: hands every call to the repository unchanged.
///
/// Rules spanning more than persistence (auditing, authorization, derived
/// fields) belong here rather than in the handlers or the repository.
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl TaskUseCase for TaskService {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, filter: &Filter) -> Result<Tasks, TaskError> {
        self.repository.fetch(filter).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Task, TaskError> {
        self.repository.get_by_id(id).await
    }

    #[tracing::instrument(skip(self))]
    async fn insert(&self, task: Task) -> Result<Task, TaskError> {
        self.repository.insert(task).await
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, id: &str, task: Task) -> Result<Task, TaskError> {
        self.repository.update(id, task).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), TaskError> {
        self.repository.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{MockTaskRepository, Mutation};
    use mockall::predicate::*;

    const TASK_ID: &str = "5d1f0c1e-2a47-4b8e-9d55-0c4f6f7b8a90";

    fn service(repository: MockTaskRepository) -> TaskService {
        TaskService::new(Arc::new(repository))
    }

    #[tokio::test]
    async fn fetch_delegates_to_repository() {
        let mut repository = MockTaskRepository::new();
        let filter = Filter::default();
        repository
            .expect_fetch()
            .with(eq(filter.clone()))
            .times(1)
            .returning(|_| {
                Ok(Tasks::new(
                    vec![
                        Task::new("title 1", "description 1"),
                        Task::new("title 2", "description 2"),
                    ],
                    2,
                ))
            });

        let tasks = service(repository).fetch(&filter).await.unwrap();

        assert_eq!(tasks.total, 2);
        assert_eq!(tasks.data[1].title, "title 2");
    }

    #[tokio::test]
    async fn fetch_passes_errors_through() {
        let mut repository = MockTaskRepository::new();
        repository
            .expect_fetch()
            .times(1)
            .returning(|_| Err(TaskError::QueryExecution));

        let result = service(repository).fetch(&Filter::default()).await;

        assert_eq!(result, Err(TaskError::QueryExecution));
    }

    #[tokio::test]
    async fn get_by_id_delegates_to_repository() {
        let mut repository = MockTaskRepository::new();
        repository
            .expect_get_by_id()
            .with(eq(TASK_ID))
            .times(1)
            .returning(|_| Ok(Task::new("title", "description")));

        let task = service(repository).get_by_id(TASK_ID).await.unwrap();

        assert_eq!(task.title, "title");
    }

    #[tokio::test]
    async fn get_by_id_passes_errors_through() {
        let mut repository = MockTaskRepository::new();
        repository
            .expect_get_by_id()
            .times(1)
            .returning(|_| Err(TaskError::NotFound));

        let result = service(repository).get_by_id(TASK_ID).await;

        assert_eq!(result, Err(TaskError::NotFound));
    }

    #[tokio::test]
    async fn insert_delegates_to_repository() {
        let mut repository = MockTaskRepository::new();
        repository
            .expect_insert()
            .with(eq(Task::new("t001", "td00001")))
            .times(1)
            .returning(Ok);

        let task = service(repository)
            .insert(Task::new("t001", "td00001"))
            .await
            .unwrap();

        assert_eq!(task, Task::new("t001", "td00001"));
    }

    #[tokio::test]
    async fn insert_passes_errors_through() {
        let mut repository = MockTaskRepository::new();
        repository
            .expect_insert()
            .times(1)
            .returning(|_| Err(TaskError::Conflict(Mutation::Insert)));

        let result = service(repository).insert(Task::new("t", "d")).await;

        assert_eq!(result, Err(TaskError::Conflict(Mutation::Insert)));
    }

    #[tokio::test]
    async fn update_delegates_to_repository() {
        let mut repository = MockTaskRepository::new();
        repository
            .expect_update()
            .with(eq(TASK_ID), eq(Task::new("t", "d")))
            .times(1)
            .returning(|_, task| Ok(task));

        let task = service(repository)
            .update(TASK_ID, Task::new("t", "d"))
            .await
            .unwrap();

        assert_eq!(task.description, "d");
    }

    #[tokio::test]
    async fn update_passes_errors_through() {
        let mut repository = MockTaskRepository::new();
        repository
            .expect_update()
            .times(1)
            .returning(|_, _| Err(TaskError::InvalidIdentifier));

        let result = service(repository).update("nope", Task::new("t", "d")).await;

        assert_eq!(result, Err(TaskError::InvalidIdentifier));
    }

    #[tokio::test]
    async fn delete_delegates_to_repository() {
        let mut repository = MockTaskRepository::new();
        repository
            .expect_delete()
            .with(eq(TASK_ID))
            .times(1)
            .returning(|_| Ok(()));

        assert_eq!(service(repository).delete(TASK_ID).await, Ok(()));
    }

    #[tokio::test]
    async fn delete_passes_errors_through() {
        let mut repository = MockTaskRepository::new();
        repository
            .expect_delete()
            .times(1)
            .returning(|_| Err(TaskError::Conflict(Mutation::Delete)));

        let result = service(repository).delete(TASK_ID).await;

        assert_eq!(result, Err(TaskError::Conflict(Mutation::Delete)));
    }
}
