//! Task use-case service.
//!
//! # Responsibility
//! - Provide stable task CRUD entry points for core callers.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Ordering is owned by the list service; this service never touches
//!   position keys.

use crate::model::task::{JobId, Task, TaskId, TaskStatus};
use crate::repo::task_repo::{PositionedTask, TaskRepository};
use crate::repo::{RepoError, RepoResult};

/// Use-case service wrapper for task CRUD operations.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a task in `job` with status `todo`.
    ///
    /// The new task is not yet part of the job's visible order; callers
    /// place it through the list service afterwards.
    pub fn create_task(&self, job_uuid: JobId, title: impl Into<String>) -> RepoResult<Task> {
        let task = Task::new(job_uuid, title.into().trim().to_string());
        self.repo.create_task(&task)?;
        Ok(task)
    }

    /// Gets one task by ID with optional deleted-row visibility.
    pub fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<Task>> {
        self.repo.get_task(id, include_deleted)
    }

    /// Renames one task.
    pub fn rename_task(&self, id: TaskId, title: impl Into<String>) -> RepoResult<()> {
        let mut task = self
            .repo
            .get_task(id, false)?
            .ok_or(RepoError::NotFound(id))?;
        task.title = title.into().trim().to_string();
        self.repo.update_task(&task)
    }

    /// Updates one task's lifecycle status.
    pub fn set_status(&self, id: TaskId, status: TaskStatus) -> RepoResult<()> {
        let mut task = self
            .repo
            .get_task(id, false)?
            .ok_or(RepoError::NotFound(id))?;
        task.status = status;
        self.repo.update_task(&task)
    }

    /// Soft-deletes one task.
    ///
    /// Callers also remove the task from the list service so its position
    /// assignment is released.
    pub fn soft_delete_task(&self, id: TaskId) -> RepoResult<()> {
        self.repo.soft_delete_task(id)
    }

    /// Lists one job's active tasks in visible order.
    pub fn list_job_tasks(&self, job_uuid: JobId) -> RepoResult<Vec<PositionedTask>> {
        self.repo.list_job_tasks(job_uuid)
    }
}
