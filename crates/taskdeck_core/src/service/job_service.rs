//! Job use-case service.
//!
//! # Responsibility
//! - Provide stable job CRUD entry points for core callers.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.

use crate::model::task::{Job, JobId};
use crate::repo::job_repo::JobRepository;
use crate::repo::RepoResult;

/// Use-case service wrapper for job CRUD operations.
pub struct JobService<R: JobRepository> {
    repo: R,
}

impl<R: JobRepository> JobService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a new job.
    pub fn create_job(&self, name: impl Into<String>) -> RepoResult<Job> {
        let job = Job::new(name.into().trim().to_string());
        self.repo.create_job(&job)?;
        Ok(job)
    }

    /// Gets one job by ID with optional deleted-row visibility.
    pub fn get_job(&self, id: JobId, include_deleted: bool) -> RepoResult<Option<Job>> {
        self.repo.get_job(id, include_deleted)
    }

    /// Renames one job.
    pub fn rename_job(&self, id: JobId, name: impl Into<String>) -> RepoResult<()> {
        self.repo.rename_job(id, name.into().trim())
    }

    /// Soft-deletes one job. Its tasks keep their rows and tombstones.
    pub fn soft_delete_job(&self, id: JobId) -> RepoResult<()> {
        self.repo.soft_delete_job(id)
    }

    /// Lists jobs in creation order.
    pub fn list_jobs(&self, include_deleted: bool) -> RepoResult<Vec<Job>> {
        self.repo.list_jobs(include_deleted)
    }
}
