//! Job repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over canonical `jobs` storage.
//!
//! # Invariants
//! - Write paths must call `Job::validate()` before SQL mutations.
//! - Only active (`is_deleted=0`) jobs are returned by default.

use crate::model::task::{Job, JobId, ValidationError};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool_column, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const JOB_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    is_deleted
FROM jobs";

/// Repository interface for job CRUD operations.
pub trait JobRepository {
    fn create_job(&self, job: &Job) -> RepoResult<JobId>;
    fn get_job(&self, id: JobId, include_deleted: bool) -> RepoResult<Option<Job>>;
    fn rename_job(&self, id: JobId, name: &str) -> RepoResult<()>;
    fn soft_delete_job(&self, id: JobId) -> RepoResult<()>;
    fn list_jobs(&self, include_deleted: bool) -> RepoResult<Vec<Job>>;
}

/// SQLite-backed job repository.
pub struct SqliteJobRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteJobRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "jobs",
            &["uuid", "name", "is_deleted", "created_at", "updated_at"],
        )?;
        Ok(Self { conn })
    }
}

impl JobRepository for SqliteJobRepository<'_> {
    fn create_job(&self, job: &Job) -> RepoResult<JobId> {
        job.validate()?;

        self.conn.execute(
            "INSERT INTO jobs (uuid, name, is_deleted) VALUES (?1, ?2, ?3);",
            params![
                job.uuid.to_string(),
                job.name.as_str(),
                bool_to_int(job.is_deleted),
            ],
        )?;
        Ok(job.uuid)
    }

    fn get_job(&self, id: JobId, include_deleted: bool) -> RepoResult<Option<Job>> {
        let mut stmt = self.conn.prepare(&format!(
            "{JOB_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_job_row(row)?));
        }
        Ok(None)
    }

    fn rename_job(&self, id: JobId, name: &str) -> RepoResult<()> {
        if name.trim().is_empty() {
            return Err(ValidationError::BlankJobName.into());
        }

        let changed = self.conn.execute(
            "UPDATE jobs
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![id.to_string(), name],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn soft_delete_job(&self, id: JobId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE jobs
             SET is_deleted = 1,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn list_jobs(&self, include_deleted: bool) -> RepoResult<Vec<Job>> {
        let sql = if include_deleted {
            format!("{JOB_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;")
        } else {
            format!("{JOB_SELECT_SQL} WHERE is_deleted = 0 ORDER BY created_at ASC, uuid ASC;")
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut jobs = Vec::new();
        while let Some(row) = rows.next()? {
            jobs.push(parse_job_row(row)?);
        }
        Ok(jobs)
    }
}

fn parse_job_row(row: &Row<'_>) -> RepoResult<Job> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "jobs.uuid")?;
    let is_deleted = parse_bool_column(row.get("is_deleted")?, "jobs.is_deleted")?;

    let job = Job {
        uuid,
        name: row.get("name")?,
        is_deleted,
    };
    job.validate()?;
    Ok(job)
}
