//! Position store contract and SQLite implementation.
//!
//! This is the persistence boundary consumed by the ordering engine: it
//! moves (task, key) pairs and nothing else.
//!
//! # Responsibility
//! - Read and write position key assignments for one job's task list.
//! - Keep batch replacement atomic at the storage layer.
//!
//! # Invariants
//! - `read_all` returns pairs in deterministic `position ASC, task_uuid ASC`
//!   order and re-validates every persisted key.
//! - `write_many` replaces a job's whole pair set or changes nothing.
//!
//! # See also
//! - docs/architecture/ordering.md

use crate::model::position::PositionKey;
use crate::model::task::{JobId, TaskId};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

/// Persistence boundary for position key assignments.
pub trait PositionStore {
    /// Reads every (task, key) pair of one job in ascending key order.
    fn read_all(&self, job_uuid: JobId) -> RepoResult<Vec<(TaskId, PositionKey)>>;
    /// Writes one task's key, inserting or replacing its assignment.
    fn write(&self, job_uuid: JobId, task_uuid: TaskId, key: &PositionKey) -> RepoResult<()>;
    /// Replaces the whole pair set of one job. All-or-nothing: a partial
    /// failure must leave the previous set untouched.
    fn write_many(&self, job_uuid: JobId, entries: &[(TaskId, PositionKey)]) -> RepoResult<()>;
    /// Removes one task's assignment (task deletion).
    fn remove(&self, job_uuid: JobId, task_uuid: TaskId) -> RepoResult<()>;
}

/// SQLite-backed position store.
pub struct SqlitePositionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePositionRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "task_positions",
            &["task_uuid", "job_uuid", "position", "updated_at"],
        )?;
        Ok(Self { conn })
    }
}

impl PositionStore for SqlitePositionRepository<'_> {
    fn read_all(&self, job_uuid: JobId) -> RepoResult<Vec<(TaskId, PositionKey)>> {
        let mut stmt = self.conn.prepare(
            "SELECT task_uuid, position
             FROM task_positions
             WHERE job_uuid = ?1
             ORDER BY position ASC, task_uuid ASC;",
        )?;
        let mut rows = stmt.query([job_uuid.to_string()])?;

        let mut pairs = Vec::new();
        while let Some(row) = rows.next()? {
            let task_text: String = row.get(0)?;
            let key_text: String = row.get(1)?;
            let task = parse_uuid(&task_text, "task_positions.task_uuid")?;
            let key = PositionKey::parse(&key_text).map_err(|err| {
                RepoError::InvalidData(format!(
                    "invalid position key `{key_text}` in task_positions.position: {err}"
                ))
            })?;
            pairs.push((task, key));
        }
        Ok(pairs)
    }

    fn write(&self, job_uuid: JobId, task_uuid: TaskId, key: &PositionKey) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO task_positions (task_uuid, job_uuid, position)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(task_uuid) DO UPDATE SET
                position = excluded.position,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![task_uuid.to_string(), job_uuid.to_string(), key.as_str()],
        )?;
        Ok(())
    }

    fn write_many(&self, job_uuid: JobId, entries: &[(TaskId, PositionKey)]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM task_positions WHERE job_uuid = ?1;",
            [job_uuid.to_string()],
        )?;
        for (task_uuid, key) in entries {
            tx.execute(
                "INSERT INTO task_positions (task_uuid, job_uuid, position)
                 VALUES (?1, ?2, ?3);",
                params![task_uuid.to_string(), job_uuid.to_string(), key.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, job_uuid: JobId, task_uuid: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM task_positions
             WHERE task_uuid = ?1
               AND job_uuid = ?2;",
            params![task_uuid.to_string(), job_uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(task_uuid));
        }
        Ok(())
    }
}
