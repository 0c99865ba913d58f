//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `tasks` storage.
//! - Join position assignments for ordered list reads.
//!
//! # Invariants
//! - Write paths must call `Task::validate()` before SQL mutations.
//! - Ordered reads sort by `position ASC, uuid ASC` and skip tombstones.

use crate::model::position::PositionKey;
use crate::model::task::{JobId, Task, TaskId, TaskStatus};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool_column, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    job_uuid,
    title,
    status,
    is_deleted
FROM tasks";

/// Read model pairing a task with its assigned position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedTask {
    pub task: Task,
    pub position: PositionKey,
}

/// Repository interface for task CRUD operations.
pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<Task>>;
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn soft_delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Lists one job's active tasks in visible order.
    fn list_job_tasks(&self, job_uuid: JobId) -> RepoResult<Vec<PositionedTask>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "tasks",
            &[
                "uuid",
                "job_uuid",
                "title",
                "status",
                "is_deleted",
                "created_at",
                "updated_at",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (
                uuid,
                job_uuid,
                title,
                status,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                task.uuid.to_string(),
                task.job_uuid.to_string(),
                task.title.as_str(),
                task_status_to_db(task.status),
                bool_to_int(task.is_deleted),
            ],
        )?;

        Ok(task.uuid)
    }

    fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?1,
                status = ?2,
                is_deleted = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?4;",
            params![
                task.title.as_str(),
                task_status_to_db(task.status),
                bool_to_int(task.is_deleted),
                task.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(task.uuid));
        }
        Ok(())
    }

    fn soft_delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn list_job_tasks(&self, job_uuid: JobId) -> RepoResult<Vec<PositionedTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                t.uuid AS uuid,
                t.job_uuid AS job_uuid,
                t.title AS title,
                t.status AS status,
                t.is_deleted AS is_deleted,
                p.position AS position
             FROM tasks t
             INNER JOIN task_positions p ON p.task_uuid = t.uuid
             WHERE t.job_uuid = ?1
               AND t.is_deleted = 0
             ORDER BY p.position ASC, t.uuid ASC;",
        )?;
        let mut rows = stmt.query([job_uuid.to_string()])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let task = parse_task_row(row)?;
            let key_text: String = row.get("position")?;
            let position = PositionKey::parse(&key_text).map_err(|err| {
                RepoError::InvalidData(format!(
                    "invalid position key `{key_text}` in task_positions.position: {err}"
                ))
            })?;
            items.push(PositionedTask { task, position });
        }
        Ok(items)
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "tasks.uuid")?;

    let job_text: String = row.get("job_uuid")?;
    let job_uuid = parse_uuid(&job_text, "tasks.job_uuid")?;

    let status_text: String = row.get("status")?;
    let status = parse_task_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;

    let is_deleted = parse_bool_column(row.get("is_deleted")?, "tasks.is_deleted")?;

    let task = Task {
        uuid,
        job_uuid,
        title: row.get("title")?,
        status,
        is_deleted,
    };
    task.validate()?;
    Ok(task)
}

fn task_status_to_db(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Done => "done",
    }
}

fn parse_task_status(value: &str) -> Option<TaskStatus> {
    match value {
        "todo" => Some(TaskStatus::Todo),
        "in_progress" => Some(TaskStatus::InProgress),
        "done" => Some(TaskStatus::Done),
        _ => None,
    }
}
