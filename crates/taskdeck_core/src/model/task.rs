//! Job and task domain records.
//!
//! # Responsibility
//! - Define the canonical job/task records shared by core business logic.
//! - Provide lifecycle helpers for soft-delete semantics.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another record.
//! - `is_deleted` is the source of truth for tombstone state.
//! - Titles and job names must not be blank after trimming.
//!
//! # See also
//! - docs/architecture/data-model.md

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one task.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type TaskId = Uuid;

/// Stable identifier for one job (the container owning one task list).
pub type JobId = Uuid;

/// Validation errors for job/task write models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Task title is blank after trim.
    BlankTaskTitle,
    /// Job name is blank after trim.
    BlankJobName,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTaskTitle => write!(f, "task title must not be blank"),
            Self::BlankJobName => write!(f, "job name must not be blank"),
        }
    }
}

impl Error for ValidationError {}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    Todo,
    /// Work is in progress.
    InProgress,
    /// Completed.
    Done,
}

/// Canonical task record.
///
/// The task's place in its job list is not stored here; it derives from
/// the position key assigned by the ordering engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable global ID used for ordering, linking and auditing.
    pub uuid: TaskId,
    /// Owning job.
    pub job_uuid: JobId,
    /// User-facing task title.
    pub title: String,
    /// Lifecycle state.
    pub status: TaskStatus,
    /// Soft delete tombstone.
    pub is_deleted: bool,
}

impl Task {
    /// Creates a new task with a generated stable ID and status `todo`.
    pub fn new(job_uuid: JobId, title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), job_uuid, title)
    }

    /// Creates a new task with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(uuid: TaskId, job_uuid: JobId, title: impl Into<String>) -> Self {
        Self {
            uuid,
            job_uuid,
            title: title.into(),
            status: TaskStatus::Todo,
            is_deleted: false,
        }
    }

    /// Checks write-model invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::BlankTaskTitle);
        }
        Ok(())
    }

    /// Marks this task as softly deleted (tombstoned).
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Clears the soft delete flag.
    pub fn restore(&mut self) {
        self.is_deleted = false;
    }

    /// Returns whether this task should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

/// Canonical job record. A job owns exactly one ordered task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Stable global ID.
    pub uuid: JobId,
    /// User-facing job name.
    pub name: String,
    /// Soft delete tombstone.
    pub is_deleted: bool,
}

impl Job {
    /// Creates a new job with a generated stable ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a new job with a caller-provided stable ID.
    pub fn with_id(uuid: JobId, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            is_deleted: false,
        }
    }

    /// Checks write-model invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankJobName);
        }
        Ok(())
    }

    /// Marks this job as softly deleted (tombstoned).
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Returns whether this job should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}
