//! Domain model for jobs, tasks, and their ordering keys.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep position-key validation next to the key representation.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Deletion is represented by soft-delete tombstones, not hard delete.
//! - A task's place in its job list derives solely from its position key.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod position;
pub mod task;
