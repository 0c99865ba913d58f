//! Use-case services over the repository layer.
//!
//! # Responsibility
//! - Provide stable entry points for core callers.
//! - Keep business invariants above storage details.
//!
//! # Invariants
//! - Services never bypass repository validation/persistence contracts.
//! - The service layer remains storage-agnostic.

pub mod job_service;
pub mod list_service;
pub mod task_service;
