//! Ordered task list use-case service.
//!
//! # Responsibility
//! - Expose insert/append/move/remove/load entry points for one writer.
//! - Keep the in-memory order and the position store consistent.
//!
//! # Invariants
//! - Every mutation computes its neighbors from the latest in-memory order.
//! - A failed store write rolls the in-memory change back.
//! - Rebalance either persists every new key or changes nothing.
//! - A load superseded by a newer load is discarded, never applied.
//!
//! # See also
//! - docs/architecture/ordering.md

use crate::model::position::PositionKey;
use crate::model::task::{JobId, TaskId};
use crate::order::allocator::{self, AllocatorError, RebalancePolicy};
use crate::order::list::{OrderEntry, OrderError, TaskOrder};
use crate::repo::position_repo::PositionStore;
use crate::repo::RepoError;
use log::{info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from ordered list operations.
#[derive(Debug)]
pub enum ListServiceError {
    /// Referenced task is not part of the job order.
    TaskNotFound(TaskId),
    /// Referenced anchor task is not part of the job order.
    AnchorNotFound(TaskId),
    /// Task is already part of the job order.
    DuplicateTask(TaskId),
    /// A task cannot anchor its own move.
    SelfAnchor(TaskId),
    /// Persisted or supplied order pairs are corrupt (tied keys or ids).
    CorruptOrder(OrderError),
    /// Allocator rejected the computed bounds.
    Allocator(AllocatorError),
    /// Position store failure; the in-memory order was left unchanged.
    Store(RepoError),
}

impl Display for ListServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(task) => write!(f, "task not found in job order: {task}"),
            Self::AnchorNotFound(task) => {
                write!(f, "anchor task not found in job order: {task}")
            }
            Self::DuplicateTask(task) => {
                write!(f, "task already present in job order: {task}")
            }
            Self::SelfAnchor(task) => write!(f, "task cannot anchor its own move: {task}"),
            Self::CorruptOrder(err) => write!(f, "order state is corrupt: {err}"),
            Self::Allocator(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ListServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CorruptOrder(err) => Some(err),
            Self::Allocator(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OrderError> for ListServiceError {
    fn from(value: OrderError) -> Self {
        match value {
            OrderError::TaskNotFound(task) => Self::TaskNotFound(task),
            OrderError::AnchorNotFound(task) => Self::AnchorNotFound(task),
            OrderError::DuplicateTask(task) => Self::DuplicateTask(task),
            other => Self::CorruptOrder(other),
        }
    }
}

impl From<AllocatorError> for ListServiceError {
    fn from(value: AllocatorError) -> Self {
        Self::Allocator(value)
    }
}

impl From<RepoError> for ListServiceError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Outcome of applying a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The loaded pairs became the authoritative order.
    Applied,
    /// A newer load started after this one; its result was discarded.
    Superseded,
}

/// Claim on one reload of a job order.
///
/// Tickets make reloads supersede each other: only the most recently
/// issued ticket for a job can still apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    job: JobId,
    generation: u64,
}

impl LoadTicket {
    pub fn job(&self) -> JobId {
        self.job
    }
}

#[derive(Debug, Default)]
struct JobList {
    order: TaskOrder,
    load_generation: u64,
}

/// Single-writer ordering service over one position store.
///
/// The service owns the authoritative in-memory order of every job it has
/// touched. Persisted jobs are loaded (`load_job`) before their first
/// mutation; from then on the in-memory order is authoritative and every
/// mutation is computed against it. All mutations go through `&mut self`,
/// which serializes the key space of each container; callers that share
/// the service across threads wrap it in their own per-container lock
/// rather than locking the whole application.
pub struct ListService<S: PositionStore> {
    store: S,
    policy: RebalancePolicy,
    jobs: HashMap<JobId, JobList>,
}

impl<S: PositionStore> ListService<S> {
    /// Creates a service with the default rebalance policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, RebalancePolicy::default())
    }

    /// Creates a service with an explicit rebalance policy.
    pub fn with_policy(store: S, policy: RebalancePolicy) -> Self {
        Self {
            store,
            policy,
            jobs: HashMap::new(),
        }
    }

    /// Inserts `task` immediately after `anchor`, or at the list head for
    /// `None`.
    ///
    /// Successive inserts after the same anchor each land directly behind
    /// it, so the newest insertion sits closest to the anchor. The key is
    /// applied in memory first, then persisted; a failed write rolls the
    /// insert back and is reported.
    pub fn insert_after(
        &mut self,
        job: JobId,
        task: TaskId,
        anchor: Option<TaskId>,
    ) -> Result<PositionKey, ListServiceError> {
        let list = self.jobs.entry(job).or_default();
        let key = {
            let (low, high) = list.order.bounds_after(anchor)?;
            allocator::key_between(low, high)?
        };
        list.order.insert(task, key.clone())?;
        if let Err(err) = self.store.write(job, task, &key) {
            let _ = list.order.remove(task);
            return Err(err.into());
        }
        self.rebalance_if_needed(job, &key);
        Ok(key)
    }

    /// Appends `task` at the end of the job's list.
    pub fn append(&mut self, job: JobId, task: TaskId) -> Result<PositionKey, ListServiceError> {
        let anchor = self
            .jobs
            .get(&job)
            .and_then(|list| list.order.last_task());
        self.insert_after(job, task, anchor)
    }

    /// Moves `task` immediately after `anchor` (or to the head for `None`).
    ///
    /// The task receives a fresh key as if freshly inserted; the old key
    /// is discarded. A failed write restores the previous assignment.
    pub fn move_after(
        &mut self,
        job: JobId,
        task: TaskId,
        anchor: Option<TaskId>,
    ) -> Result<PositionKey, ListServiceError> {
        if anchor == Some(task) {
            return Err(ListServiceError::SelfAnchor(task));
        }
        let list = match self.jobs.get_mut(&job) {
            Some(list) => list,
            None => return Err(ListServiceError::TaskNotFound(task)),
        };

        let old_key = list.order.remove(task)?;
        let key = match list.order.bounds_after(anchor) {
            Ok((low, high)) => match allocator::key_between(low, high) {
                Ok(key) => key,
                Err(err) => {
                    let _ = list.order.insert(task, old_key);
                    return Err(err.into());
                }
            },
            Err(err) => {
                let _ = list.order.insert(task, old_key);
                return Err(err.into());
            }
        };
        if let Err(err) = list.order.insert(task, key.clone()) {
            let _ = list.order.insert(task, old_key);
            return Err(err.into());
        }
        if let Err(err) = self.store.write(job, task, &key) {
            let _ = list.order.remove(task);
            let _ = list.order.insert(task, old_key);
            return Err(err.into());
        }
        self.rebalance_if_needed(job, &key);
        Ok(key)
    }

    /// Removes `task` from the job's list (task deletion).
    pub fn remove(&mut self, job: JobId, task: TaskId) -> Result<(), ListServiceError> {
        let list = match self.jobs.get_mut(&job) {
            Some(list) => list,
            None => return Err(ListServiceError::TaskNotFound(task)),
        };
        let old_key = list.order.remove(task)?;
        if let Err(err) = self.store.remove(job, task) {
            let _ = list.order.insert(task, old_key);
            return Err(err.into());
        }
        Ok(())
    }

    /// Claims a reload of `job`, superseding any load still in flight.
    pub fn begin_load(&mut self, job: JobId) -> LoadTicket {
        let list = self.jobs.entry(job).or_default();
        list.load_generation += 1;
        LoadTicket {
            job,
            generation: list.load_generation,
        }
    }

    /// Applies the pairs read for `ticket`, unless a newer load claimed
    /// the job in the meantime.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        pairs: Vec<(TaskId, PositionKey)>,
    ) -> Result<LoadOutcome, ListServiceError> {
        let list = match self.jobs.get_mut(&ticket.job) {
            Some(list) => list,
            None => return Ok(LoadOutcome::Superseded),
        };
        if ticket.generation != list.load_generation {
            return Ok(LoadOutcome::Superseded);
        }
        list.order = TaskOrder::from_pairs(pairs).map_err(ListServiceError::CorruptOrder)?;
        Ok(LoadOutcome::Applied)
    }

    /// Reads all persisted pairs and rebuilds the job order from them.
    ///
    /// Loading twice without intervening writes yields the same sequence.
    pub fn load_job(&mut self, job: JobId) -> Result<Vec<TaskId>, ListServiceError> {
        let pairs = self.store.read_all(job)?;
        let ticket = self.begin_load(job);
        self.complete_load(ticket, pairs)?;
        Ok(self.sequence(job))
    }

    /// Task ids of `job` in visible order. Empty for untouched jobs.
    pub fn sequence(&self, job: JobId) -> Vec<TaskId> {
        self.jobs
            .get(&job)
            .map(|list| list.order.sequence())
            .unwrap_or_default()
    }

    /// Current key of one task, if present in the job order.
    pub fn key_of(&self, job: JobId, task: TaskId) -> Option<&PositionKey> {
        self.jobs.get(&job).and_then(|list| list.order.key_of(task))
    }

    /// Recomputes evenly spaced keys for the whole job list.
    ///
    /// The new keys are persisted with an all-or-nothing batch write; the
    /// in-memory order adopts them only after the write commits, so both
    /// sides always match whichever outcome the store reports. Returns
    /// the number of rewritten assignments.
    pub fn rebalance(&mut self, job: JobId) -> Result<usize, ListServiceError> {
        let list = match self.jobs.get_mut(&job) {
            Some(list) => list,
            None => return Ok(0),
        };
        let sequence = list.order.sequence();
        let keys = allocator::spread(sequence.len());
        let entries: Vec<(TaskId, PositionKey)> =
            sequence.into_iter().zip(keys).collect();

        self.store.write_many(job, &entries)?;
        list.order.replace_all(
            entries
                .into_iter()
                .map(|(task, key)| OrderEntry { task, key })
                .collect(),
        );
        Ok(list.order.len())
    }

    /// Policy hook run after successful mutations.
    ///
    /// A failed rebalance is fatal only to the rebalance attempt; the
    /// mutation that triggered it already committed, so it is logged and
    /// not propagated.
    fn rebalance_if_needed(&mut self, job: JobId, assigned: &PositionKey) {
        if !self.policy.needs_rebalance(assigned) {
            return;
        }
        match self.rebalance(job) {
            Ok(count) => info!(
                "event=order_rebalance module=order status=ok job={job} tasks={count}"
            ),
            Err(err) => warn!(
                "event=order_rebalance module=order status=error job={job} error={err}"
            ),
        }
    }
}
