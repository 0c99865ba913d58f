//! In-memory authoritative order of one job's task list.
//!
//! # Responsibility
//! - Keep the sorted (task, key) sequence and answer neighbor queries.
//! - Rebuild the order from persisted pairs and reject corrupt input.
//!
//! # Invariants
//! - Entries are always sorted ascending by position key.
//! - No two entries share a task id or a position key.

use crate::model::position::PositionKey;
use crate::model::task::TaskId;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from in-memory order manipulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Referenced task is not part of the order.
    TaskNotFound(TaskId),
    /// Referenced anchor task is not part of the order.
    AnchorNotFound(TaskId),
    /// Task is already part of the order.
    DuplicateTask(TaskId),
    /// Key is already assigned to another task; ties are not a legal state.
    DuplicateKey { key: PositionKey, task: TaskId },
}

impl Display for OrderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(task) => write!(f, "task not in order: {task}"),
            Self::AnchorNotFound(task) => write!(f, "anchor task not in order: {task}"),
            Self::DuplicateTask(task) => write!(f, "task already in order: {task}"),
            Self::DuplicateKey { key, task } => {
                write!(f, "position key `{key}` already assigned; task {task} would tie")
            }
        }
    }
}

impl Error for OrderError {}

/// One (task, key) assignment within a job order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEntry {
    pub task: TaskId,
    pub key: PositionKey,
}

/// Sorted in-memory order of one job's tasks.
///
/// The sequence obtained by walking entries ascending by key is exactly
/// the user-visible order and is reproducible from persisted state alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOrder {
    entries: Vec<OrderEntry>,
}

impl TaskOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the order from persisted (task, key) pairs.
    ///
    /// Pairs are sorted ascending by key; input order does not matter, so
    /// loading the same pairs twice yields the same visible order.
    ///
    /// # Errors
    /// - `DuplicateKey` / `DuplicateTask` when persisted pairs collide;
    ///   that is corrupt data, not a legal state.
    pub fn from_pairs(pairs: Vec<(TaskId, PositionKey)>) -> Result<Self, OrderError> {
        let mut entries: Vec<OrderEntry> = pairs
            .into_iter()
            .map(|(task, key)| OrderEntry { task, key })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.task.cmp(&b.task)));

        for pair in entries.windows(2) {
            if pair[0].key == pair[1].key {
                return Err(OrderError::DuplicateKey {
                    key: pair[1].key.clone(),
                    task: pair[1].task,
                });
            }
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.task) {
                return Err(OrderError::DuplicateTask(entry.task));
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Task ids in visible order.
    pub fn sequence(&self) -> Vec<TaskId> {
        self.entries.iter().map(|entry| entry.task).collect()
    }

    /// Entries in visible order.
    pub fn entries(&self) -> &[OrderEntry] {
        &self.entries
    }

    /// Current key of one task, if present.
    pub fn key_of(&self, task: TaskId) -> Option<&PositionKey> {
        self.slot_of(task).map(|slot| &self.entries[slot].key)
    }

    /// Id of the last task in the order, if any.
    pub fn last_task(&self) -> Option<TaskId> {
        self.entries.last().map(|entry| entry.task)
    }

    /// Key bounds for inserting immediately after `anchor`.
    ///
    /// `None` anchors the insert at the list head. The returned pair is
    /// (anchor key, key of the anchor's current successor), with `None`
    /// standing for the open ends of the key space.
    pub fn bounds_after(
        &self,
        anchor: Option<TaskId>,
    ) -> Result<(Option<&PositionKey>, Option<&PositionKey>), OrderError> {
        match anchor {
            None => Ok((None, self.entries.first().map(|entry| &entry.key))),
            Some(anchor) => {
                let slot = self
                    .slot_of(anchor)
                    .ok_or(OrderError::AnchorNotFound(anchor))?;
                Ok((
                    Some(&self.entries[slot].key),
                    self.entries.get(slot + 1).map(|entry| &entry.key),
                ))
            }
        }
    }

    /// Inserts one assignment, keeping entries sorted.
    pub fn insert(&mut self, task: TaskId, key: PositionKey) -> Result<(), OrderError> {
        if self.slot_of(task).is_some() {
            return Err(OrderError::DuplicateTask(task));
        }
        let slot = match self
            .entries
            .binary_search_by(|entry| entry.key.cmp(&key))
        {
            Ok(_) => return Err(OrderError::DuplicateKey { key, task }),
            Err(slot) => slot,
        };
        self.entries.insert(slot, OrderEntry { task, key });
        Ok(())
    }

    /// Removes one task and returns its key.
    ///
    /// The returned key lets callers restore the previous assignment when
    /// a persistence write fails after the in-memory change.
    pub fn remove(&mut self, task: TaskId) -> Result<PositionKey, OrderError> {
        let slot = self.slot_of(task).ok_or(OrderError::TaskNotFound(task))?;
        Ok(self.entries.remove(slot).key)
    }

    /// Replaces every assignment at once after a rebalance.
    ///
    /// `entries` must already be sorted ascending by key.
    pub(crate) fn replace_all(&mut self, entries: Vec<OrderEntry>) {
        debug_assert!(entries.windows(2).all(|pair| pair[0].key < pair[1].key));
        self.entries = entries;
    }

    fn slot_of(&self, task: TaskId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.task == task)
    }
}

#[cfg(test)]
mod tests {
    use super::{OrderError, TaskOrder};
    use crate::model::position::PositionKey;
    use crate::model::task::TaskId;
    use uuid::Uuid;

    fn key(value: &str) -> PositionKey {
        PositionKey::parse(value).unwrap()
    }

    fn task() -> TaskId {
        Uuid::new_v4()
    }

    #[test]
    fn insert_keeps_entries_sorted_by_key() {
        let mut order = TaskOrder::new();
        let (a, b, c) = (task(), task(), task());
        order.insert(b, key("i")).unwrap();
        order.insert(a, key("5")).unwrap();
        order.insert(c, key("r")).unwrap();
        assert_eq!(order.sequence(), vec![a, b, c]);
    }

    #[test]
    fn insert_rejects_duplicate_task_and_key() {
        let mut order = TaskOrder::new();
        let a = task();
        order.insert(a, key("i")).unwrap();

        let err = order.insert(a, key("r")).unwrap_err();
        assert_eq!(err, OrderError::DuplicateTask(a));

        let b = task();
        let err = order.insert(b, key("i")).unwrap_err();
        assert!(matches!(err, OrderError::DuplicateKey { .. }));
    }

    #[test]
    fn bounds_after_reports_anchor_and_successor() {
        let mut order = TaskOrder::new();
        let (a, b) = (task(), task());
        order.insert(a, key("5")).unwrap();
        order.insert(b, key("i")).unwrap();

        let (low, high) = order.bounds_after(Some(a)).unwrap();
        assert_eq!(low.unwrap().as_str(), "5");
        assert_eq!(high.unwrap().as_str(), "i");

        let (low, high) = order.bounds_after(None).unwrap();
        assert!(low.is_none());
        assert_eq!(high.unwrap().as_str(), "5");

        let (low, high) = order.bounds_after(Some(b)).unwrap();
        assert_eq!(low.unwrap().as_str(), "i");
        assert!(high.is_none());
    }

    #[test]
    fn bounds_after_unknown_anchor_fails() {
        let order = TaskOrder::new();
        let ghost = task();
        let err = order.bounds_after(Some(ghost)).unwrap_err();
        assert_eq!(err, OrderError::AnchorNotFound(ghost));
    }

    #[test]
    fn remove_returns_previous_key() {
        let mut order = TaskOrder::new();
        let a = task();
        order.insert(a, key("i")).unwrap();
        let removed = order.remove(a).unwrap();
        assert_eq!(removed.as_str(), "i");
        assert!(order.is_empty());
    }

    #[test]
    fn from_pairs_sorts_and_is_idempotent() {
        let (a, b, c) = (task(), task(), task());
        let pairs = vec![(c, key("r")), (a, key("5")), (b, key("i"))];
        let first = TaskOrder::from_pairs(pairs.clone()).unwrap();
        let second = TaskOrder::from_pairs(pairs).unwrap();
        assert_eq!(first.sequence(), vec![a, b, c]);
        assert_eq!(first, second);
    }

    #[test]
    fn from_pairs_rejects_tied_keys() {
        let pairs = vec![(task(), key("i")), (task(), key("i"))];
        let err = TaskOrder::from_pairs(pairs).unwrap_err();
        assert!(matches!(err, OrderError::DuplicateKey { .. }));
    }

    #[test]
    fn from_pairs_rejects_duplicate_task() {
        let a = task();
        let pairs = vec![(a, key("5")), (a, key("i"))];
        let err = TaskOrder::from_pairs(pairs).unwrap_err();
        assert_eq!(err, OrderError::DuplicateTask(a));
    }
}
