//! Pluggable pool sizing and eviction policy
//!
//! A `PoolStrategy` never touches resources itself: it answers each pool
//! request with an instruction and is later told how the pool fulfilled it.
//! The decision protocol has three request/response pairs — borrow, forfeit,
//! and maintenance.

mod transparent;
mod unbounded;

pub use transparent::TransparentStrategy;
pub use unbounded::UnboundedStrategy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Instruction for fulfilling a borrow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BorrowInstruction {
    /// Always create a fresh resource.
    Create,
    /// Take from the queue; create a fresh resource if the queue is empty.
    QueryOrCreate,
    /// Take from the queue; suspend until one is available if empty.
    QueryOrWait,
    /// Take from the queue; run maintenance and re-request if empty.
    QueryOrMaintain,
    /// Run maintenance unconditionally, then re-request.
    Maintain,
}

/// Instruction for fulfilling a forfeit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ForfeitInstruction {
    /// Always evict the resource.
    Evict,
    /// Return to the queue; evict if the queue is full.
    AddOrEvict,
    /// Return to the queue; run non-blocking maintenance and re-request if
    /// the queue is full.
    AddOrMaintain,
    /// Run non-blocking maintenance, then re-request.
    Maintain,
}

/// How the pool fulfilled a borrow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BorrowOutcome {
    /// A fresh resource was created unconditionally.
    Created,
    /// A fresh resource was created because the queue was empty.
    CreatedQueueEmpty,
    /// An idle resource was taken from the queue.
    TakenFromQueue,
}

/// How the pool fulfilled a forfeit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ForfeitOutcome {
    /// The resource was evicted unconditionally.
    Evicted,
    /// The resource was evicted because the queue was full.
    EvictedQueueFull,
    /// The resource was returned to the queue.
    AddedToQueue,
}

/// Bulk pool-size correction for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MaintenanceAction {
    /// Create and enqueue up to `n` resources; best effort.
    CreateUpTo(usize),
    /// Create and enqueue exactly `n` resources, blocking if the caller
    /// context allows it; degrades to best effort otherwise.
    CreateExactly(usize),
    /// Evict up to `n` idle resources; best effort.
    EvictUpTo(usize),
    /// Evict exactly `n` idle resources, blocking if allowed; degrades to
    /// best effort otherwise.
    EvictExactly(usize),
    /// Discard the key's queue, evicting every still-idle resource, and
    /// remove the key from the pool's map.
    RemoveQueue,
}

/// One maintenance step, addressed to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaintenanceInstruction<K> {
    /// The key whose queue the action targets.
    pub key: K,
    /// The action to execute.
    pub action: MaintenanceAction,
}

impl<K> MaintenanceInstruction<K> {
    /// Create a maintenance instruction for `key`.
    pub fn new(key: K, action: MaintenanceAction) -> Self {
        Self { key, action }
    }
}

/// Decision policy plugged into a [`Pool`](crate::Pool).
///
/// The pool calls the `*_request` entry points to obtain instructions and
/// reports back through `borrowed` / `forfeited` /
/// `created_during_maintenance` / `evicted_during_maintenance` once each
/// instruction has been executed. The reported counts are how a strategy
/// discovers that a best-effort target could not be fully met.
///
/// Entry points are never invoked concurrently for the same key; calls for
/// different keys may be concurrent.
pub trait PoolStrategy<K>: Send + Sync {
    /// Decide how a borrow request for `key` should be fulfilled.
    fn borrow_request(&self, key: &K) -> BorrowInstruction;

    /// Report how a borrow request for `key` was fulfilled.
    fn borrowed(&self, _key: &K, _outcome: BorrowOutcome) {}

    /// Decide how a forfeit request for `key` should be fulfilled.
    fn forfeit_request(&self, key: &K) -> ForfeitInstruction;

    /// Report how a forfeit request for `key` was fulfilled.
    fn forfeited(&self, _key: &K, _outcome: ForfeitOutcome) {}

    /// Produce the maintenance steps to execute, possibly none.
    fn maintenance_request(&self) -> Vec<MaintenanceInstruction<K>> {
        Vec::new()
    }

    /// Report resources created and enqueued while executing a maintenance
    /// instruction for `key`.
    fn created_during_maintenance(&self, _key: &K, _count: usize) {}

    /// Report resources evicted while executing a maintenance instruction
    /// for `key`.
    fn evicted_during_maintenance(&self, _key: &K, _count: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintenance_instruction_carries_key_and_action() {
        let instruction = MaintenanceInstruction::new("k", MaintenanceAction::CreateUpTo(3));
        assert_eq!(instruction.key, "k");
        assert_eq!(instruction.action, MaintenanceAction::CreateUpTo(3));
    }
}
