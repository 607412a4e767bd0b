//! Unbounded pooling strategy

use super::{BorrowInstruction, ForfeitInstruction, PoolStrategy};

/// Strategy that pools without limits: borrows reuse queued resources when
/// available, forfeits always return resources to the queue.
///
/// Intended for pools configured with an unrestricted queue, where the
/// evict-on-full fallback never actually triggers. With a bounded queue it
/// behaves as a keep-at-most-capacity policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnboundedStrategy;

impl UnboundedStrategy {
    /// Create an unbounded strategy.
    pub fn new() -> Self {
        Self
    }
}

impl<K> PoolStrategy<K> for UnboundedStrategy {
    fn borrow_request(&self, _key: &K) -> BorrowInstruction {
        BorrowInstruction::QueryOrCreate
    }

    fn forfeit_request(&self, _key: &K) -> ForfeitInstruction {
        ForfeitInstruction::AddOrEvict
    }
}
