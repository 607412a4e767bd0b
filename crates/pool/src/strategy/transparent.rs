//! Pass-through strategy: no pooling at all

use super::{BorrowInstruction, ForfeitInstruction, PoolStrategy};

/// Strategy that disables pooling: every borrow creates a fresh resource and
/// every forfeit evicts it.
///
/// Useful when resources are cheap and pooling provides no benefit, while
/// keeping call sites written against the pool API.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransparentStrategy;

impl TransparentStrategy {
    /// Create a transparent strategy.
    pub fn new() -> Self {
        Self
    }
}

impl<K> PoolStrategy<K> for TransparentStrategy {
    fn borrow_request(&self, _key: &K) -> BorrowInstruction {
        BorrowInstruction::Create
    }

    fn forfeit_request(&self, _key: &K) -> ForfeitInstruction {
        ForfeitInstruction::Evict
    }
}
