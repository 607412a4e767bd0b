//! Resource creation and lifecycle hooks
//!
//! The `ResourceFactory` trait defines how resources are created for a key
//! and how they are prepared for the borrow, forfeit, and eviction
//! transitions.

use async_trait::async_trait;

/// Factory for pooled resources.
///
/// `create` must return a resource that is immediately usable — equivalent to
/// a fresh resource that already went through [`on_borrow`] — and must never
/// hand out a shared or previously returned instance.
///
/// The hooks are side-effecting preparation points invoked by the pool at
/// exactly one lifecycle transition each. The pool never invokes hooks
/// concurrently for the same resource instance: a resource is owned by
/// exactly one party (a queue or an outstanding handle) at any time.
///
/// [`on_borrow`]: ResourceFactory::on_borrow
#[async_trait]
pub trait ResourceFactory<K, R>: Send + Sync
where
    K: Send + Sync,
    R: Send + 'static,
{
    /// Create a new resource for `key`, ready for immediate use.
    async fn create(&self, key: &K) -> R;

    /// Prepare an idle resource that is about to be handed to a borrower.
    async fn on_borrow(&self, _resource: &mut R) {}

    /// Prepare a forfeited resource before the pool decides its fate.
    async fn on_forfeit(&self, _resource: &mut R) {}

    /// Dispose of a resource that leaves the pool permanently.
    async fn on_evict(&self, resource: R) {
        drop(resource);
    }
}
