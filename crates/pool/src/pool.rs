//! Keyed resource pool orchestrator
//!
//! `Pool<K, R>` owns the lazily-built key→queue map and drives the
//! [`ResourceFactory`] and [`PoolStrategy`] to satisfy borrow and forfeit
//! requests, recursing through maintenance where instructed. The pool holds
//! no global lock: the map is a `DashMap` and the only suspension points live
//! inside the per-key [`KeyedQueue`].

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::PoolConfig;
use crate::error::{Error as PoolError, Result};
use crate::factory::ResourceFactory;
use crate::handle::ResourceHandle;
use crate::queue::KeyedQueue;
use crate::stats::{PoolStats, PoolStatsSnapshot};
use crate::strategy::{
    BorrowInstruction, BorrowOutcome, ForfeitInstruction, ForfeitOutcome, MaintenanceAction,
    MaintenanceInstruction, PoolStrategy,
};

/// Retry count after which a forfeit that keeps re-running maintenance is
/// reported as a suspected strategy defect. The loop itself stays unbounded.
const FORFEIT_RETRY_WARN_THRESHOLD: usize = 64;

// ---------------------------------------------------------------------------
// ForfeitError
// ---------------------------------------------------------------------------

/// Error returned by [`Pool::forfeit`] when the handle was issued by a
/// different pool instance.
///
/// Carries the rejected handle back so the caller retains the resource.
#[derive(Error)]
#[error("handle was issued by a different pool")]
pub struct ForfeitError<K, R> {
    handle: ResourceHandle<K, R>,
}

impl<K, R> ForfeitError<K, R> {
    /// The rejected handle.
    pub fn handle(&self) -> &ResourceHandle<K, R> {
        &self.handle
    }

    /// Recover the rejected handle.
    pub fn into_handle(self) -> ResourceHandle<K, R> {
        self.handle
    }
}

impl<K, R> fmt::Debug for ForfeitError<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ForfeitError { handle: .. }")
    }
}

// ---------------------------------------------------------------------------
// Pool internals
// ---------------------------------------------------------------------------

struct PoolInner<K, R> {
    id: Uuid,
    config: PoolConfig,
    factory: Arc<dyn ResourceFactory<K, R>>,
    strategy: Arc<dyn PoolStrategy<K>>,
    /// Lazily-built map of per-key idle queues.
    queues: DashMap<K, Arc<KeyedQueue<R>>>,
    /// Per-key gates: strategy entry points are never invoked concurrently
    /// for the same key. Held only for the duration of one call.
    gates: DashMap<K, Arc<Mutex<()>>>,
    /// Serialises the keyless `maintenance_request` entry point.
    maintenance_gate: Mutex<()>,
    stats: PoolStats,
}

// ---------------------------------------------------------------------------
// Pool<K, R>
// ---------------------------------------------------------------------------

/// Generic keyed resource pool.
///
/// Hands out [`ResourceHandle`]s via [`borrow`](Pool::borrow), accepts them
/// back via [`forfeit`](Pool::forfeit), and executes the sizing decisions of
/// the plugged-in [`PoolStrategy`]. Cheap to clone; clones share state.
pub struct Pool<K, R> {
    inner: Arc<PoolInner<K, R>>,
}

impl<K, R> Clone for Pool<K, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, R> fmt::Debug for Pool<K, R>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.inner.id)
            .field("keys", &self.inner.queues.len())
            .field("stats", &self.inner.stats.snapshot())
            .finish()
    }
}

impl<K, R> Pool<K, R>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    R: Send + 'static,
{
    /// Create a new pool from a factory, a strategy, and pool settings.
    ///
    /// # Errors
    /// Returns an error if `config` is invalid (e.g. a zero queue capacity).
    pub fn new<F, S>(factory: F, strategy: S, config: PoolConfig) -> Result<Self>
    where
        F: ResourceFactory<K, R> + 'static,
        S: PoolStrategy<K> + 'static,
    {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                id: Uuid::new_v4(),
                config,
                factory: Arc::new(factory),
                strategy: Arc::new(strategy),
                queues: DashMap::new(),
                gates: DashMap::new(),
                maintenance_gate: Mutex::new(()),
                stats: PoolStats::default(),
            }),
        })
    }

    /// Identifier of this pool instance.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Borrow a resource for `key`.
    ///
    /// May suspend when the strategy instructs a blocking wait; see
    /// [`borrow_with`](Pool::borrow_with) for a cancellable variant.
    pub async fn borrow(&self, key: K) -> Result<ResourceHandle<K, R>> {
        self.borrow_with(key, &CancellationToken::new()).await
    }

    /// Borrow a resource for `key`, abortable through `cancel`.
    ///
    /// A cancelled wait surfaces as [`Error::Interrupted`](PoolError::Interrupted)
    /// and leaves the pool state untouched.
    pub async fn borrow_with(
        &self,
        key: K,
        cancel: &CancellationToken,
    ) -> Result<ResourceHandle<K, R>> {
        loop {
            let instruction = self.gated(&key, || self.inner.strategy.borrow_request(&key));
            tracing::trace!(
                pool_id = %self.inner.id,
                key = ?key,
                instruction = ?instruction,
                "borrow instruction"
            );

            let (value, outcome) = match instruction {
                BorrowInstruction::Create => {
                    let value = self.inner.factory.create(&key).await;
                    self.inner.stats.record_created(1);
                    (value, BorrowOutcome::Created)
                }
                BorrowInstruction::QueryOrCreate => {
                    let queue = self.queue(&key);
                    if let Some(mut value) = queue.try_take() {
                        self.inner.factory.on_borrow(&mut value).await;
                        self.inner.stats.record_queue_hit();
                        (value, BorrowOutcome::TakenFromQueue)
                    } else {
                        let value = self.inner.factory.create(&key).await;
                        self.inner.stats.record_created(1);
                        (value, BorrowOutcome::CreatedQueueEmpty)
                    }
                }
                BorrowInstruction::QueryOrWait => {
                    let queue = self.queue(&key);
                    let mut value = queue.take(cancel).await?;
                    self.inner.factory.on_borrow(&mut value).await;
                    self.inner.stats.record_queue_hit();
                    (value, BorrowOutcome::TakenFromQueue)
                }
                BorrowInstruction::QueryOrMaintain => {
                    let queue = self.queue(&key);
                    if let Some(mut value) = queue.try_take() {
                        self.inner.factory.on_borrow(&mut value).await;
                        self.inner.stats.record_queue_hit();
                        (value, BorrowOutcome::TakenFromQueue)
                    } else {
                        self.execute_maintenance(true, cancel).await?;
                        continue;
                    }
                }
                BorrowInstruction::Maintain => {
                    self.execute_maintenance(true, cancel).await?;
                    continue;
                }
            };

            self.gated(&key, || self.inner.strategy.borrowed(&key, outcome));
            self.inner.stats.record_borrow();
            tracing::debug!(
                pool_id = %self.inner.id,
                key = ?key,
                outcome = ?outcome,
                "borrow fulfilled"
            );
            return Ok(ResourceHandle::new(self.inner.id, key, value));
        }
    }

    /// Return a borrowed resource to the pool.
    ///
    /// Never suspends: maintenance reached from this path runs non-blocking.
    /// A handle issued by a different pool is rejected with the handle
    /// returned inside the error.
    pub async fn forfeit(
        &self,
        handle: ResourceHandle<K, R>,
    ) -> std::result::Result<(), ForfeitError<K, R>> {
        if handle.pool_id() != self.inner.id {
            tracing::debug!(
                pool_id = %self.inner.id,
                handle_pool_id = %handle.pool_id(),
                "rejected handle issued by a different pool"
            );
            return Err(ForfeitError { handle });
        }

        let (key, mut value) = handle.into_parts();
        self.inner.factory.on_forfeit(&mut value).await;

        let mut retries = 0usize;
        loop {
            let instruction = self.gated(&key, || self.inner.strategy.forfeit_request(&key));
            tracing::trace!(
                pool_id = %self.inner.id,
                key = ?key,
                instruction = ?instruction,
                "forfeit instruction"
            );

            let outcome = match instruction {
                ForfeitInstruction::Evict => {
                    self.inner.factory.on_evict(value).await;
                    self.inner.stats.record_evicted(1);
                    ForfeitOutcome::Evicted
                }
                ForfeitInstruction::AddOrEvict => {
                    let queue = self.queue(&key);
                    match queue.try_add(value) {
                        Ok(()) => {
                            self.inner.stats.record_queue_return();
                            ForfeitOutcome::AddedToQueue
                        }
                        Err(back) => {
                            self.inner.factory.on_evict(back).await;
                            self.inner.stats.record_evicted(1);
                            ForfeitOutcome::EvictedQueueFull
                        }
                    }
                }
                ForfeitInstruction::AddOrMaintain => {
                    let queue = self.queue(&key);
                    match queue.try_add(value) {
                        Ok(()) => {
                            self.inner.stats.record_queue_return();
                            ForfeitOutcome::AddedToQueue
                        }
                        Err(back) => {
                            value = back;
                            self.maintain_nonblocking().await;
                            retries += 1;
                            self.warn_on_forfeit_retries(&key, retries);
                            continue;
                        }
                    }
                }
                ForfeitInstruction::Maintain => {
                    self.maintain_nonblocking().await;
                    retries += 1;
                    self.warn_on_forfeit_retries(&key, retries);
                    continue;
                }
            };

            self.gated(&key, || self.inner.strategy.forfeited(&key, outcome));
            self.inner.stats.record_forfeit();
            tracing::debug!(
                pool_id = %self.inner.id,
                key = ?key,
                outcome = ?outcome,
                "forfeit fulfilled"
            );
            return Ok(());
        }
    }

    /// Run one externally-scheduled maintenance pass (blocking allowed).
    pub async fn maintain(&self) -> Result<()> {
        self.maintain_with(&CancellationToken::new()).await
    }

    /// Run one maintenance pass with blocking allowed, abortable through
    /// `cancel`.
    pub async fn maintain_with(&self, cancel: &CancellationToken) -> Result<()> {
        self.execute_maintenance(true, cancel).await
    }

    /// Number of idle resources currently queued for `key`.
    pub fn idle_count(&self, key: &K) -> usize {
        self.inner.queues.get(key).map_or(0, |queue| queue.len())
    }

    /// Point-in-time snapshot of the pool's counters.
    pub fn stats(&self) -> PoolStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Shut down the pool, evicting every idle resource and dropping all
    /// queues. Outstanding handles are unaffected.
    pub async fn shutdown(&self) {
        let keys: Vec<K> = self
            .inner
            .queues
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for key in keys {
            evicted += self.remove_queue(&key).await;
        }
        self.inner
            .gates
            .retain(|_, gate| Arc::strong_count(gate) > 1);
        self.inner.stats.record_evicted(evicted as u64);
        tracing::debug!(pool_id = %self.inner.id, evicted, "pool shut down");
    }

    // -- maintenance execution ----------------------------------------------

    /// Execute one maintenance pass. `can_block` is true on borrow and
    /// external paths, false on forfeit paths; the `_Exactly` actions degrade
    /// to best effort when blocking is not allowed.
    async fn execute_maintenance(&self, can_block: bool, cancel: &CancellationToken) -> Result<()> {
        self.inner.stats.record_maintenance_run();
        let instructions = {
            let _serialised = self.inner.maintenance_gate.lock();
            self.inner.strategy.maintenance_request()
        };
        tracing::trace!(
            pool_id = %self.inner.id,
            steps = instructions.len(),
            can_block,
            "maintenance pass"
        );

        for MaintenanceInstruction { key, action } in instructions {
            match action {
                MaintenanceAction::CreateUpTo(target) => {
                    let achieved = self.create_up_to(&key, target).await;
                    self.report_created(&key, achieved);
                }
                MaintenanceAction::CreateExactly(target) => {
                    if can_block {
                        let (achieved, result) = self.create_exactly(&key, target, cancel).await;
                        self.report_created(&key, achieved);
                        result?;
                    } else {
                        let achieved = self.create_up_to(&key, target).await;
                        self.report_created(&key, achieved);
                    }
                }
                MaintenanceAction::EvictUpTo(target) => {
                    let achieved = self.evict_up_to(&key, target).await;
                    self.report_evicted(&key, achieved);
                }
                MaintenanceAction::EvictExactly(target) => {
                    if can_block {
                        let (achieved, result) = self.evict_exactly(&key, target, cancel).await;
                        self.report_evicted(&key, achieved);
                        result?;
                    } else {
                        let achieved = self.evict_up_to(&key, target).await;
                        self.report_evicted(&key, achieved);
                    }
                }
                MaintenanceAction::RemoveQueue => {
                    let dropped = self.remove_queue(&key).await;
                    self.report_evicted(&key, dropped);
                    self.drop_gate(&key);
                }
            }
        }
        Ok(())
    }

    /// Create and enqueue up to `target` resources without blocking.
    async fn create_up_to(&self, key: &K, target: usize) -> usize {
        let queue = self.queue(key);
        let mut achieved = 0;
        while achieved < target && queue.has_space() {
            let value = self.inner.factory.create(key).await;
            match queue.try_add(value) {
                Ok(()) => achieved += 1,
                Err(value) => {
                    // Lost the race for the last slot; the fresh resource
                    // leaves through the eviction hook. It never reached the
                    // queue, so it is counted here and not in the achieved
                    // total reported to the strategy.
                    self.inner.factory.on_evict(value).await;
                    self.inner.stats.record_created(1);
                    self.inner.stats.record_evicted(1);
                    break;
                }
            }
        }
        achieved
    }

    /// Create and enqueue exactly `target` resources, blocking for space.
    /// Returns the achieved count alongside the result so the strategy can be
    /// informed even when the wait is cancelled part-way.
    async fn create_exactly(
        &self,
        key: &K,
        target: usize,
        cancel: &CancellationToken,
    ) -> (usize, Result<()>) {
        let queue = self.queue(key);
        let mut achieved = 0;
        while achieved < target {
            let value = self.inner.factory.create(key).await;
            match queue.add(value, cancel).await {
                Ok(()) => achieved += 1,
                Err(interrupted) => {
                    self.inner.factory.on_evict(interrupted.into_inner()).await;
                    return (achieved, Err(PoolError::Interrupted));
                }
            }
        }
        (achieved, Ok(()))
    }

    /// Evict up to `target` idle resources without blocking.
    async fn evict_up_to(&self, key: &K, target: usize) -> usize {
        let Some(queue) = self.queue_if_present(key) else {
            return 0;
        };
        let mut achieved = 0;
        while achieved < target {
            match queue.try_take() {
                Some(value) => {
                    self.inner.factory.on_evict(value).await;
                    achieved += 1;
                }
                None => break,
            }
        }
        achieved
    }

    /// Evict exactly `target` resources, blocking until each is available.
    async fn evict_exactly(
        &self,
        key: &K,
        target: usize,
        cancel: &CancellationToken,
    ) -> (usize, Result<()>) {
        let queue = self.queue(key);
        let mut achieved = 0;
        while achieved < target {
            match queue.take(cancel).await {
                Ok(value) => {
                    self.inner.factory.on_evict(value).await;
                    achieved += 1;
                }
                Err(err) => return (achieved, Err(err)),
            }
        }
        (achieved, Ok(()))
    }

    /// Drop the key's queue and evict every still-idle resource.
    async fn remove_queue(&self, key: &K) -> usize {
        let Some((_, queue)) = self.inner.queues.remove(key) else {
            return 0;
        };
        let dropped = queue.drain();
        let count = dropped.len();
        for value in dropped {
            self.inner.factory.on_evict(value).await;
        }
        count
    }

    // -- helpers --------------------------------------------------------------

    /// Non-blocking maintenance for forfeit paths. Every non-blocking action
    /// is currently infallible; a failure here would be a pool defect, so it
    /// is logged rather than propagated into the forfeit result.
    async fn maintain_nonblocking(&self) {
        if let Err(error) = self
            .execute_maintenance(false, &CancellationToken::new())
            .await
        {
            tracing::error!(pool_id = %self.inner.id, %error, "non-blocking maintenance failed");
        }
    }

    fn report_created(&self, key: &K, count: usize) {
        self.inner.stats.record_created(count as u64);
        self.gated(key, || {
            self.inner.strategy.created_during_maintenance(key, count);
        });
    }

    fn report_evicted(&self, key: &K, count: usize) {
        self.inner.stats.record_evicted(count as u64);
        self.gated(key, || {
            self.inner.strategy.evicted_during_maintenance(key, count);
        });
    }

    fn warn_on_forfeit_retries(&self, key: &K, retries: usize) {
        if retries == FORFEIT_RETRY_WARN_THRESHOLD {
            tracing::warn!(
                pool_id = %self.inner.id,
                key = ?key,
                retries,
                "forfeit keeps re-running maintenance without freeing queue space"
            );
        }
    }

    /// The queue for `key`, created lazily on first reference.
    fn queue(&self, key: &K) -> Arc<KeyedQueue<R>> {
        self.inner
            .queues
            .entry(key.clone())
            .or_insert_with(|| Arc::new(KeyedQueue::with_capacity(self.inner.config.queue_capacity)))
            .value()
            .clone()
    }

    fn queue_if_present(&self, key: &K) -> Option<Arc<KeyedQueue<R>>> {
        self.inner.queues.get(key).map(|entry| entry.value().clone())
    }

    /// Drop the key's gate once no other task holds it. `remove_if` runs
    /// under the shard lock and new clones are only taken under that same
    /// lock, so a strong count of 1 means the map is the sole owner.
    fn drop_gate(&self, key: &K) {
        self.inner
            .gates
            .remove_if(key, |_, gate| Arc::strong_count(gate) == 1);
    }

    /// Run one strategy entry point under the key's gate.
    fn gated<T>(&self, key: &K, call: impl FnOnce() -> T) -> T {
        let gate = self
            .inner
            .gates
            .entry(key.clone())
            .or_default()
            .value()
            .clone();
        let _serialised = gate.lock();
        call()
    }
}
