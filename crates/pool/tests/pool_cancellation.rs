//! Cancellation of blocking borrow waits.
//!
//! A cancelled wait must surface as the distinguished interrupted error,
//! leave queue contents untouched, and keep the pool fully usable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use keyed_pool::{
    BorrowInstruction, ForfeitInstruction, Pool, PoolConfig, PoolStrategy, ResourceFactory,
};

struct SeqFactory;

#[async_trait]
impl ResourceFactory<&'static str, u32> for SeqFactory {
    async fn create(&self, _key: &&'static str) -> u32 {
        7
    }
}

/// Creates on the first borrow, then makes every later borrow wait on the
/// queue. Forfeits always return resources to the queue.
struct CreateOnceThenWait {
    first: AtomicBool,
}

impl CreateOnceThenWait {
    fn new() -> Self {
        Self {
            first: AtomicBool::new(true),
        }
    }
}

impl<K> PoolStrategy<K> for CreateOnceThenWait {
    fn borrow_request(&self, _key: &K) -> BorrowInstruction {
        if self.first.swap(false, Ordering::SeqCst) {
            BorrowInstruction::Create
        } else {
            BorrowInstruction::QueryOrWait
        }
    }

    fn forfeit_request(&self, _key: &K) -> ForfeitInstruction {
        ForfeitInstruction::AddOrEvict
    }
}

#[tokio::test]
async fn cancelled_borrow_wait_is_interrupted_and_pool_survives() {
    let pool: Pool<&'static str, u32> = Pool::new(
        SeqFactory,
        CreateOnceThenWait::new(),
        PoolConfig::default(),
    )
    .unwrap();

    // First borrow creates; the resource stays out while the waiter blocks.
    let held = pool.borrow("k").await.unwrap();

    let cancel = CancellationToken::new();
    let waiter = {
        let pool = pool.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { pool.borrow_with("k", &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let err = waiter.await.unwrap().unwrap_err();
    assert!(err.is_interrupted());

    // The cancelled wait consumed nothing.
    assert_eq!(pool.idle_count(&"k"), 0);
    assert_eq!(pool.stats().borrows, 1);

    // The pool keeps working: the forfeit feeds a later blocking borrow.
    pool.forfeit(held).await.unwrap();
    let reborrowed = pool.borrow("k").await.unwrap();
    assert_eq!(*reborrowed, 7);
    assert_eq!(pool.stats().queue_hits, 1);
    pool.forfeit(reborrowed).await.unwrap();
}

#[tokio::test]
async fn blocking_borrow_is_fulfilled_by_forfeit() {
    let pool: Pool<&'static str, u32> = Pool::new(
        SeqFactory,
        CreateOnceThenWait::new(),
        PoolConfig::default(),
    )
    .unwrap();

    let held = pool.borrow("k").await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.borrow("k").await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    pool.forfeit(held).await.unwrap();

    let handle = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should be woken by the forfeit")
        .unwrap()
        .unwrap();
    assert_eq!(*handle, 7);
    pool.forfeit(handle).await.unwrap();
}

#[tokio::test]
async fn pre_cancelled_token_interrupts_immediately() {
    let pool: Pool<&'static str, u32> = Pool::new(
        SeqFactory,
        CreateOnceThenWait::new(),
        PoolConfig::default(),
    )
    .unwrap();

    let held = pool.borrow("k").await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = pool.borrow_with("k", &cancel).await.unwrap_err();
    assert!(err.is_interrupted());

    pool.forfeit(held).await.unwrap();
}
