//! Property tests: no resource is ever held by two borrowers at once,
//! regardless of the borrow/forfeit interleaving.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use proptest::prelude::*;

use keyed_pool::{Pool, PoolConfig, ResourceFactory, ResourceHandle, UnboundedStrategy};

/// Factory handing out globally unique ids, so double-issuance is detectable
/// across keys.
#[derive(Clone, Default)]
struct SeqFactory {
    next: Arc<AtomicU64>,
}

#[async_trait]
impl ResourceFactory<u8, u64> for SeqFactory {
    async fn create(&self, _key: &u8) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
enum Op {
    Borrow(u8),
    Forfeit(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4).prop_map(Op::Borrow),
        any::<usize>().prop_map(Op::Forfeit),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn no_resource_is_borrowed_twice(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        let result: Result<(), TestCaseError> = rt.block_on(async {
            let pool: Pool<u8, u64> = Pool::new(
                SeqFactory::default(),
                UnboundedStrategy::new(),
                PoolConfig::default(),
            )
            .unwrap();

            let mut held: Vec<ResourceHandle<u8, u64>> = Vec::new();
            let mut outstanding: HashSet<u64> = HashSet::new();

            for op in ops {
                match op {
                    Op::Borrow(key) => {
                        let handle = pool.borrow(key).await.unwrap();
                        prop_assert!(
                            outstanding.insert(*handle),
                            "resource {} issued while already borrowed",
                            *handle
                        );
                        held.push(handle);
                    }
                    Op::Forfeit(pick) => {
                        if held.is_empty() {
                            continue;
                        }
                        let handle = held.remove(pick % held.len());
                        outstanding.remove(&*handle);
                        pool.forfeit(handle).await.unwrap();
                    }
                }
            }

            // Everything left goes back; counters must balance.
            let borrows = held.len() as u64;
            for handle in held {
                pool.forfeit(handle).await.unwrap();
            }
            let stats = pool.stats();
            prop_assert_eq!(stats.borrows, stats.forfeits);
            prop_assert!(stats.borrows >= borrows);
            Ok(())
        });
        result?;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_borrowers_never_share_a_resource() {
    let pool: Pool<u8, u64> = Pool::new(
        SeqFactory::default(),
        UnboundedStrategy::new(),
        PoolConfig::default(),
    )
    .unwrap();

    let in_use = Arc::new(parking_lot::Mutex::new(HashSet::<u64>::new()));

    let mut tasks = Vec::new();
    for task_id in 0..8u8 {
        let pool = pool.clone();
        let in_use = Arc::clone(&in_use);
        tasks.push(tokio::spawn(async move {
            let key = task_id % 2;
            for _ in 0..50 {
                let handle = pool.borrow(key).await.unwrap();
                assert!(
                    in_use.lock().insert(*handle),
                    "resource handed to two borrowers"
                );
                tokio::task::yield_now().await;
                assert!(in_use.lock().remove(&*handle));
                pool.forfeit(handle).await.unwrap();
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    let stats = pool.stats();
    assert_eq!(stats.borrows, 400);
    assert_eq!(stats.forfeits, 400);
    // Every resource ends up idle; created == hits' complement.
    assert_eq!(stats.created + stats.queue_hits, 400);
}
