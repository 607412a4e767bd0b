//! # Keyed Resource Pool
//!
//! A generic, strategy-driven pool of reusable resources grouped by key.
//! The [`Pool`] orchestrates three pluggable pieces:
//!
//! - a [`ResourceFactory`] that creates resources and reacts to lifecycle
//!   events (borrow, forfeit, evict),
//! - a [`PoolStrategy`] that decides, per request, how borrows and forfeits
//!   are satisfied and what maintenance keeps the pool at its target shape,
//! - per-key [`KeyedQueue`]s that hold idle resources in FIFO order,
//!   optionally bounded, with blocking and non-blocking access.
//!
//! Borrowed resources travel inside a [`ResourceHandle`] and must be handed
//! back via [`Pool::forfeit`]. Blocking waits are cancellable through a
//! `tokio_util::sync::CancellationToken` and surface as
//! [`Error::Interrupted`].
//!
//! ```no_run
//! use keyed_pool::{Pool, PoolConfig, ResourceFactory, UnboundedStrategy};
//!
//! struct Connector;
//!
//! #[async_trait::async_trait]
//! impl ResourceFactory<String, Vec<u8>> for Connector {
//!     async fn create(&self, key: &String) -> Vec<u8> {
//!         key.as_bytes().to_vec()
//!     }
//! }
//!
//! # async fn run() -> keyed_pool::Result<()> {
//! let pool = Pool::new(Connector, UnboundedStrategy::new(), PoolConfig::default())?;
//! let handle = pool.borrow("db-primary".to_string()).await?;
//! // use *handle ...
//! pool.forfeit(handle).await.ok();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod handle;
pub mod pool;
pub mod queue;
pub mod stats;
pub mod strategy;

pub use config::PoolConfig;
pub use error::{Error, Result};
pub use factory::ResourceFactory;
pub use handle::ResourceHandle;
pub use pool::{ForfeitError, Pool};
pub use queue::{AddInterrupted, KeyedQueue};
pub use stats::PoolStatsSnapshot;
pub use strategy::{
    BorrowInstruction, BorrowOutcome, ForfeitInstruction, ForfeitOutcome, MaintenanceAction,
    MaintenanceInstruction, PoolStrategy, TransparentStrategy, UnboundedStrategy,
};
