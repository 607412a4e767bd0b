//! Pool configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for a [`Pool`](crate::Pool).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Capacity bound applied to each lazily-created per-key queue.
    /// `None` creates unrestricted queues.
    pub queue_capacity: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue_capacity: None,
        }
    }
}

impl PoolConfig {
    /// Configuration with unrestricted per-key queues.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Configuration with per-key queues bounded to `capacity`.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            queue_capacity: Some(capacity),
        }
    }

    /// Set the per-key queue capacity.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Validate the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == Some(0) {
            return Err(Error::configuration(
                "queue_capacity must be greater than 0",
            ));
        }
        Ok(())
    }
}
