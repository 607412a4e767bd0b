//! Per-key container of idle resources
//!
//! `KeyedQueue` is the only place the pool ever suspends. It is a FIFO
//! multiset with an optional capacity bound; blocking operations are
//! cancellable through a [`CancellationToken`] and always leave the queue
//! consistent: a resource is either fully transferred or still owned by the
//! caller.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Error returned by [`KeyedQueue::add`] when the wait is cancelled.
///
/// Carries the resource back so the caller retains ownership.
#[derive(thiserror::Error)]
#[error("blocking add interrupted by cancellation")]
pub struct AddInterrupted<R>(pub R);

impl<R> AddInterrupted<R> {
    /// Recover the resource that was not enqueued.
    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R> fmt::Debug for AddInterrupted<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AddInterrupted(..)")
    }
}

struct State<R> {
    items: VecDeque<R>,
    capacity: Option<usize>,
}

/// FIFO queue of idle resources for one key.
///
/// Construct with [`bounded`](KeyedQueue::bounded) for a capacity-limited
/// queue, or [`unrestricted`](KeyedQueue::unrestricted) for one that never
/// fills up and rejects capacity changes.
pub struct KeyedQueue<R> {
    state: Mutex<State<R>>,
    not_empty: Notify,
    not_full: Notify,
}

impl<R> KeyedQueue<R> {
    /// Create a queue holding at most `capacity` idle resources.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    /// Create a queue with no capacity bound.
    ///
    /// The unrestricted variant rejects [`set_capacity`](Self::set_capacity)
    /// with [`Error::CapacityUnsupported`].
    pub fn unrestricted() -> Self {
        Self::with_capacity(None)
    }

    pub(crate) fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                capacity,
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Number of idle resources currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether the queue holds no idle resources.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// The capacity bound, or `None` for the unrestricted variant.
    pub fn capacity(&self) -> Option<usize> {
        self.state.lock().capacity
    }

    /// Whether an add would currently succeed.
    pub(crate) fn has_space(&self) -> bool {
        let state = self.state.lock();
        state.capacity.is_none_or(|cap| state.items.len() < cap)
    }

    /// Enqueue without blocking. On a full queue the resource is handed back.
    pub fn try_add(&self, resource: R) -> std::result::Result<(), R> {
        {
            let mut state = self.state.lock();
            if let Some(cap) = state.capacity {
                if state.items.len() >= cap {
                    return Err(resource);
                }
            }
            state.items.push_back(resource);
        }
        self.not_empty.notify_waiters();
        Ok(())
    }

    /// Enqueue, suspending until space is available.
    ///
    /// Cancellation hands the resource back inside [`AddInterrupted`]; it is
    /// never silently dropped.
    pub async fn add(
        &self,
        resource: R,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), AddInterrupted<R>> {
        let mut pending = resource;
        loop {
            // Register for wakeups before checking, so an add slot freed
            // between the check and the await is not missed.
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            pending = match self.try_add(pending) {
                Ok(()) => return Ok(()),
                Err(back) => back,
            };

            tokio::select! {
                () = cancel.cancelled() => return Err(AddInterrupted(pending)),
                () = notified => {}
            }
        }
    }

    /// Dequeue without blocking.
    pub fn try_take(&self) -> Option<R> {
        let item = self.state.lock().items.pop_front();
        if item.is_some() {
            self.not_full.notify_waiters();
        }
        item
    }

    /// Dequeue, suspending until a resource is available.
    ///
    /// Returns [`Error::Interrupted`] when `cancel` fires first; the queue
    /// contents are untouched in that case.
    pub async fn take(&self, cancel: &CancellationToken) -> Result<R> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_take() {
                return Ok(item);
            }

            tokio::select! {
                () = cancel.cancelled() => return Err(Error::Interrupted),
                () = notified => {}
            }
        }
    }

    /// Change the capacity bound.
    ///
    /// Shrinking below the current length is allowed; adds stay blocked until
    /// enough resources are taken. The unrestricted variant rejects this with
    /// [`Error::CapacityUnsupported`].
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.capacity.is_none() {
                return Err(Error::CapacityUnsupported);
            }
            state.capacity = Some(capacity);
        }
        // Growing may unblock waiting adders.
        self.not_full.notify_waiters();
        Ok(())
    }

    /// Remove and return every queued resource.
    pub fn drain(&self) -> Vec<R> {
        let items: Vec<R> = {
            let mut state = self.state.lock();
            state.items.drain(..).collect()
        };
        if !items.is_empty() {
            self.not_full.notify_waiters();
        }
        items
    }
}

impl<R> fmt::Debug for KeyedQueue<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("KeyedQueue")
            .field("len", &state.items.len())
            .field("capacity", &state.capacity)
            .finish()
    }
}
