//! Borrowed-resource capsule

use std::fmt;

use uuid::Uuid;

/// Capsule returned by a successful borrow, binding the resource to the
/// issuing pool and the key it was borrowed under.
///
/// The handle owns the resource until it is passed to
/// [`Pool::forfeit`](crate::Pool::forfeit). Dropping a handle without
/// forfeiting discards the resource (with a warning) — the pool never holds a
/// reference to an outstanding handle, so it cannot reclaim it.
pub struct ResourceHandle<K, R> {
    pool_id: Uuid,
    key: Option<K>,
    value: Option<R>,
}

impl<K, R> ResourceHandle<K, R> {
    pub(crate) fn new(pool_id: Uuid, key: K, value: R) -> Self {
        Self {
            pool_id,
            key: Some(key),
            value: Some(value),
        }
    }

    /// The key this resource was borrowed under.
    pub fn key(&self) -> &K {
        self.key.as_ref().expect("handle used after forfeit")
    }

    /// Identifier of the pool that issued this handle.
    pub fn pool_id(&self) -> Uuid {
        self.pool_id
    }

    pub(crate) fn into_parts(mut self) -> (K, R) {
        let key = self.key.take().expect("handle used after forfeit");
        let value = self.value.take().expect("handle used after forfeit");
        (key, value)
    }
}

impl<K, R> std::ops::Deref for ResourceHandle<K, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.value.as_ref().expect("handle used after forfeit")
    }
}

impl<K, R> std::ops::DerefMut for ResourceHandle<K, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.value.as_mut().expect("handle used after forfeit")
    }
}

impl<K, R> Drop for ResourceHandle<K, R> {
    fn drop(&mut self) {
        if self.value.is_some() {
            tracing::warn!(
                pool_id = %self.pool_id,
                "resource handle dropped without forfeit; resource discarded"
            );
        }
    }
}

impl<K: fmt::Debug, R: fmt::Debug> fmt::Debug for ResourceHandle<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("pool_id", &self.pool_id)
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}
