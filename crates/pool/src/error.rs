//! Error types for pool operations
use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pool and queue operations.
///
/// Errors that must hand a resource back to the caller have their own
/// value-carrying types ([`ForfeitError`](crate::pool::ForfeitError),
/// [`AddInterrupted`](crate::queue::AddInterrupted)); everything else is
/// covered here.
#[derive(Error, Debug)]
pub enum Error {
    /// Pool configuration is invalid
    #[error("configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
    },

    /// A blocking wait was aborted by the caller's cancellation token
    #[error("blocking wait interrupted by cancellation")]
    Interrupted,

    /// Capacity changes are not supported by this queue variant
    #[error("queue does not support capacity changes")]
    CapacityUnsupported,
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error is the distinguished cancellation outcome.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}
