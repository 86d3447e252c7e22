//! Error handling types for duplexer
//!
//! Failures raised independently by a sink or source travel as [`SharedError`]
//! so that bubbling hands the adapter's listeners the very same value.

use std::sync::{Arc, PoisonError};
use thiserror::Error;

/// A failure raised by an underlying channel, shared by every listener that sees it.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned through the adapter's direct call paths
#[derive(Debug, Error)]
pub enum DuplexError {
    /// The input side already completed (consumer `end()` or sink finish)
    #[error("write after end")]
    WriteAfterEnd,

    /// The sink reported a failure for this write through its completion callback
    #[error("sink write failed: {0}")]
    Sink(#[source] SharedError),

    /// The sink dropped the completion callback without completing it
    #[error("write callback dropped before completion")]
    WriteDropped,

    /// The adapter task is no longer running
    #[error("duplex is closed")]
    Closed,
}

/// Result type for duplex operations
pub type DuplexResult<T> = Result<T, DuplexError>;

/// Helper trait to recover guards from poisoned locks
pub trait LockResultExt<T> {
    /// Take the guard out of a poisoned lock, logging which operation hit it.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "duplexer::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

/// Wrap any error value so it can be raised as a channel failure
pub fn shared(error: impl std::error::Error + Send + Sync + 'static) -> SharedError {
    Arc::new(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn sink_error_keeps_original_as_source() {
        let original = shared(std::io::Error::other("broken pipe"));
        let err = DuplexError::Sink(original.clone());

        assert_eq!(err.to_string(), "sink write failed: broken pipe");
        let source = std::error::Error::source(&err).expect("source should be set");
        assert_eq!(source.to_string(), "broken pipe");
    }

    #[test]
    fn recover_poison_returns_inner_guard() {
        let lock = Arc::new(Mutex::new(7));
        let cloned = lock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(lock.is_poisoned());
        let guard = lock.lock().recover_poison("test");
        assert_eq!(*guard, 7);
    }
}
