//! Operation lock with reentrancy detection.
//!
//! Mutating engine operations run one at a time. A second call from another
//! thread waits for the lock; a call from the thread already holding it (a
//! collaborator calling back into the engine) fails with
//! [`Error::Reentrancy`] instead of deadlocking.

use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use crate::error::{Error, Result};

/// Per-engine lock serializing mutating operations
#[derive(Debug, Default)]
pub struct OperationLock {
    lock: Mutex<()>,
    owner: Mutex<Option<ThreadId>>,
}

impl OperationLock {
    /// Create an unlocked lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the lock, failing if this thread already holds it
    pub fn acquire(&self) -> Result<OperationGuard<'_>> {
        let me = thread::current().id();
        if *self.owner() == Some(me) {
            return Err(Error::Reentrancy);
        }

        // Guards no data, so poisoning carries no meaning here
        let held = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *self.owner() = Some(me);

        Ok(OperationGuard {
            owner: &self.owner,
            _held: held,
        })
    }

    /// Check if any thread holds the lock
    pub fn is_locked(&self) -> bool {
        self.owner().is_some()
    }

    fn owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.owner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Held for the duration of one operation; releases the lock on drop
#[derive(Debug)]
pub struct OperationGuard<'a> {
    owner: &'a Mutex<Option<ThreadId>>,
    _held: MutexGuard<'a, ()>,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        let mut owner = self
            .owner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *owner = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_reentry_rejected() {
        let lock = OperationLock::new();
        let guard = lock.acquire().unwrap();
        assert!(lock.is_locked());
        assert_eq!(lock.acquire().unwrap_err(), Error::Reentrancy);
        drop(guard);
        assert!(!lock.is_locked());
        assert!(lock.acquire().is_ok());
    }

    #[test]
    fn test_other_thread_waits() {
        let lock = Arc::new(OperationLock::new());
        let guard = lock.acquire().unwrap();

        let other = Arc::clone(&lock);
        let handle = thread::spawn(move || other.acquire().map(|_| ()));

        drop(guard);
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn test_released_after_panic() {
        let lock = Arc::new(OperationLock::new());
        let inner = Arc::clone(&lock);
        let result = thread::spawn(move || {
            let _guard = inner.acquire().unwrap();
            panic!("collaborator panicked");
        })
        .join();
        assert!(result.is_err());
        assert!(!lock.is_locked());
        assert!(lock.acquire().is_ok());
    }
}
