//! Interruptible locking.
//!
//! A blocked lock acquisition must be able to return a distinct
//! `Interrupted` result instead of retrying internally, so that a caller
//! woken by a signal can propagate the failure and release whatever outer
//! resources it holds. `std::sync::Mutex` has no such primitive, so this
//! wraps acquisition in a short poll loop against a shared stop flag —
//! the "select-style poll" fallback for platforms without a native
//! interruptible mutex.

use crate::DeviceError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A process-wide (or connection-wide) flag a signal handler sets to wake
/// up anything blocked on [`InterruptibleMutex::lock`].
#[derive(Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// Creates a flag that is not yet set.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Marks the flag as set. Idempotent.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` if the flag has been set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How often a blocked `lock()` rechecks the interrupt flag between
/// `try_lock` attempts.
const POLL_INTERVAL: Duration = Duration::from_micros(200);

/// A mutex whose acquisition can be interrupted.
pub struct InterruptibleMutex<T> {
    inner: Mutex<T>,
}

impl<T> InterruptibleMutex<T> {
    /// Wraps `value` behind an interruptible mutex.
    pub fn new(value: T) -> Self {
        Self { inner: Mutex::new(value) }
    }

    /// Acquires the lock, polling `interrupt` while blocked.
    ///
    /// If `interrupt` is set before the lock becomes available, returns
    /// [`DeviceError::Interrupted`] without having acquired it.
    pub fn lock(&self, interrupt: &InterruptFlag) -> Result<MutexGuard<'_, T>, DeviceError> {
        loop {
            match self.inner.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(std::sync::TryLockError::WouldBlock) => {
                    if interrupt.is_set() {
                        return Err(DeviceError::Interrupted);
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(std::sync::TryLockError::Poisoned(poisoned)) => {
                    // A panic inside another holder must not wedge every
                    // future caller; recover the guard and carry on.
                    return Ok(poisoned.into_inner());
                }
            }
        }
    }
}
