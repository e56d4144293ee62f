//! One lock, two conditions
//!
//! `SyncGate` is the monitor that serialises every device operation. It owns
//! the device state behind a `parking_lot::Mutex` and pairs it with two
//! condition variables:
//!
//! - `DataAvailable`: readers sleep here while the buffer is empty
//! - `SpaceAvailable`: writers sleep here while the buffer is full
//!
//! Waiting follows the usual monitor workflow:
//!
//! ```ignore
//! let mut state = gate.lock();
//! while !ready(&state) {
//!     gate.wait(&mut state, Condition::DataAvailable, &pending)?;
//! }
//! // ... mutate state ...
//! drop(state);
//! gate.wake(Condition::SpaceAvailable);
//! ```
//!
//! The predicate is always re-checked after `wait` returns: a wake only means
//! "something changed", not "your condition holds".
//!
//! # Cancellation
//!
//! A wait also ends when the waiting session's [`Pending`] flag is raised.
//! [`SyncGate::interrupt`] raises the flag and then takes the lock before
//! notifying, so the flag cannot slip in between a waiter's check and its
//! call into the condition variable.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    DataAvailable,
    SpaceAvailable,
}

/// A blocked wait was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitInterrupted;

/// Per-session cancellation flag
///
/// Raised by an interrupter, consumed by the next wait that observes it.
#[derive(Debug, Default)]
pub struct Pending(AtomicBool);

impl Pending {
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct SyncGate<T> {
    state: Mutex<T>,
    data_available: Condvar,
    space_available: Condvar,
}

impl<T> SyncGate<T> {
    pub fn new(state: T) -> Self {
        Self {
            state: Mutex::new(state),
            data_available: Condvar::new(),
            space_available: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.state.lock()
    }

    fn condvar(&self, condition: Condition) -> &Condvar {
        match condition {
            Condition::DataAvailable => &self.data_available,
            Condition::SpaceAvailable => &self.space_available,
        }
    }

    /// Release the lock, sleep on `condition`, reacquire the lock.
    ///
    /// Returns early with `WaitInterrupted` if `pending` is raised before or
    /// during the sleep; the flag is consumed in that case.
    ///
    /// # Errors
    ///
    /// `WaitInterrupted` when the wait was cancelled.
    pub fn wait(
        &self,
        guard: &mut MutexGuard<'_, T>,
        condition: Condition,
        pending: &Pending,
    ) -> Result<(), WaitInterrupted> {
        if pending.take() {
            return Err(WaitInterrupted);
        }
        self.condvar(condition).wait(guard);
        if pending.take() {
            return Err(WaitInterrupted);
        }
        Ok(())
    }

    /// Wake every thread sleeping on `condition`.
    ///
    /// Called after the lock has been released.
    pub fn wake(&self, condition: Condition) {
        self.condvar(condition).notify_all();
    }

    /// Raise `pending` and kick all sleepers so the owner of the flag notices
    pub fn interrupt(&self, pending: &Pending) {
        pending.raise();
        drop(self.state.lock());
        self.data_available.notify_all();
        self.space_available.notify_all();
    }
}
