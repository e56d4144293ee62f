//! The sort device
//!
//! One `SortDevice` is one mailbox: every session opened on it reads from and
//! writes to the same [`SharedBuffer`]. Reads hand out the unread bytes in
//! ascending order, re-sorting whatever is unread at the moment of the read.
//!
//! # Locking
//!
//! All state (buffer, cursors, session counters) sits behind one
//! [`SyncGate`]. Readers sleep on `DataAvailable` while the buffer is empty,
//! writers sleep on `SpaceAvailable` while it is full. Each side wakes the
//! other after releasing the lock.
//!
//! # Lifetime
//!
//! Storage is allocated by the first `open` and kept until the device and
//! every session opened on it are gone. Closing a session never frees it.

use std::sync::Arc;

use crate::buffer::SharedBuffer;
use crate::command::{Command, CommandArg};
use crate::config::{DeviceConfig, MIN_BUFFER_SIZE};
use crate::error::DeviceError;
use crate::gate::{Condition, Pending, SyncGate};
use crate::idgen::{Handle, IdGen};
use crate::notifier::{AsyncNotifier, DeviceEvent, NotificationQueue};
use crate::session::{AccessMode, Readiness, Session};
use crate::transfer::{CopyIn, CopyOut};

/// Everything the device lock protects
#[derive(Debug, Default)]
pub(crate) struct DeviceState {
    buffer: Option<SharedBuffer>,
    readers: usize,
    writers: usize,
}

impl DeviceState {
    fn buffer(&self) -> Result<&SharedBuffer, DeviceError> {
        self.buffer.as_ref().ok_or(DeviceError::NoDevice)
    }

    fn buffer_mut(&mut self) -> Result<&mut SharedBuffer, DeviceError> {
        self.buffer.as_mut().ok_or(DeviceError::NoDevice)
    }
}

/// Point-in-time view of a device, taken under its lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    pub capacity: usize,
    pub allocated: bool,
    pub read_cursor: usize,
    pub write_cursor: usize,
    pub readers: usize,
    pub writers: usize,
}

impl DeviceStatus {
    /// Unread bytes
    #[must_use]
    pub fn data_len(&self) -> usize {
        self.write_cursor - self.read_cursor
    }
}

pub(crate) struct DeviceShared {
    index: usize,
    capacity: usize,
    gate: SyncGate<DeviceState>,
    notifier: Arc<dyn AsyncNotifier>,
    ids: IdGen,
}

impl DeviceShared {
    pub(crate) fn notifier(&self) -> &dyn AsyncNotifier {
        self.notifier.as_ref()
    }

    pub(crate) fn interrupt(&self, pending: &Pending) {
        self.gate.interrupt(pending);
    }

    /// Blocking (or not) sorted read into `dst`
    pub(crate) fn read<R: CopyOut + ?Sized>(
        &self,
        blocking: bool,
        pending: &Pending,
        dst: &mut R,
    ) -> Result<usize, DeviceError> {
        let mut state = self.gate.lock();

        while !state.buffer()?.has_data() {
            if !blocking {
                return Err(DeviceError::WouldBlock);
            }
            log::debug!("sortdev{}: reader going to sleep", self.index);
            self.gate
                .wait(&mut state, Condition::DataAvailable, pending)
                .map_err(|_| DeviceError::Interrupted)?;
        }

        let buffer = state.buffer_mut()?;
        buffer.sort_unread();
        let count = buffer.take(dst).inspect_err(|_| {
            log::error!("sortdev{}: fault copying data out to caller", self.index);
        })?;
        buffer.compact();
        drop(state);

        self.gate.wake(Condition::SpaceAvailable);
        log::debug!("sortdev{}: did read {count} bytes", self.index);
        Ok(count)
    }

    /// Write all of `src`, sleeping while the buffer is full.
    ///
    /// An interrupted sleep ends the call with the bytes accepted so far.
    pub(crate) fn write<W: CopyIn + ?Sized>(
        &self,
        blocking: bool,
        pending: &Pending,
        src: &W,
    ) -> Result<usize, DeviceError> {
        let total = src.in_len();
        let mut written = 0;

        self.gate.lock().buffer_mut()?.compact();

        while written < total {
            let mut state = self.gate.lock();

            while state.buffer()?.free_space() == 0 {
                if !blocking {
                    return Err(DeviceError::WouldBlock);
                }
                log::debug!("sortdev{}: writer going to sleep", self.index);
                if self
                    .gate
                    .wait(&mut state, Condition::SpaceAvailable, pending)
                    .is_err()
                {
                    log::debug!(
                        "sortdev{}: writer interrupted after {written} of {total} bytes",
                        self.index
                    );
                    return Ok(written);
                }
            }

            let buffer = state.buffer_mut()?;
            let chunk = (total - written).min(buffer.free_space());
            buffer.put(src, written, chunk).inspect_err(|_| {
                log::error!("sortdev{}: fault copying data in from caller", self.index);
            })?;
            written += chunk;
            drop(state);

            self.gate.wake(Condition::DataAvailable);
        }

        self.notifier.notify(DeviceEvent::DataAvailable);
        log::debug!("sortdev{}: wrote {written} bytes", self.index);
        Ok(written)
    }

    pub(crate) fn poll(&self) -> Result<Readiness, DeviceError> {
        let state = self.gate.lock();
        let buffer = state.buffer()?;
        Ok(Readiness {
            readable: buffer.has_data(),
            writable: buffer.free_space() > 0,
        })
    }

    /// Undo the counters bumped by `open`; never fails
    pub(crate) fn release(&self, handle: Handle, mode: AccessMode) {
        self.notifier.deregister(handle);

        let mut state = self.gate.lock();
        if mode.readable() {
            state.readers = decrement(state.readers, "readers", self.index);
        }
        if mode.writable() {
            state.writers = decrement(state.writers, "writers", self.index);
        }
    }

    pub(crate) fn ioctl(&self, cmd: u32, arg: &CommandArg<'_>) -> Result<(), DeviceError> {
        match Command::decode(cmd, arg)? {
            Command::Reset => self.reset(),
        }
        Ok(())
    }

    fn reset(&self) {
        let mut state = self.gate.lock();
        if let Some(buffer) = state.buffer.as_mut() {
            buffer.clear();
        }
        // Open sessions are not tracked individually, so the counters drift
        // from reality until those sessions close.
        state.readers = 0;
        state.writers = 0;
        drop(state);

        self.gate.wake(Condition::SpaceAvailable);
        log::debug!("sortdev{}: reset", self.index);
    }
}

fn decrement(count: usize, what: &str, index: usize) -> usize {
    if count == 0 {
        log::warn!("sortdev{index}: close with {what} already at 0 (reset while open?)");
    }
    count.saturating_sub(1)
}

/// Cloneable handle to one sort device
#[derive(Clone)]
pub struct SortDevice {
    shared: Arc<DeviceShared>,
}

impl SortDevice {
    /// Device with `capacity` bytes of storage and its own notification queue.
    ///
    /// One byte is always held back, so `capacity` below
    /// [`MIN_BUFFER_SIZE`] gives a device that never accepts data: blocking
    /// writes wait until interrupted, non-blocking ones get `WouldBlock`.
    /// [`DeviceConfig::validate`] rejects such sizes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::create(0, capacity, Arc::new(NotificationQueue::new()))
    }

    #[must_use]
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self::new(config.buffer_size)
    }

    /// Like [`SortDevice::new`], reporting to `notifier`
    #[must_use]
    pub fn with_notifier(capacity: usize, notifier: Arc<dyn AsyncNotifier>) -> Self {
        Self::create(0, capacity, notifier)
    }

    pub(crate) fn create(index: usize, capacity: usize, notifier: Arc<dyn AsyncNotifier>) -> Self {
        if capacity < MIN_BUFFER_SIZE {
            log::warn!("sortdev{index}: capacity {capacity} cannot hold any data");
        }
        Self {
            shared: Arc::new(DeviceShared {
                index,
                capacity,
                gate: SyncGate::new(DeviceState::default()),
                notifier,
                ids: IdGen::new(),
            }),
        }
    }

    /// Position of the device within its set
    #[must_use]
    pub fn index(&self) -> usize {
        self.shared.index
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Open a session, allocating the storage on first use.
    ///
    /// `blocking` is fixed for the life of the session.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if the storage cannot be allocated; no session is created.
    pub fn open(&self, mode: AccessMode, blocking: bool) -> Result<Session, DeviceError> {
        let mut state = self.shared.gate.lock();
        if state.buffer.is_none() {
            state.buffer = Some(SharedBuffer::try_new(self.shared.capacity)?);
            log::debug!(
                "sortdev{}: allocated {} bytes",
                self.shared.index,
                self.shared.capacity
            );
        }
        if mode.readable() {
            state.readers += 1;
        }
        if mode.writable() {
            state.writers += 1;
        }
        drop(state);

        let handle = self.shared.ids.next_handle();
        Ok(Session::new(handle, mode, blocking, Arc::clone(&self.shared)))
    }

    /// Run an administrative command.
    ///
    /// # Errors
    ///
    /// See [`Command::decode`]; rejected commands leave the device untouched.
    pub fn ioctl(&self, cmd: u32, arg: CommandArg<'_>) -> Result<(), DeviceError> {
        self.shared.ioctl(cmd, &arg)
    }

    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        let state = self.shared.gate.lock();
        let (allocated, read_cursor, write_cursor) = match state.buffer.as_ref() {
            Some(buffer) => (true, buffer.read_cursor(), buffer.write_cursor()),
            None => (false, 0, 0),
        };
        DeviceStatus {
            capacity: self.shared.capacity,
            allocated,
            read_cursor,
            write_cursor,
            readers: state.readers,
            writers: state.writers,
        }
    }
}

impl std::fmt::Debug for SortDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        write!(
            f,
            "SortDevice(index={}, capacity={}, rp={}, wp={}, readers={}, writers={})",
            self.shared.index,
            status.capacity,
            status.read_cursor,
            status.write_cursor,
            status.readers,
            status.writers
        )
    }
}
