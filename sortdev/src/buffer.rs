//! Fixed-capacity device storage
//!
//! The buffer is a flat byte array with two cursors:
//!
//! ```text
//!  0            rp                 wp                C
//!  ├── consumed ─┼──── unread data ──┼──── free ──────┤
//! ```
//!
//! Reads advance `rp`, writes advance `wp`. There is no wraparound: consumed
//! space is reclaimed by [`SharedBuffer::compact`], which slides the unread
//! data back to offset 0.
//!
//! `SharedBuffer` has no locking of its own. It lives inside the device state
//! and every method is called with the device lock held.

use crate::error::DeviceError;
use crate::transfer::{CopyIn, CopyOut};

pub struct SharedBuffer {
    storage: Box<[u8]>,
    rp: usize,
    wp: usize,
}

impl SharedBuffer {
    /// Allocate `capacity` zeroed bytes with both cursors at 0.
    ///
    /// # Errors
    ///
    /// Returns `OutOfMemory` if the allocation cannot be satisfied.
    pub fn try_new(capacity: usize) -> Result<Self, DeviceError> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| DeviceError::OutOfMemory(capacity))?;
        storage.resize(capacity, 0);
        Ok(Self {
            storage: storage.into_boxed_slice(),
            rp: 0,
            wp: 0,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn read_cursor(&self) -> usize {
        self.rp
    }

    #[must_use]
    pub fn write_cursor(&self) -> usize {
        self.wp
    }

    /// Number of unread bytes
    #[must_use]
    pub fn data_len(&self) -> usize {
        self.wp - self.rp
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.rp != self.wp
    }

    /// The unread bytes, in their current order
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.storage[self.rp..self.wp]
    }

    /// Bytes a write may append right now.
    ///
    /// One byte of capacity is always held back, so a full buffer holds
    /// `capacity - 1` bytes.
    #[must_use]
    pub fn free_space(&self) -> usize {
        let capacity = self.capacity();
        if self.rp == self.wp {
            return capacity.saturating_sub(1);
        }
        (capacity - self.wp).saturating_sub(1)
    }

    /// Slide the unread data down to offset 0 and rebase both cursors.
    ///
    /// No-op when `rp` is already 0, so a second call in a row never moves
    /// anything.
    pub fn compact(&mut self) {
        if self.rp == 0 {
            return;
        }
        self.storage.copy_within(self.rp..self.wp, 0);
        self.wp -= self.rp;
        self.rp = 0;
    }

    /// Sort the unread bytes ascending, in place
    pub fn sort_unread(&mut self) {
        self.storage[self.rp..self.wp].sort_unstable();
    }

    /// Move up to `dst.out_len()` unread bytes out of the buffer.
    ///
    /// On success `rp` advances by the returned count. On fault the cursors
    /// are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `Fault` if `dst` rejects the copy.
    pub fn take<R: CopyOut + ?Sized>(&mut self, dst: &mut R) -> Result<usize, DeviceError> {
        let count = dst.out_len().min(self.data_len());
        let end = self.rp + count;
        dst.copy_out(&self.storage[self.rp..end])
            .map_err(|_| DeviceError::Fault)?;
        self.rp = end;
        Ok(count)
    }

    /// Copy `count` bytes of `src`, starting at `offset`, into the free segment.
    ///
    /// The caller clamps `count` to [`SharedBuffer::free_space`]. On fault the
    /// cursors are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `Fault` if `src` rejects the copy.
    pub fn put<W: CopyIn + ?Sized>(
        &mut self,
        src: &W,
        offset: usize,
        count: usize,
    ) -> Result<usize, DeviceError> {
        debug_assert!(count <= self.free_space());
        let end = self.wp + count;
        src.copy_in(offset, &mut self.storage[self.wp..end])
            .map_err(|_| DeviceError::Fault)?;
        self.wp = end;
        Ok(count)
    }

    /// Drop all buffered content and rewind both cursors
    pub fn clear(&mut self) {
        self.rp = 0;
        self.wp = 0;
    }
}

impl std::fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SharedBuffer(capacity={}, rp={}, wp={})",
            self.capacity(),
            self.rp,
            self.wp
        )
    }
}
