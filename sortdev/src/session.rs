//! Sessions on a sort device
//!
//! A [`Session`] is what `open` hands back: the caller's view of the device,
//! carrying the access mode and the blocking flag chosen at open time. All
//! sessions of a device share its one buffer; a session holds no data of its
//! own.
//!
//! # Thread Safety
//!
//! `read`, `write`, `poll` and `ioctl` take `&self`, so one session may be
//! shared between threads (like a file descriptor shared after `fork`). The
//! device lock serialises the calls. `close` and `set_async` take `&mut self`.
//!
//! # Cancellation
//!
//! [`Session::interrupter`] returns a cloneable [`Interrupter`]. Calling
//! [`Interrupter::interrupt`] from another thread cancels the session's
//! current blocking wait, or the next one if it is not waiting yet:
//! a read fails with `Interrupted`, a write returns the bytes it already
//! accepted.

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::command::CommandArg;
use crate::device::DeviceShared;
use crate::error::DeviceError;
use crate::gate::Pending;
use crate::idgen::Handle;
use crate::transfer::{CopyIn, CopyOut};

/// Access requested at open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    #[must_use]
    pub fn readable(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    #[must_use]
    pub fn writable(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Non-blocking readiness snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    /// A read would not block
    pub readable: bool,
    /// A write could place at least one byte without blocking
    pub writable: bool,
}

/// Cancels the blocking waits of one session
#[derive(Clone)]
pub struct Interrupter {
    pending: Arc<Pending>,
    device: Arc<DeviceShared>,
}

impl Interrupter {
    pub fn interrupt(&self) {
        self.device.interrupt(&self.pending);
    }
}

impl fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interrupter(pending={})", self.pending.is_raised())
    }
}

pub struct Session {
    handle: Handle,
    mode: AccessMode,
    blocking: bool,
    async_registered: bool,
    closed: bool,
    pending: Arc<Pending>,
    device: Arc<DeviceShared>,
}

impl Session {
    pub(crate) fn new(
        handle: Handle,
        mode: AccessMode,
        blocking: bool,
        device: Arc<DeviceShared>,
    ) -> Self {
        Self {
            handle,
            mode,
            blocking,
            async_registered: false,
            closed: false,
            pending: Arc::new(Pending::new()),
            device,
        }
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            pending: Arc::clone(&self.pending),
            device: Arc::clone(&self.device),
        }
    }

    fn check_open(&self) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        Ok(())
    }

    /// Read up to `dst.out_len()` bytes of the sorted unread data.
    ///
    /// Blocks while the device is empty unless the session is non-blocking.
    ///
    /// # Errors
    ///
    /// - `WouldBlock`: non-blocking session, nothing to read
    /// - `Interrupted`: the wait was cancelled, nothing was consumed
    /// - `Fault`: `dst` refused the bytes, nothing was consumed
    /// - `BadMode`, `Closed`: session cannot read
    pub fn read<R: CopyOut + ?Sized>(&self, dst: &mut R) -> Result<usize, DeviceError> {
        self.check_open()?;
        if !self.mode.readable() {
            return Err(DeviceError::BadMode("reading"));
        }
        self.device.read(self.blocking, &self.pending, dst)
    }

    /// Write all of `src`, blocking while the device is full.
    ///
    /// Returns fewer bytes than requested only if a wait was interrupted.
    ///
    /// # Errors
    ///
    /// - `WouldBlock`: non-blocking session found the device full
    /// - `Fault`: `src` refused to hand over its bytes
    /// - `BadMode`, `Closed`: session cannot write
    pub fn write<W: CopyIn + ?Sized>(&self, src: &W) -> Result<usize, DeviceError> {
        self.check_open()?;
        if !self.mode.writable() {
            return Err(DeviceError::BadMode("writing"));
        }
        self.device.write(self.blocking, &self.pending, src)
    }

    /// # Errors
    ///
    /// `Closed` on a closed session.
    pub fn poll(&self) -> Result<Readiness, DeviceError> {
        self.check_open()?;
        self.device.poll()
    }

    /// The device is a stream; positions are meaningless.
    ///
    /// # Errors
    ///
    /// Always `NotSeekable` (or `Closed`).
    pub fn seek(&self, _pos: io::SeekFrom) -> Result<u64, DeviceError> {
        self.check_open()?;
        Err(DeviceError::NotSeekable)
    }

    /// Run an administrative command on the session's device.
    ///
    /// # Errors
    ///
    /// See [`crate::SortDevice::ioctl`].
    pub fn ioctl(&self, cmd: u32, arg: CommandArg<'_>) -> Result<(), DeviceError> {
        self.check_open()?;
        self.device.ioctl(cmd, &arg)
    }

    /// Turn data-available notifications for this session on or off
    pub fn set_async(&mut self, on: bool) {
        if self.closed || on == self.async_registered {
            return;
        }
        if on {
            self.device.notifier().register(self.handle);
        } else {
            self.device.notifier().deregister(self.handle);
        }
        self.async_registered = on;
    }

    /// Close the session. Never fails; closing twice only logs a warning.
    pub fn close(&mut self) {
        if self.closed {
            log::warn!("Session::close() called on already closed session: {self:?}");
            return;
        }
        self.closed = true;
        self.async_registered = false;
        self.device.release(self.handle, self.mode);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session(handle={}, mode={:?}, blocking={}, async={}, closed={})",
            self.handle, self.mode, self.blocking, self.async_registered, self.closed
        )
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            self.close();
        }
    }
}

/// Write for the io trait adapters, where `Ok(0)` means end of stream.
///
/// A write interrupted before placing a byte becomes `Interrupted`.
fn trait_write(session: &Session, buf: &[u8]) -> Result<usize, DeviceError> {
    match session.write(buf)? {
        0 if !buf.is_empty() => Err(DeviceError::Interrupted),
        written => Ok(written),
    }
}

impl io::Read for Session {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Session::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Write for Session {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        trait_write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl embedded_io::ErrorType for Session {
    type Error = DeviceError;
}

impl embedded_io::Read for Session {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        // an empty read must not block here
        if buf.is_empty() {
            return Ok(0);
        }
        Session::read(self, buf)
    }
}

impl embedded_io::Write for Session {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        trait_write(self, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SortDevice;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_access_mode_bits() {
        assert!(AccessMode::Read.readable());
        assert!(!AccessMode::Read.writable());
        assert!(AccessMode::Write.writable());
        assert!(!AccessMode::Write.readable());
        assert!(AccessMode::ReadWrite.readable() && AccessMode::ReadWrite.writable());
    }

    #[test]
    fn test_wrong_mode_is_rejected() {
        let device = SortDevice::new(16);
        let reader = device.open(AccessMode::Read, false).unwrap();
        let writer = device.open(AccessMode::Write, false).unwrap();

        assert_eq!(reader.write(b"x"), Err(DeviceError::BadMode("writing")));
        let mut buf = [0u8; 4];
        assert_eq!(writer.read(&mut buf), Err(DeviceError::BadMode("reading")));
    }

    #[test]
    fn test_closed_session_rejects_io() {
        let device = SortDevice::new(16);
        let mut session = device.open(AccessMode::ReadWrite, false).unwrap();
        session.close();
        assert!(session.is_closed());
        assert_eq!(session.write(b"x"), Err(DeviceError::Closed));
        // second close is a no-op
        session.close();
        assert_eq!(device.status().readers, 0);
    }

    #[test]
    fn test_seek_is_refused() {
        let device = SortDevice::new(16);
        let session = device.open(AccessMode::Read, false).unwrap();
        assert_eq!(
            session.seek(io::SeekFrom::Start(0)),
            Err(DeviceError::NotSeekable)
        );
    }

    #[test]
    fn test_std_io_adapters() {
        use std::io::{Read, Write};

        let device = SortDevice::new(16);
        let mut session = device.open(AccessMode::ReadWrite, false).unwrap();
        Write::write_all(&mut session, b"cab").unwrap();

        let mut buf = [0u8; 8];
        let n = Read::read(&mut session, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"abc");

        let err = Read::read(&mut session, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    fn full_device_writer() -> (SortDevice, Session) {
        let device = SortDevice::new(4);
        let writer = device.open(AccessMode::Write, true).unwrap();
        writer.write(b"abc").unwrap();
        (device, writer)
    }

    #[test]
    fn test_embedded_write_all_interrupted_on_full_device() {
        let (device, mut writer) = full_device_writer();
        let interrupter = writer.interrupter();

        let task = thread::spawn(move || embedded_io::Write::write_all(&mut writer, b"xyz"));
        thread::sleep(Duration::from_millis(50));
        interrupter.interrupt();

        assert_eq!(task.join().unwrap(), Err(DeviceError::Interrupted));
        assert_eq!(device.status().write_cursor, 3);
    }

    #[test]
    fn test_std_write_interrupted_before_any_byte() {
        let (_device, mut writer) = full_device_writer();
        let interrupter = writer.interrupter();

        let task = thread::spawn(move || io::Write::write(&mut writer, b"x"));
        thread::sleep(Duration::from_millis(50));
        interrupter.interrupt();

        let err = task.join().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
    }

    #[test]
    fn test_inherent_write_still_reports_zero_when_interrupted() {
        let (_device, writer) = full_device_writer();
        writer.interrupter().interrupt();
        assert_eq!(writer.write(b"x"), Ok(0));
    }

    #[test]
    fn test_embedded_empty_read_does_not_block() {
        let device = SortDevice::new(16);
        let mut reader = device.open(AccessMode::Read, true).unwrap();

        let task = thread::spawn(move || {
            let mut empty: [u8; 0] = [];
            embedded_io::Read::read(&mut reader, &mut empty)
        });
        thread::sleep(Duration::from_millis(100));

        assert!(task.is_finished());
        assert_eq!(task.join().unwrap(), Ok(0));
    }
}
