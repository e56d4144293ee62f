//! Device error taxonomy
//!
//! Every failing device call returns a [`DeviceError`]. The variants map onto
//! the errno values a character device would report, onto `std::io::ErrorKind`
//! and onto `embedded_io::ErrorKind`.
//!
//! A write that is interrupted after transferring some bytes is not an error:
//! it returns `Ok(written)` and the caller compares the count.

use core::ffi::c_int;
use std::io;

use thiserror::Error;

pub const EINTR: c_int = 4;
pub const EBADF: c_int = 9;
pub const EAGAIN: c_int = 11;
pub const ENOMEM: c_int = 12;
pub const EFAULT: c_int = 14;
pub const ENODEV: c_int = 19;
pub const ENOTTY: c_int = 25;
pub const ESPIPE: c_int = 29;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// Non-blocking session could not proceed; retry later
    #[error("operation would block")]
    WouldBlock,

    /// Blocking wait cancelled from outside
    #[error("interrupted while waiting")]
    Interrupted,

    /// Caller-side region rejected the transfer
    #[error("bad address in caller buffer")]
    Fault,

    /// Lazy allocation of the device storage failed
    #[error("cannot allocate {0} bytes of device storage")]
    OutOfMemory(usize),

    /// Command belongs to the device family but is not implemented
    #[error("unsupported command {0:#010x}")]
    UnsupportedOperation(u32),

    /// Command is outside the device's command family
    #[error("command {0:#010x} is not a sort device command")]
    InvalidCommand(u32),

    /// Session was not opened with the access mode the call needs
    #[error("session not opened for {0}")]
    BadMode(&'static str),

    #[error("device is not seekable")]
    NotSeekable,

    #[error("no such device")]
    NoDevice,

    #[error("session is closed")]
    Closed,
}

impl DeviceError {
    /// Positive errno value a driver would report for this error
    #[must_use]
    pub fn errno(&self) -> c_int {
        match self {
            Self::WouldBlock => EAGAIN,
            Self::Interrupted => EINTR,
            Self::Fault => EFAULT,
            Self::OutOfMemory(_) => ENOMEM,
            Self::UnsupportedOperation(_) | Self::InvalidCommand(_) => ENOTTY,
            Self::BadMode(_) | Self::Closed => EBADF,
            Self::NotSeekable => ESPIPE,
            Self::NoDevice => ENODEV,
        }
    }

    #[must_use]
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::WouldBlock => io::ErrorKind::WouldBlock,
            Self::Interrupted => io::ErrorKind::Interrupted,
            Self::Fault => io::ErrorKind::InvalidInput,
            Self::OutOfMemory(_) => io::ErrorKind::OutOfMemory,
            Self::UnsupportedOperation(_) | Self::InvalidCommand(_) | Self::NotSeekable => {
                io::ErrorKind::Unsupported
            }
            Self::BadMode(_) => io::ErrorKind::PermissionDenied,
            Self::NoDevice => io::ErrorKind::NotFound,
            Self::Closed => io::ErrorKind::BrokenPipe,
        }
    }
}

impl From<DeviceError> for io::Error {
    fn from(e: DeviceError) -> Self {
        io::Error::new(e.io_kind(), e)
    }
}

impl embedded_io::Error for DeviceError {
    #[allow(clippy::match_same_arms)]
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::WouldBlock => embedded_io::ErrorKind::Other, // no WouldBlock in embedded-io
            Self::Interrupted => embedded_io::ErrorKind::Interrupted,
            Self::Fault => embedded_io::ErrorKind::InvalidInput,
            Self::OutOfMemory(_) => embedded_io::ErrorKind::OutOfMemory,
            Self::UnsupportedOperation(_) | Self::InvalidCommand(_) | Self::NotSeekable => {
                embedded_io::ErrorKind::Unsupported
            }
            Self::BadMode(_) => embedded_io::ErrorKind::PermissionDenied,
            Self::NoDevice => embedded_io::ErrorKind::NotFound,
            Self::Closed => embedded_io::ErrorKind::BrokenPipe,
        }
    }
}
