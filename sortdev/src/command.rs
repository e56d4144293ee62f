//! Administrative command codes
//!
//! Commands use the Linux ioctl request layout:
//!
//! ```text
//!  31 30 29            16 15        8 7          0
//! ┌─────┬────────────────┬───────────┬────────────┐
//! │ dir │      size      │   type    │     nr     │
//! └─────┴────────────────┴───────────┴────────────┘
//! ```
//!
//! The sort device owns the command family with type [`SORT_IOC_MAGIC`] and
//! numbers `0..=SORT_IOC_MAXNR`. Only [`SORT_IOC_RESET`] is implemented.
//!
//! Decoding rejects in this order, before any device state is touched:
//! 1. type or number outside the family → `InvalidCommand`
//! 2. argument region too small for the encoded size and direction → `Fault`
//! 3. anything but reset → `UnsupportedOperation`

use crate::error::DeviceError;

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;
const IOC_DIRBITS: u32 = 2;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

pub const IOC_NONE: u32 = 0;
pub const IOC_WRITE: u32 = 1;
pub const IOC_READ: u32 = 2;

pub const SORT_IOC_MAGIC: u8 = b'k';
pub const SORT_IOC_MAXNR: u8 = 14;

/// Discard buffered data and zero the session counters
pub const SORT_IOC_RESET: u32 = request_none(SORT_IOC_MAGIC, 0);

#[must_use]
pub const fn request_code(dir: u32, kind: u8, nr: u8, size: u32) -> u32 {
    (dir << IOC_DIRSHIFT)
        | ((kind as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | ((size & ((1 << IOC_SIZEBITS) - 1)) << IOC_SIZESHIFT)
}

#[must_use]
pub const fn request_none(kind: u8, nr: u8) -> u32 {
    request_code(IOC_NONE, kind, nr, 0)
}

/// Caller reads `size` bytes back through the argument
#[must_use]
pub const fn request_read(kind: u8, nr: u8, size: u32) -> u32 {
    request_code(IOC_READ, kind, nr, size)
}

/// Caller passes `size` bytes in through the argument
#[must_use]
pub const fn request_write(kind: u8, nr: u8, size: u32) -> u32 {
    request_code(IOC_WRITE, kind, nr, size)
}

#[must_use]
pub const fn request_readwrite(kind: u8, nr: u8, size: u32) -> u32 {
    request_code(IOC_READ | IOC_WRITE, kind, nr, size)
}

/// Field view of a raw request code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestCode(pub u32);

impl RequestCode {
    #[must_use]
    pub fn dir(self) -> u32 {
        (self.0 >> IOC_DIRSHIFT) & ((1 << IOC_DIRBITS) - 1)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn kind(self) -> u8 {
        ((self.0 >> IOC_TYPESHIFT) & ((1 << IOC_TYPEBITS) - 1)) as u8
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn nr(self) -> u8 {
        ((self.0 >> IOC_NRSHIFT) & ((1 << IOC_NRBITS) - 1)) as u8
    }

    #[must_use]
    pub fn size(self) -> usize {
        ((self.0 >> IOC_SIZESHIFT) & ((1 << IOC_SIZEBITS) - 1)) as usize
    }
}

/// Argument passed along with a command
#[derive(Debug)]
pub enum CommandArg<'a> {
    None,
    Value(u64),
    Region(&'a mut [u8]),
}

impl CommandArg<'_> {
    /// Can the argument carry `size` bytes in the encoded direction?
    #[must_use]
    pub fn accessible(&self, size: usize) -> bool {
        match self {
            Self::Region(region) => region.len() >= size,
            Self::None | Self::Value(_) => size == 0,
        }
    }
}

/// A command that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
}

impl Command {
    /// Validate `cmd` against the sort device family.
    ///
    /// # Errors
    ///
    /// `InvalidCommand` for foreign codes, `Fault` for an argument that cannot
    /// carry the encoded payload, `UnsupportedOperation` for unknown family
    /// members.
    pub fn decode(cmd: u32, arg: &CommandArg<'_>) -> Result<Self, DeviceError> {
        let code = RequestCode(cmd);
        if code.kind() != SORT_IOC_MAGIC || code.nr() > SORT_IOC_MAXNR {
            return Err(DeviceError::InvalidCommand(cmd));
        }

        if code.dir() & (IOC_READ | IOC_WRITE) != 0 && !arg.accessible(code.size()) {
            return Err(DeviceError::Fault);
        }

        match cmd {
            SORT_IOC_RESET => Ok(Self::Reset),
            _ => Err(DeviceError::UnsupportedOperation(cmd)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_code_fields() {
        let code = RequestCode(request_readwrite(SORT_IOC_MAGIC, 9, 4));
        assert_eq!(code.dir(), IOC_READ | IOC_WRITE);
        assert_eq!(code.kind(), b'k');
        assert_eq!(code.nr(), 9);
        assert_eq!(code.size(), 4);
    }

    #[test]
    fn test_reset_matches_linux_encoding() {
        // _IO('k', 0)
        assert_eq!(SORT_IOC_RESET, 0x6b00);
    }

    #[test]
    fn test_decode_reset() {
        assert_eq!(
            Command::decode(SORT_IOC_RESET, &CommandArg::None),
            Ok(Command::Reset)
        );
    }

    #[test]
    fn test_foreign_type_is_invalid() {
        let cmd = request_none(b'x', 0);
        assert_eq!(
            Command::decode(cmd, &CommandArg::None),
            Err(DeviceError::InvalidCommand(cmd))
        );
    }

    #[test]
    fn test_number_past_family_is_invalid_before_size_check() {
        // size would fail the access check, but the range check comes first
        let cmd = request_write(SORT_IOC_MAGIC, SORT_IOC_MAXNR + 1, 8);
        assert_eq!(
            Command::decode(cmd, &CommandArg::None),
            Err(DeviceError::InvalidCommand(cmd))
        );
    }

    #[test]
    fn test_missing_argument_region_faults() {
        let cmd = request_write(SORT_IOC_MAGIC, 1, 4);
        assert_eq!(
            Command::decode(cmd, &CommandArg::Value(7)),
            Err(DeviceError::Fault)
        );
    }

    #[test]
    fn test_family_member_without_handler_is_unsupported() {
        let cmd = request_none(SORT_IOC_MAGIC, 3);
        assert_eq!(
            Command::decode(cmd, &CommandArg::None),
            Err(DeviceError::UnsupportedOperation(cmd))
        );

        let mut region = [0u8; 4];
        let cmd = request_read(SORT_IOC_MAGIC, 5, 4);
        assert_eq!(
            Command::decode(cmd, &CommandArg::Region(&mut region)),
            Err(DeviceError::UnsupportedOperation(cmd))
        );
    }

    #[test]
    fn test_reset_with_direction_bits_is_not_reset() {
        let cmd = request_write(SORT_IOC_MAGIC, 0, 0);
        assert_eq!(
            Command::decode(cmd, &CommandArg::None),
            Err(DeviceError::UnsupportedOperation(cmd))
        );
    }
}
