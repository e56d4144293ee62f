//! Byte transfer across the caller boundary
//!
//! The device never touches a caller's memory directly. Reads push bytes out
//! through [`CopyOut`], writes pull bytes in through [`CopyIn`]. Either side
//! may refuse with [`Fault`], in which case the device aborts the call without
//! advancing its cursors.
//!
//! Plain byte slices and arrays implement both traits and never fault.

/// The caller-side region could not be accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault;

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "caller region fault")
    }
}

impl std::error::Error for Fault {}

/// Destination of a read
pub trait CopyOut {
    /// Bytes the region can accept; this is the read's maximum count
    fn out_len(&self) -> usize;

    /// Copy `src` to the start of the region.
    ///
    /// Called with `src.len() <= self.out_len()`.
    ///
    /// # Errors
    ///
    /// Returns `Fault` if the region cannot be written.
    fn copy_out(&mut self, src: &[u8]) -> Result<(), Fault>;
}

/// Source of a write
pub trait CopyIn {
    /// Total bytes the caller wants written
    fn in_len(&self) -> usize;

    /// Fill `dst` from the region starting at `offset`.
    ///
    /// Called with `offset + dst.len() <= self.in_len()`.
    ///
    /// # Errors
    ///
    /// Returns `Fault` if the region cannot be read.
    fn copy_in(&self, offset: usize, dst: &mut [u8]) -> Result<(), Fault>;
}

impl CopyOut for [u8] {
    fn out_len(&self) -> usize {
        self.len()
    }

    fn copy_out(&mut self, src: &[u8]) -> Result<(), Fault> {
        self.get_mut(..src.len())
            .ok_or(Fault)?
            .copy_from_slice(src);
        Ok(())
    }
}

impl<const N: usize> CopyOut for [u8; N] {
    fn out_len(&self) -> usize {
        N
    }

    fn copy_out(&mut self, src: &[u8]) -> Result<(), Fault> {
        self.as_mut_slice().copy_out(src)
    }
}

impl CopyIn for [u8] {
    fn in_len(&self) -> usize {
        self.len()
    }

    fn copy_in(&self, offset: usize, dst: &mut [u8]) -> Result<(), Fault> {
        let src = offset
            .checked_add(dst.len())
            .and_then(|end| self.get(offset..end))
            .ok_or(Fault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl<const N: usize> CopyIn for [u8; N] {
    fn in_len(&self) -> usize {
        N
    }

    fn copy_in(&self, offset: usize, dst: &mut [u8]) -> Result<(), Fault> {
        self.as_slice().copy_in(offset, dst)
    }
}

impl CopyIn for str {
    fn in_len(&self) -> usize {
        self.len()
    }

    fn copy_in(&self, offset: usize, dst: &mut [u8]) -> Result<(), Fault> {
        self.as_bytes().copy_in(offset, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_copy_out_writes_prefix() {
        let mut region = [0u8; 6];
        region.copy_out(b"abc").unwrap();
        assert_eq!(&region, b"abc\0\0\0");
    }

    #[test]
    fn test_slice_copy_out_too_long_faults() {
        let mut region = [0u8; 2];
        assert_eq!(region[..].copy_out(b"abc"), Err(Fault));
    }

    #[test]
    fn test_slice_copy_in_from_offset() {
        let mut dst = [0u8; 3];
        b"abcdef"[..].copy_in(2, &mut dst).unwrap();
        assert_eq!(&dst, b"cde");
    }

    #[test]
    fn test_slice_copy_in_out_of_range_faults() {
        let mut dst = [0u8; 4];
        assert_eq!("abc".copy_in(1, &mut dst), Err(Fault));
    }
}
