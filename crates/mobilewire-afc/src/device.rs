//! Raw filesystem primitives as exposed by a device connection.

use crate::error::{AfcError, Result};
use crate::protocol::FileMode;
use crate::status::AfcStatus;

/// Requested access for [`AfcDevice::file_open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    bits: u8,
}

impl OpenMode {
    pub const READ: Self = Self { bits: 1 };
    pub const WRITE: Self = Self { bits: 2 };
    pub const READ_WRITE: Self = Self { bits: 3 };

    /// Parse a mode string; `r` sets the read bit and `w` the write bit.
    pub fn parse(mode: &str) -> Result<Self> {
        let mut bits = 0;
        if mode.contains('r') {
            bits |= Self::READ.bits;
        }
        if mode.contains('w') {
            bits |= Self::WRITE.bits;
        }
        if bits == 0 {
            return Err(AfcError::Protocol(format!(
                "open mode {mode:?} requests neither read nor write"
            )));
        }
        Ok(Self { bits })
    }

    pub fn bits(self) -> u8 {
        self.bits
    }

    pub fn readable(self) -> bool {
        self.bits & Self::READ.bits != 0
    }

    pub fn writable(self) -> bool {
        self.bits & Self::WRITE.bits != 0
    }

    /// Service-level file mode for these access bits.
    pub fn file_mode(self) -> FileMode {
        match (self.readable(), self.writable()) {
            (true, true) => FileMode::ReadWrite,
            (false, true) => FileMode::WriteOnly,
            _ => FileMode::ReadOnly,
        }
    }
}

/// Filesystem primitives with the device's numeric statuses left intact.
///
/// `Err` is reserved for channel and framing failures. A refused operation
/// is `Ok` with a nonzero [`AfcStatus`].
pub trait AfcDevice {
    /// Open a file; a successful open yields the device file identifier.
    fn file_open(&mut self, path: &str, mode: OpenMode) -> Result<(AfcStatus, Option<u64>)>;

    /// Read up to `length` bytes; fewer bytes is not an error.
    fn file_read(&mut self, file: u64, length: usize) -> Result<(AfcStatus, Vec<u8>)>;

    fn file_write(&mut self, file: u64, data: &[u8]) -> Result<AfcStatus>;

    fn file_close(&mut self, file: u64) -> Result<AfcStatus>;

    fn make_directory(&mut self, path: &str) -> Result<AfcStatus>;

    /// Start enumerating `path`; yields a directory identifier.
    fn directory_open(&mut self, path: &str) -> Result<(AfcStatus, Option<u64>)>;

    /// Next entry name; `None` once enumeration is exhausted.
    fn directory_read(&mut self, dir: u64) -> Result<(AfcStatus, Option<String>)>;

    fn directory_close(&mut self, dir: u64) -> Result<AfcStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_bits() {
        assert_eq!(OpenMode::parse("r").unwrap(), OpenMode::READ);
        assert_eq!(OpenMode::parse("w").unwrap(), OpenMode::WRITE);
        assert_eq!(OpenMode::parse("rw").unwrap().bits(), 3);
        assert_eq!(OpenMode::parse("wb").unwrap().file_mode(), FileMode::WriteOnly);
        assert_eq!(OpenMode::READ_WRITE.file_mode(), FileMode::ReadWrite);
        assert_eq!(OpenMode::READ.file_mode(), FileMode::ReadOnly);
        assert!(OpenMode::parse("a").is_err());
    }
}
