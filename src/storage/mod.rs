//! Byte-addressable persistent store
//!
//! The directory persists through an [`Eeprom`] without knowing the medium.
//! A file-backed and an in-memory implementation are provided.

mod file;

pub use file::FileEeprom;

use crate::{Error, Result};

/// Address in the persistent store
pub type EepromAddr = u64;

/// Address-based persistent store
pub trait Eeprom {
    /// Prepare the store for use
    ///
    /// # Errors
    ///
    /// Returns error if the backing medium cannot be opened
    fn init(&mut self) -> Result<()>;

    /// Fill `buf` from `addr`
    ///
    /// # Errors
    ///
    /// Returns error if the range exceeds the store or the read fails
    fn read(&mut self, addr: EepromAddr, buf: &mut [u8]) -> Result<()>;

    /// Write `buf` at `addr`
    ///
    /// # Errors
    ///
    /// Returns error if the range exceeds the store or the write fails
    fn write(&mut self, addr: EepromAddr, buf: &[u8]) -> Result<()>;

    /// Flush and release the medium
    ///
    /// # Errors
    ///
    /// Returns error if pending data cannot be flushed
    fn close(&mut self) -> Result<()>;

    /// Size of the store in bytes
    ///
    /// # Errors
    ///
    /// Returns error if the size cannot be determined
    fn size(&mut self) -> Result<u64>;
}

/// Reject accesses that do not fit in a store of `size` bytes
pub(crate) fn check_range(addr: EepromAddr, len: usize, size: u64) -> Result<()> {
    let end = u64::try_from(len)
        .ok()
        .and_then(|len| addr.checked_add(len));
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::Storage(format!(
            "access of {len} bytes at {addr:#x} exceeds size {size:#x}"
        ))),
    }
}

/// Volatile store backed by a byte vector
#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    data: Vec<u8>,
}

impl MemoryEeprom {
    /// Create a zero-filled store of `size` bytes
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Raw contents
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Eeprom for MemoryEeprom {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn read(&mut self, addr: EepromAddr, buf: &mut [u8]) -> Result<()> {
        check_range(addr, buf.len(), self.data.len() as u64)?;
        #[allow(clippy::cast_possible_truncation)]
        let start = addr as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, addr: EepromAddr, buf: &[u8]) -> Result<()> {
        check_range(addr, buf.len(), self.data.len() as u64)?;
        #[allow(clippy::cast_possible_truncation)]
        let start = addr as usize;
        self.data[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_write_then_read() {
        let mut eeprom = MemoryEeprom::new(64);
        eeprom.write(10, &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 5];
        eeprom.read(9, &mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 0]);
    }

    #[test]
    fn memory_rejects_out_of_range() {
        let mut eeprom = MemoryEeprom::new(8);
        assert!(eeprom.write(6, &[0; 3]).is_err());
        assert!(eeprom.read(u64::MAX, &mut [0; 1]).is_err());
        assert_eq!(eeprom.as_bytes(), &[0; 8]);
    }

    #[test]
    fn check_range_boundaries() {
        assert!(check_range(0, 8, 8).is_ok());
        assert!(check_range(8, 0, 8).is_ok());
        assert!(check_range(8, 1, 8).is_err());
    }
}
