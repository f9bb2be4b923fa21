//! File-backed persistent store

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{Eeprom, EepromAddr, check_range};
use crate::{Error, Result};

/// Persistent store kept in a fixed-size file
///
/// `init` creates the file if needed and zero-extends it to the configured
/// size; an existing larger file keeps its size.
#[derive(Debug)]
pub struct FileEeprom {
    path: PathBuf,
    size: u64,
    file: Option<File>,
}

impl FileEeprom {
    /// Describe a store at `path` of at least `size` bytes
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            file: None,
        }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| Error::Storage(format!("{} not initialised", self.path.display())))
    }
}

impl Eeprom for FileEeprom {
    fn init(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let current = file.metadata()?.len();
        if current < self.size {
            file.set_len(self.size)?;
        } else {
            self.size = current;
        }

        tracing::debug!(path = %self.path.display(), size = self.size, "eeprom opened");
        self.file = Some(file);
        Ok(())
    }

    fn read(&mut self, addr: EepromAddr, buf: &mut [u8]) -> Result<()> {
        check_range(addr, buf.len(), self.size)?;
        let file = self.file()?;
        file.seek(SeekFrom::Start(addr))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, addr: EepromAddr, buf: &[u8]) -> Result<()> {
        check_range(addr, buf.len(), self.size)?;
        let file = self.file()?;
        file.seek(SeekFrom::Start(addr))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            tracing::debug!(path = %self.path.display(), "eeprom closed");
        }
        Ok(())
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.size)
    }
}
