//! Read-only memory-mapped files.
//!
//! A [`MappedFile`] owns its mapping; dropping it unmaps the file. Slices
//! returned by [`MappedFile::slice`] borrow from the mapping and cannot outlive
//! it.

use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use log::debug;
use memmap2::{Mmap, MmapOptions};

use crate::error::{PtableError, Result};

/// A read-only memory map of one artifact file.
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    /// `None` for empty files, which cannot be mapped.
    mmap: Option<Mmap>,
}

impl MappedFile {
    /// Open and map `path`.
    ///
    /// Fails with [`PtableError::FileOpen`] when the file cannot be opened,
    /// sized or mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path).map_err(|e| PtableError::file_open(&path, e))?;
        let size = file
            .metadata()
            .map_err(|e| PtableError::file_open(&path, e))?
            .len();

        let mmap = if size == 0 {
            None
        } else {
            // SAFETY: artifacts are immutable once built; the mapping is never
            // written through and lives exactly as long as this value.
            let mmap = unsafe {
                MmapOptions::new()
                    .map(&file)
                    .map_err(|e| PtableError::file_open(&path, e))?
            };
            Some(mmap)
        };

        debug!("Mapped {} ({size} bytes)", path.display());

        Ok(MappedFile { path, mmap })
    }

    /// Path the mapping was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole mapped contents.
    pub fn as_slice(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => mmap,
            None => &[],
        }
    }

    /// Mapped size in bytes.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow `[offset, offset + length)`, or `None` if it leaves the mapping.
    pub fn slice(&self, offset: u64, length: u64) -> Option<&[u8]> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(usize::try_from(length).ok()?)?;
        self.as_slice().get(start..end)
    }
}

impl Deref for MappedFile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}
