//! # Memory-Mapped File Storage
//!
//! This module implements `MmapStorage`, the file adapter underneath the
//! transaction layer. It opens, sizes, and memory-maps a database file, and
//! exposes exactly two data paths:
//!
//! - `page_run`: a read-only slice into the mapping covering a run of pages
//! - `write_run`: a positional write of a page run back to the file
//!
//! ## Read Path vs Write Path
//!
//! The mapping is deliberately read-only. All reads resolve through the OS
//! page cache via the mapping with zero copies; all writes go through
//! positional file writes. Because the mapping is `MAP_SHARED` over the same
//! file, a committed write becomes visible to every mapping of the file
//! without remapping.
//!
//! Nothing in this module calls fsync. Commit pushes bytes into the page
//! cache and no further; a `sync` hook exists for layers that want more.
//!
//! ## File Format
//!
//! The file is a flat array of `PAGE_SIZE`-byte pages indexed from 0:
//!
//! ```text
//! Offset 0:        Page 0
//! Offset 8192:     Page 1
//! Offset 16384:    Page 2
//! ...
//! ```
//!
//! The file size is always a multiple of `PAGE_SIZE`; `open` rejects
//! anything else.
//!
//! ## Safety Considerations
//!
//! Memory-mapped regions become invalid when remapped (during `grow()`).
//! Rather than hazard pointers or epoch tracking, the borrow checker
//! enforces safety at compile time: `page_run(&self)` borrows the storage
//! immutably while `grow(&mut self)` needs it exclusively, so no page slice
//! can outlive a remap.

use std::fs::{File, OpenOptions};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::Mmap;
use tracing::debug;

use crate::config::PAGE_SIZE;
use crate::error::PagerError;

#[derive(Debug)]
pub struct MmapStorage {
    file: File,
    map: Mmap,
    page_count: u64,
}

impl MmapStorage {
    /// Creates a database file of exactly `page_count` zeroed pages and maps
    /// it. Truncates any existing file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, page_count: u64) -> Result<Self> {
        let path = path.as_ref();

        ensure!(page_count > 0, "initial page count must be at least 1");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create database file '{}'", path.display()))?;

        let file_size = page_count * PAGE_SIZE as u64;
        file.set_len(file_size)
            .wrap_err_with(|| format!("failed to size database file to {} bytes", file_size))?;

        let map = Self::map(&file, path)?;

        debug!(path = %path.display(), page_count, "created database file");

        Ok(Self {
            file,
            map,
            page_count,
        })
    }

    /// Opens and maps an existing database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open database file '{}'", path.display()))?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?
            .len();

        ensure!(
            file_size > 0,
            "cannot open empty database file '{}'",
            path.display()
        );

        ensure!(
            file_size % PAGE_SIZE as u64 == 0,
            "database file '{}' size {} is not a multiple of page size {}",
            path.display(),
            file_size,
            PAGE_SIZE
        );

        let page_count = file_size / PAGE_SIZE as u64;
        let map = Self::map(&file, path)?;

        debug!(path = %path.display(), page_count, "opened database file");

        Ok(Self {
            file,
            map,
            page_count,
        })
    }

    fn map(file: &File, path: &Path) -> Result<Mmap> {
        // SAFETY: mapping a file is unsafe because external truncation would
        // invalidate the region. The file is opened read+write by this
        // process and database files are not shared with external writers;
        // every access goes through page_run which bounds-checks against the
        // size captured at map time.
        unsafe {
            Mmap::map(file).wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))
        }
    }

    /// Returns a read-only slice covering `pages` whole pages starting at
    /// `page_num`. Fails with an invalid-argument error when the run does
    /// not fit inside the file.
    pub fn page_run(&self, page_num: u64, pages: usize) -> Result<&[u8]> {
        let end = page_num
            .checked_add(pages as u64)
            .filter(|&end| end <= self.page_count)
            .ok_or(PagerError::PageOutOfBounds {
                page_num,
                page_count: self.page_count,
            })?;

        let start = page_num as usize * PAGE_SIZE;
        let len = (end - page_num) as usize * PAGE_SIZE;
        Ok(&self.map[start..start + len])
    }

    /// Writes a whole-page buffer to the file at `page_num`'s offset.
    ///
    /// The write lands in the OS page cache; no sync is implied.
    pub fn write_run(&self, page_num: u64, data: &[u8]) -> Result<()> {
        ensure!(
            data.len() % PAGE_SIZE == 0,
            "page write of {} bytes is not a whole number of pages",
            data.len()
        );

        let pages = data.len() / PAGE_SIZE;
        let in_bounds = page_num
            .checked_add(pages as u64)
            .is_some_and(|end| end <= self.page_count);
        if !in_bounds {
            return Err(PagerError::PageOutOfBounds {
                page_num,
                page_count: self.page_count,
            }
            .into());
        }

        self.write_at(page_num * PAGE_SIZE as u64, data)
            .map_err(|source| PagerError::WriteFailed { page_num, source }.into())
    }

    #[cfg(unix)]
    fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.write_all_at(data, offset)
    }

    #[cfg(not(unix))]
    fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)
    }

    /// Extends the file to at least `min_page_count` pages and remaps.
    /// Idempotent: a smaller or equal request is a no-op.
    pub fn grow(&mut self, min_page_count: u64) -> Result<()> {
        if min_page_count <= self.page_count {
            return Ok(());
        }

        let new_size = min_page_count * PAGE_SIZE as u64;
        self.file
            .set_len(new_size)
            .wrap_err_with(|| format!("failed to extend database file to {} bytes", new_size))?;

        // SAFETY: same contract as map(); grow() holds &mut self so no page
        // slice can be alive across the remap.
        self.map = unsafe {
            Mmap::map(&self.file).wrap_err("failed to remap database file after grow")?
        };
        self.page_count = min_page_count;

        Ok(())
    }

    /// Flushes file data to the device. Never called by commit.
    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_data()
            .wrap_err("failed to sync database file")
    }

    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    pub fn file_size(&self) -> u64 {
        self.page_count * PAGE_SIZE as u64
    }
}
