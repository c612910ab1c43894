//! # Database Handle
//!
//! A [`Database`] is the shared handle over one open database file: the
//! file itself, its read-only mapping, and the page count. Transactions
//! borrow the handle, so the borrow checker guarantees the handle outlives
//! every transaction opened on it.
//!
//! ## File Initialization
//!
//! `create` sizes the file and seeds every metadata page (page 0 and each
//! further multiple of `PAGES_IN_METADATA`): the first entry is tagged
//! `PageType::Metadata` with a one-page overflow, which is what the
//! metadata accessor verifies before trusting any entry on the page. All
//! other bytes start zeroed.
//!
//! ## Concurrency
//!
//! The mapping is shared read-only across transactions; commit writes
//! mutate the file through positional writes. Nothing here locks, so the
//! caller keeps at most one write-intent transaction live per database at
//! a time. Read-only transactions may overlap freely.

use std::path::Path;

use eyre::{Result, WrapErr};
use zerocopy::IntoBytes;

use crate::config::{PAGES_IN_METADATA, PAGE_SIZE};
use crate::storage::{MmapStorage, PageMetadata, PageType};
use crate::txn::Transaction;

pub struct Database {
    storage: MmapStorage,
}

impl Database {
    /// Creates a database file of `page_count` pages with seeded metadata
    /// pages. Truncates any existing file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, page_count: u64) -> Result<Self> {
        let storage = MmapStorage::create(path, page_count)?;
        let db = Self { storage };
        db.initialize_metadata_pages()
            .wrap_err("failed to seed metadata pages")?;
        Ok(db)
    }

    /// Opens an existing database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            storage: MmapStorage::open(path)?,
        })
    }

    fn initialize_metadata_pages(&self) -> Result<()> {
        let mut entry = PageMetadata::new(PageType::Metadata);
        entry.set_overflow_size(PAGE_SIZE as u32);

        let mut page = vec![0u8; PAGE_SIZE];
        page[..entry.as_bytes().len()].copy_from_slice(entry.as_bytes());

        let mut meta_page_num = 0u64;
        while meta_page_num < self.storage.page_count() {
            self.storage.write_run(meta_page_num, &page)?;
            meta_page_num += PAGES_IN_METADATA as u64;
        }
        Ok(())
    }

    /// Opens a transaction on this database. The flags word is reserved;
    /// unknown bits are rejected with an invalid-argument error.
    pub fn begin(&self, flags: u32) -> Result<Transaction<'_>> {
        Transaction::new(self, flags)
    }

    /// Extends the file to at least `min_page_count` pages. New pages whose
    /// numbers fall on a metadata boundary are seeded like `create` does.
    pub fn grow(&mut self, min_page_count: u64) -> Result<()> {
        let old_count = self.storage.page_count();
        self.storage.grow(min_page_count)?;

        if self.storage.page_count() > old_count {
            let mut entry = PageMetadata::new(PageType::Metadata);
            entry.set_overflow_size(PAGE_SIZE as u32);

            let mut page = vec![0u8; PAGE_SIZE];
            page[..entry.as_bytes().len()].copy_from_slice(entry.as_bytes());

            let step = PAGES_IN_METADATA as u64;
            let mut meta_page_num = old_count.div_ceil(step) * step;
            while meta_page_num < self.storage.page_count() {
                self.storage.write_run(meta_page_num, &page)?;
                meta_page_num += step;
            }
        }
        Ok(())
    }

    /// Flushes the file to the device. Commit never calls this.
    pub fn sync(&self) -> Result<()> {
        self.storage.sync()
    }

    pub fn page_count(&self) -> u64 {
        self.storage.page_count()
    }

    pub(crate) fn storage(&self) -> &MmapStorage {
        &self.storage
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("page_count", &self.storage.page_count())
            .finish()
    }
}
