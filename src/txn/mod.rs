//! # Transactions
//!
//! A [`Transaction`] is a short-lived scope over a [`Database`] that gives
//! callers copy-on-write isolation. Reads resolve first against the
//! transaction's own modified-page table and fall back to the file mapping;
//! the first modification of a page clones it into an owned, aligned buffer
//! and every later read or write inside the transaction sees that clone.
//! Commit pushes the dirty buffers back to the file; dropping the
//! transaction without committing discards them (rollback).
//!
//! ## Lifecycle
//!
//! ```text
//!             Database::begin
//!    [absent] ---------------> [open]
//!                               |  get_page / modify_page (self-loop)
//!                               |
//!                commit         v
//!    [open] ----------------> [committing] -- on error --> [open, error
//!        \                      |                           reported]
//!         \                     | success                  /
//!          \                    v                         /
//!           -----------------> [closeable] <-------------
//!                               |
//!                    drop/close |
//!                               v
//!                            [absent]
//! ```
//!
//! A failed commit leaves the transaction open: the buffers that were not
//! yet written are still owned by the table and are released when the
//! transaction is dropped. Ownership makes double-close unrepresentable;
//! `close()` exists as the explicit spelling of "discard this scope".
//!
//! ## Isolation
//!
//! Modified buffers are private to the transaction that owns them. Another
//! transaction on the same database reads the mapping and therefore sees
//! the pre-modification bytes until a commit lands. Nothing here locks:
//! the caller keeps at most one write-intent transaction live per database.
//!
//! ## Overflow Pages
//!
//! A page whose metadata declares `overflow_size > PAGE_SIZE` is the head
//! of a contiguous run; the whole run is cloned on modify and written back
//! as one unit on commit. When a caller requests a different size than the
//! metadata records, the buffer covers the larger of the two.

mod page_table;

use eyre::{Result, WrapErr};
use tracing::debug;

use crate::config::{overflow_page_count, METADATA_ENTRY_SIZE, PAGE_SIZE};
use crate::database::Database;
use crate::error::PagerError;
use crate::memory::PageBuf;
use crate::storage::{entry_index_of, is_metadata_page, metadata_page_of, PageMetadata, PageType};

use page_table::PageTable;

/// Flags word for [`Database::begin`]. No flag bits are recognized in this
/// revision; any other value is rejected so future bits stay meaningful.
pub const TXN_NONE: u32 = 0;

const RECOGNIZED_TXN_FLAGS: u32 = 0;

/// Read-only view of a page, either the transaction's own modified buffer
/// or a zero-copy slice of the file mapping.
#[derive(Debug)]
pub struct PageRef<'a> {
    page_num: u64,
    overflow_size: u32,
    data: &'a [u8],
}

impl PageRef<'_> {
    pub fn page_num(&self) -> u64 {
        self.page_num
    }

    /// Overflow run length in bytes as recorded in metadata; zero for an
    /// ordinary single page.
    pub fn overflow_size(&self) -> u32 {
        self.overflow_size
    }

    pub fn data(&self) -> &[u8] {
        self.data
    }
}

impl std::ops::Deref for PageRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

/// Writable view of a transaction-owned copy-on-write buffer.
#[derive(Debug)]
pub struct PageMut<'a> {
    page_num: u64,
    overflow_size: u32,
    data: &'a mut [u8],
}

impl PageMut<'_> {
    pub fn page_num(&self) -> u64 {
        self.page_num
    }

    /// Byte length the buffer was sized for; always a whole number of pages
    /// once rounded up.
    pub fn overflow_size(&self) -> u32 {
        self.overflow_size
    }

    pub fn data(&self) -> &[u8] {
        self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }
}

impl std::ops::Deref for PageMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl std::ops::DerefMut for PageMut<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data
    }
}

#[derive(Debug)]
pub struct Transaction<'db> {
    db: &'db Database,
    flags: u32,
    table: PageTable,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db Database, flags: u32) -> Result<Self> {
        if flags & !RECOGNIZED_TXN_FLAGS != 0 {
            return Err(PagerError::UnknownFlags { flags }.into());
        }

        Ok(Self {
            db,
            flags,
            table: PageTable::new().wrap_err("unable to allocate transaction state")?,
        })
    }

    /// The flags word this transaction was opened with.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Number of pages this transaction has modified.
    pub fn modified_pages(&self) -> usize {
        self.table.modified_pages()
    }

    /// Reads a page. A page modified earlier in this transaction comes back
    /// from its copy-on-write buffer; anything else is a zero-copy slice of
    /// the mapping covering the page's whole overflow run.
    pub fn get_page(&self, page_num: u64) -> Result<PageRef<'_>> {
        if let Some((buf, overflow_size)) = self.table.get(page_num) {
            return Ok(PageRef {
                page_num,
                overflow_size,
                data: buf.as_slice(),
            });
        }

        // range-check the page itself before touching its metadata
        self.db.storage().page_run(page_num, 1)?;

        let overflow_size = self.resolve_overflow_size(page_num)?;
        let data = self
            .db
            .storage()
            .page_run(page_num, overflow_page_count(overflow_size))?;

        Ok(PageRef {
            page_num,
            overflow_size,
            data,
        })
    }

    /// Returns a writable buffer for `page_num`, cloning the page's run out
    /// of the mapping on first call. Within one transaction the call is
    /// idempotent: later calls return the same buffer without re-copying.
    pub fn modify_page(&mut self, page_num: u64) -> Result<PageMut<'_>> {
        self.modify_page_with(page_num, 0)
    }

    /// Like [`modify_page`](Self::modify_page) with an explicit overflow
    /// size request in bytes (zero means one page). The buffer covers the
    /// larger of the request and the size recorded in the page's metadata.
    pub fn modify_page_with(&mut self, page_num: u64, overflow_size: u32) -> Result<PageMut<'_>> {
        if self.table.get(page_num).is_some() {
            let (buf, overflow_size) = self
                .table
                .get_mut(page_num)
                .ok_or_else(|| eyre::eyre!("page {page_num} vanished from the page table"))?;
            return Ok(PageMut {
                page_num,
                overflow_size,
                data: buf.as_mut_slice(),
            });
        }

        let requested = if overflow_size == 0 {
            PAGE_SIZE as u32
        } else {
            overflow_size
        };

        // range-check the page itself before touching its metadata
        self.db.storage().page_run(page_num, 1)?;

        let original = self.resolve_overflow_size(page_num)?;
        let effective = requested.max(original);
        let pages = overflow_page_count(effective);

        let src = self.db.storage().page_run(page_num, pages)?;
        let mut buf = PageBuf::allocate(pages)
            .wrap_err("unable to allocate memory for a copy-on-write page")?;
        buf.as_mut_slice().copy_from_slice(src);

        self.table
            .insert(page_num, effective, buf)
            .wrap_err_with(|| format!("failed to record page {page_num} in the transaction"))?;

        let (buf, overflow_size) = self
            .table
            .get_mut(page_num)
            .ok_or_else(|| eyre::eyre!("page {page_num} missing from the page table after insert"))?;
        Ok(PageMut {
            page_num,
            overflow_size,
            data: buf.as_mut_slice(),
        })
    }

    /// Writes every modified buffer back to the database file.
    ///
    /// Stops at the first I/O failure with the transaction left open; pages
    /// written before the failure are already in the file, so commit is not
    /// atomic and provides no durability beyond the OS page cache.
    pub fn commit(&mut self) -> Result<()> {
        let db = self.db;
        let mut written = 0usize;

        for bucket in self.table.slots_mut() {
            let Some(buf) = bucket.buf.as_ref() else {
                continue;
            };

            db.storage()
                .write_run(bucket.page_num, buf.as_slice())
                .wrap_err("commit stopped at the first failed page write")?;

            // ownership of the committed bytes has moved to the file
            bucket.buf = None;
            written += 1;
        }

        debug!(pages = written, "transaction committed");
        Ok(())
    }

    /// Discards the transaction. Uncommitted buffers are released without
    /// being written, which is the rollback path; dropping the transaction
    /// does exactly the same.
    pub fn close(self) {}

    /// Metadata entry describing `page_num`, resolved through its owning
    /// metadata page (the transaction's modified copy if there is one).
    pub fn get_metadata(&self, page_num: u64) -> Result<&PageMetadata> {
        let meta_page_num = metadata_page_of(page_num);

        let page = match self.table.get(meta_page_num) {
            Some((buf, _)) => buf.as_slice(),
            None => self.db.storage().page_run(meta_page_num, 1)?,
        };

        metadata_entry(page, page_num, meta_page_num)
    }

    /// Writable metadata entry for `page_num`. The owning metadata page is
    /// pulled into the transaction first, so the write follows the same
    /// copy-on-write path as any other page.
    pub fn modify_metadata(&mut self, page_num: u64) -> Result<&mut PageMetadata> {
        let meta_page_num = metadata_page_of(page_num);
        self.modify_page(meta_page_num)?;

        let (buf, _) = self
            .table
            .get_mut(meta_page_num)
            .ok_or_else(|| eyre::eyre!("metadata page {meta_page_num} missing after modify"))?;

        metadata_entry_mut(buf.as_mut_slice(), page_num, meta_page_num)
    }

    fn resolve_overflow_size(&self, page_num: u64) -> Result<u32> {
        // a metadata page describes itself; resolving it through the
        // accessor would recurse, and its run is always one page
        if is_metadata_page(page_num) {
            return Ok(PAGE_SIZE as u32);
        }

        Ok(self.get_metadata(page_num)?.overflow_size())
    }
}

fn metadata_entry(page: &[u8], page_num: u64, meta_page_num: u64) -> Result<&PageMetadata> {
    check_metadata_tag(page, page_num, meta_page_num)?;

    let offset = entry_index_of(page_num) * METADATA_ENTRY_SIZE;
    PageMetadata::from_bytes(&page[offset..])
}

fn metadata_entry_mut(
    page: &mut [u8],
    page_num: u64,
    meta_page_num: u64,
) -> Result<&mut PageMetadata> {
    check_metadata_tag(page, page_num, meta_page_num)?;

    let offset = entry_index_of(page_num) * METADATA_ENTRY_SIZE;
    PageMetadata::from_bytes_mut(&mut page[offset..])
}

fn check_metadata_tag(page: &[u8], page_num: u64, meta_page_num: u64) -> Result<()> {
    // the first entry of a metadata page describes the page itself and
    // carries the tag that proves we are looking at metadata at all
    let first = PageMetadata::from_bytes(page)?;
    if first.page_type() != Some(PageType::Metadata) {
        return Err(PagerError::NotAMetadataPage {
            meta_page_num,
            page_num,
            found_type: first.type_byte(),
        }
        .into());
    }
    Ok(())
}
