//! # Modified-Page Table
//!
//! Open-addressed, linear-probing hash table mapping page numbers to the
//! copy-on-write buffers a transaction owns. This is the transaction's whole
//! working set, kept in one contiguous allocation of buckets so lookups stay
//! cache-friendly on the hot `get_page`/`modify_page` path.
//!
//! ## Layout
//!
//! ```text
//! +-----------------------------------------------------------+
//! | bucket[0] | bucket[1] | ...                 | bucket[n-1] |
//! +-----------------------------------------------------------+
//!   n is a power of two; a bucket is {page_num, overflow_size,
//!   Option<PageBuf>} and is empty exactly when the buffer is None.
//! ```
//!
//! ## Probing and Growth
//!
//! A page's home bucket is `page_num % n`; collisions walk forward one
//! bucket at a time, wrapping. The table doubles when an insert would push
//! occupancy past 75%, which keeps probe chains short and insert amortized
//! O(1).
//!
//! Doubling allocates the new bucket array fallibly. When that allocation is
//! refused the table keeps accepting inserts past the threshold instead of
//! failing the transaction; only a table that is completely full and still
//! cannot grow reports out-of-memory. Short transactions survive transient
//! memory pressure this way.
//!
//! ## Invariants
//!
//! - no two occupied buckets share a page number
//! - for an occupied bucket at index `i` holding page `p`, every bucket from
//!   `p % n` up to `i` (wrapping, exclusive) is occupied
//! - every occupied bucket's buffer is page-aligned, whole-page sized, and
//!   uniquely owned by this table

use eyre::Result;
use tracing::warn;

use crate::config::INITIAL_BUCKET_COUNT;
use crate::error::PagerError;
use crate::memory::PageBuf;

#[derive(Debug)]
pub(crate) struct Bucket {
    pub(crate) page_num: u64,
    pub(crate) overflow_size: u32,
    pub(crate) buf: Option<PageBuf>,
}

impl Bucket {
    fn empty() -> Self {
        Self {
            page_num: 0,
            overflow_size: 0,
            buf: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpandStatus {
    Expanded,
    /// The larger bucket array could not be allocated. The caller keeps the
    /// current table and may fill it to capacity.
    NoMem,
}

#[derive(Debug)]
pub(crate) struct PageTable {
    buckets: Vec<Bucket>,
    modified_pages: usize,
}

impl PageTable {
    pub(crate) fn new() -> Result<Self> {
        let buckets = Self::alloc_buckets(INITIAL_BUCKET_COUNT).map_err(|_| {
            PagerError::OutOfMemory {
                bytes: INITIAL_BUCKET_COUNT * std::mem::size_of::<Bucket>(),
                what: "transaction page table",
            }
        })?;

        Ok(Self {
            buckets,
            modified_pages: 0,
        })
    }

    fn alloc_buckets(count: usize) -> Result<Vec<Bucket>, std::collections::TryReserveError> {
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(count)?;
        buckets.resize_with(count, Bucket::empty);
        Ok(buckets)
    }

    /// Number of pages ever inserted into this table. Commit clears bucket
    /// buffers but does not decrement this count.
    pub(crate) fn modified_pages(&self) -> usize {
        self.modified_pages
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn probe_index(&self, page_num: u64) -> Option<usize> {
        let n = self.buckets.len();
        let start = (page_num % n as u64) as usize;

        for i in 0..n {
            let idx = (start + i) & (n - 1);
            let bucket = &self.buckets[idx];
            if bucket.buf.is_none() {
                return None;
            }
            if bucket.page_num == page_num {
                return Some(idx);
            }
        }
        None
    }

    pub(crate) fn get(&self, page_num: u64) -> Option<(&PageBuf, u32)> {
        let idx = self.probe_index(page_num)?;
        let bucket = &self.buckets[idx];
        bucket.buf.as_ref().map(|buf| (buf, bucket.overflow_size))
    }

    pub(crate) fn get_mut(&mut self, page_num: u64) -> Option<(&mut PageBuf, u32)> {
        let idx = self.probe_index(page_num)?;
        let bucket = &mut self.buckets[idx];
        let overflow_size = bucket.overflow_size;
        bucket.buf.as_mut().map(|buf| (buf, overflow_size))
    }

    /// Walks the probe chain for `page_num`, failing on an occupied bucket
    /// with the same page number. `Ok(None)` means the table is completely
    /// full.
    fn find_insert_slot(&self, page_num: u64) -> Result<Option<usize>> {
        let n = self.buckets.len();
        let start = (page_num % n as u64) as usize;

        for i in 0..n {
            let idx = (start + i) & (n - 1);
            let bucket = &self.buckets[idx];
            match &bucket.buf {
                Some(_) if bucket.page_num == page_num => {
                    return Err(PagerError::DuplicatePageEntry { page_num }.into());
                }
                Some(_) => continue,
                None => return Ok(Some(idx)),
            }
        }
        Ok(None)
    }

    /// Takes ownership of `buf` and records it for `page_num`. The caller
    /// must have checked `get` first; a second insert for the same page
    /// number fails with invalid-argument and drops the buffer.
    pub(crate) fn insert(&mut self, page_num: u64, overflow_size: u32, buf: PageBuf) -> Result<()> {
        match self.find_insert_slot(page_num)? {
            Some(idx) => {
                self.buckets[idx] = Bucket {
                    page_num,
                    overflow_size,
                    buf: Some(buf),
                };
                self.modified_pages += 1;

                // grow once the next insert would reach 3/4 occupancy
                if (self.modified_pages + 1) * 4 < self.buckets.len() * 3 {
                    return Ok(());
                }
                match self.expand()? {
                    ExpandStatus::Expanded => Ok(()),
                    // the entry is already placed; running past the load
                    // factor beats failing the transaction
                    ExpandStatus::NoMem => Ok(()),
                }
            }
            None => match self.expand()? {
                ExpandStatus::Expanded => self.insert(page_num, overflow_size, buf),
                ExpandStatus::NoMem => Err(PagerError::OutOfMemory {
                    bytes: self.buckets.len() * 2 * std::mem::size_of::<Bucket>(),
                    what: "transaction page table expansion",
                }
                .into()),
            },
        }
    }

    fn expand(&mut self) -> Result<ExpandStatus> {
        let new_count = self.buckets.len() * 2;
        let mut new_buckets = match Self::alloc_buckets(new_count) {
            Ok(buckets) => buckets,
            Err(_) => {
                warn!(
                    bucket_count = self.buckets.len(),
                    modified_pages = self.modified_pages,
                    "page table expansion refused, continuing over-full"
                );
                return Ok(ExpandStatus::NoMem);
            }
        };

        for old_idx in 0..self.buckets.len() {
            let Some(buf) = self.buckets[old_idx].buf.take() else {
                continue;
            };
            let page_num = self.buckets[old_idx].page_num;
            let overflow_size = self.buckets[old_idx].overflow_size;

            if !place_into(&mut new_buckets, page_num, overflow_size, buf) {
                // unreachable while the new table is strictly larger than
                // the entry count; surfaced instead of silently dropped
                return Err(eyre::eyre!(
                    "no empty bucket found for page {page_num} after page table expansion"
                ));
            }
        }

        self.buckets = new_buckets;
        Ok(ExpandStatus::Expanded)
    }

    /// Raw bucket access for commit and release paths.
    pub(crate) fn slots_mut(&mut self) -> &mut [Bucket] {
        &mut self.buckets
    }
}

fn place_into(buckets: &mut [Bucket], page_num: u64, overflow_size: u32, buf: PageBuf) -> bool {
    let n = buckets.len();
    let start = (page_num % n as u64) as usize;
    let mut buf = Some(buf);

    for i in 0..n {
        let idx = (start + i) & (n - 1);
        if buckets[idx].buf.is_none() {
            buckets[idx] = Bucket {
                page_num,
                overflow_size,
                buf: buf.take(),
            };
            return true;
        }
    }
    false
}
