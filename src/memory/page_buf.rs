//! # Copy-on-Write Page Buffers
//!
//! A [`PageBuf`] is the owned, writable clone of a page run that a
//! transaction creates on first modification. The original page stays
//! untouched in the file mapping; all writes land in the buffer, and the
//! buffer's bytes are pushed back to the file at commit.
//!
//! ## Allocation Contract
//!
//! - size is always a whole number of pages (`pages * PAGE_SIZE`)
//! - the allocation is aligned to `PAGE_ALIGNMENT`
//! - memory comes back zeroed (callers overwrite it with the original page
//!   bytes immediately, but a short copy must not expose stale heap data)
//! - allocation failure is a first-class error, not an abort: the global
//!   allocator's null return maps to `PagerError::OutOfMemory`
//!
//! ## Ownership
//!
//! Each buffer has exactly one owner at a time: the transaction's
//! modified-page table between `modify_page` and either `commit` (where the
//! bytes are written out and the buffer dropped) or transaction drop (where
//! it is dropped unwritten). Buffers are never shared across transactions.

use std::alloc::{self, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

use eyre::Result;

use crate::config::{PAGE_ALIGNMENT, PAGE_SIZE};
use crate::error::PagerError;

/// An owned, page-aligned buffer covering one or more whole pages.
pub struct PageBuf {
    ptr: NonNull<u8>,
    pages: usize,
}

// SAFETY: PageBuf uniquely owns its allocation; moving it between threads
// moves ownership of the bytes with it.
unsafe impl Send for PageBuf {}

impl PageBuf {
    /// Allocates a zeroed buffer of `pages` whole pages, aligned to
    /// `PAGE_ALIGNMENT`.
    pub fn allocate(pages: usize) -> Result<Self> {
        debug_assert!(pages > 0, "page buffers cover at least one page");

        let bytes = pages * PAGE_SIZE;
        let layout = Layout::from_size_align(bytes, PAGE_ALIGNMENT)
            .map_err(|e| eyre::eyre!("invalid page buffer layout ({bytes} bytes): {e}"))?;

        // SAFETY: layout has non-zero size (pages >= 1) and a power-of-two
        // alignment, both checked above.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };

        let Some(ptr) = NonNull::new(ptr) else {
            return Err(PagerError::OutOfMemory {
                bytes,
                what: "copy-on-write page buffer",
            }
            .into());
        };

        Ok(Self { ptr, pages })
    }

    /// Number of whole pages this buffer covers.
    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Length of the buffer in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.pages * PAGE_SIZE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for len() bytes and owned exclusively by self.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for len() bytes and we hold &mut self.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for PageBuf {
    fn drop(&mut self) {
        let layout = Layout::from_size_align(self.len(), PAGE_ALIGNMENT)
            .expect("layout validated at allocation");

        // SAFETY: ptr was allocated with exactly this layout.
        unsafe {
            alloc::dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

impl Deref for PageBuf {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl DerefMut for PageBuf {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl std::fmt::Debug for PageBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuf")
            .field("pages", &self.pages)
            .field("ptr", &self.ptr)
            .finish()
    }
}
