//! # PageDB Configuration Constants
//!
//! This module centralizes the configuration constants for the paging core,
//! grouping interdependent values together and documenting their
//! relationships. Constants that depend on each other are co-located to
//! prevent mismatch bugs.
//!
//! ## Dependency Graph
//!
//! ```text
//! PAGE_SIZE (8192 bytes)
//!       │
//!       ├─> PAGE_ALIGNMENT (4096 bytes)
//!       │     Every transaction-owned page buffer is aligned to this
//!       │     boundary. PAGE_SIZE must be a multiple of it.
//!       │
//!       ├─> METADATA_ENTRY_SIZE (64 bytes)
//!       │     One entry per data page, packed into metadata pages.
//!       │     PAGE_SIZE must divide evenly into entries.
//!       │
//!       └─> PAGES_IN_METADATA (derived: PAGE_SIZE / METADATA_ENTRY_SIZE)
//!             │
//!             └─> PAGES_IN_METADATA_MASK (derived: !(PAGES_IN_METADATA - 1))
//!                   page_num & MASK  = owning metadata page number
//!                   page_num & !MASK = entry index within that page
//!
//! INITIAL_BUCKET_COUNT (8)
//!       Starting size of the per-transaction modified-page table.
//!       Must be a power of two; the table doubles when it crosses
//!       75% occupancy.
//! ```
//!
//! ## Critical Invariants
//!
//! These invariants are enforced by compile-time assertions:
//!
//! 1. `PAGE_SIZE % PAGE_ALIGNMENT == 0`
//! 2. `PAGE_SIZE % METADATA_ENTRY_SIZE == 0`
//! 3. `PAGES_IN_METADATA` and `INITIAL_BUCKET_COUNT` are powers of two

// ============================================================================
// PAGE LAYOUT CONSTANTS
// These define the fundamental unit of I/O used throughout the engine
// ============================================================================

/// Size of each database page in bytes (8KB).
/// This is the fundamental unit of I/O and copy-on-write.
pub const PAGE_SIZE: usize = 8192;

/// Required alignment of every transaction-owned page buffer.
/// Matches the common OS page size so buffers stay friendly to direct I/O.
pub const PAGE_ALIGNMENT: usize = 4096;

const _: () = assert!(
    PAGE_SIZE % PAGE_ALIGNMENT == 0,
    "PAGE_SIZE must be a multiple of PAGE_ALIGNMENT"
);

// ============================================================================
// METADATA GROUPING
// Per-page metadata entries are packed many-to-a-page into metadata pages
// ============================================================================

/// Size of a single page metadata entry in bytes.
pub const METADATA_ENTRY_SIZE: usize = 64;

/// Number of pages described by one metadata page.
/// A metadata page is a full page of `METADATA_ENTRY_SIZE` entries, and its
/// first entry describes the metadata page itself.
pub const PAGES_IN_METADATA: usize = PAGE_SIZE / METADATA_ENTRY_SIZE;

/// Mask that maps a page number onto its owning metadata page.
///
/// `page_num & PAGES_IN_METADATA_MASK` is the metadata page number;
/// `page_num & !PAGES_IN_METADATA_MASK` is the entry index within it.
pub const PAGES_IN_METADATA_MASK: u64 = !(PAGES_IN_METADATA as u64 - 1);

const _: () = assert!(
    PAGE_SIZE % METADATA_ENTRY_SIZE == 0,
    "metadata entries must pack evenly into a page"
);

const _: () = assert!(
    PAGES_IN_METADATA.is_power_of_two(),
    "PAGES_IN_METADATA must be a power of two for mask arithmetic"
);

// ============================================================================
// MODIFIED-PAGE TABLE
// ============================================================================

/// Initial bucket count of the per-transaction modified-page table.
/// The table doubles whenever an insert would push it past 75% occupancy.
pub const INITIAL_BUCKET_COUNT: usize = 8;

const _: () = assert!(
    INITIAL_BUCKET_COUNT.is_power_of_two(),
    "bucket counts must stay powers of two across doubling"
);

/// Number of whole pages occupied by a run of `overflow_size` bytes.
///
/// An `overflow_size` of zero describes an ordinary single page.
#[inline]
pub fn overflow_page_count(overflow_size: u32) -> usize {
    if overflow_size == 0 {
        1
    } else {
        (overflow_size as usize).div_ceil(PAGE_SIZE)
    }
}
