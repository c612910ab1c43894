//! # Storage Layer
//!
//! The storage layer turns a database file into a flat, memory-mapped array
//! of fixed-size pages and gives the transaction layer its two data paths:
//! zero-copy reads out of the mapping and positional writes back to the
//! file.
//!
//! ## Module Organization
//!
//! - `mmap`: file open/create/grow, the read-only mapping, page-run reads
//!   and whole-page positional writes
//! - `metadata`: the fixed-size per-page metadata entry, its type tags, and
//!   the page-number arithmetic that groups entries into metadata pages
//!
//! ## Safety Model
//!
//! Page slices borrow the storage immutably; remapping requires `&mut`, so
//! the borrow checker rules out dangling page references at compile time
//! with zero runtime cost.

mod metadata;
mod mmap;

pub use metadata::{
    entry_index_of, is_metadata_page, metadata_page_of, PageMetadata, PageType,
};
pub use mmap::MmapStorage;

pub use crate::config::{
    overflow_page_count, METADATA_ENTRY_SIZE, PAGES_IN_METADATA, PAGES_IN_METADATA_MASK,
    PAGE_ALIGNMENT, PAGE_SIZE,
};
