//! # PageDB - Embedded Paged Storage Engine
//!
//! PageDB exposes a file as a flat array of fixed-size pages and lets
//! callers read, modify, and commit pages within the scope of a
//! transaction that provides copy-on-write isolation. This crate is the
//! paging and transaction core; allocation bookkeeping, a free-space map,
//! and durability (fsync policy, WAL) are layers above it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pagedb::{Database, TXN_NONE};
//!
//! # fn main() -> eyre::Result<()> {
//! let db = Database::create("./pages.db", 16)?;
//!
//! let mut tx = db.begin(TXN_NONE)?;
//! let mut page = tx.modify_page(3)?;
//! page[..5].copy_from_slice(b"hello");
//! tx.commit()?;
//! tx.close();
//!
//! let tx = db.begin(TXN_NONE)?;
//! assert_eq!(&tx.get_page(3)?[..5], b"hello");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Transaction (COW isolation)      │
//! ├─────────────────────────────────────┤
//! │ Modified-page table │ Metadata pages │
//! ├─────────────────────────────────────┤
//! │   Page buffers (aligned, owned)      │
//! ├─────────────────────────────────────┤
//! │  Memory-mapped reads / file writes   │
//! └─────────────────────────────────────┘
//! ```
//!
//! Reads resolve first against the transaction's modified-page table and
//! fall back to a zero-copy slice of the read-only file mapping. The first
//! modification of a page clones its whole overflow run into an aligned
//! buffer owned by the transaction; commit writes the dirty buffers back
//! with positional writes and dropping the transaction discards them.
//!
//! ## What Commit Does Not Do
//!
//! Commit stops at the first failed write and never calls fsync: bytes
//! reach the OS page cache, nothing more. Atomicity and durability belong
//! to the recovery layer above this crate.
//!
//! ## Module Overview
//!
//! - [`config`]: page geometry and table sizing constants
//! - [`storage`]: memory-mapped file access and page metadata entries
//! - [`txn`]: transactions and the modified-page table
//! - [`error`]: structured error kinds layered under `eyre` reports

pub mod config;
mod database;
pub mod error;
mod memory;
pub mod storage;
pub mod txn;

pub use config::{PAGE_ALIGNMENT, PAGE_SIZE};
pub use database::Database;
pub use error::{error_kind, ErrorKind, PagerError};
pub use memory::PageBuf;
pub use storage::{PageMetadata, PageType};
pub use txn::{PageMut, PageRef, Transaction, TXN_NONE};
