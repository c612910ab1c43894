//! # Memory Management
//!
//! This module provides the owned, aligned page buffers that back
//! copy-on-write modifications. A transaction's first write to a page
//! clones the page run out of the file mapping into a [`PageBuf`]; the
//! buffer is released either at commit, once its bytes reach the file, or
//! when the transaction is dropped.
//!
//! Allocation failure here is a first-class error rather than an abort:
//! the transaction layer reports out-of-memory to the caller and stays
//! usable.
//!
//! ## Module Organization
//!
//! - `page_buf`: the aligned, fallibly-allocated page buffer

mod page_buf;

pub use page_buf::PageBuf;
