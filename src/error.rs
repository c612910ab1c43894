//! # Error Classification
//!
//! Every fallible operation in the paging core returns `eyre::Result`, with
//! contextual messages layered on via `wrap_err`. Errors that callers need to
//! classify programmatically carry a [`PagerError`] as the report's root
//! cause, so a caller can recover the [`ErrorKind`] with
//! `report.downcast_ref::<PagerError>()`.
//!
//! Three kinds exist:
//!
//! - **invalid argument**: page out of range, duplicate copy-on-write entry,
//!   unknown transaction flags, a mis-tagged metadata page
//! - **out of memory**: a page buffer or table allocation failed; table
//!   expansion treats this as a soft condition, everything else as hard
//! - **I/O**: a positional write to the database file failed
//!
//! Diagnostics (page numbers, byte counts, the source `io::Error`) ride as
//! structured fields on the variant rather than being flattened into the
//! message up front.

use thiserror::Error;

/// Broad classification of a [`PagerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    OutOfMemory,
    Io,
}

/// Structured failure raised by the paging core.
#[derive(Debug, Error)]
pub enum PagerError {
    #[error("page {page_num} is out of bounds (page count {page_count})")]
    PageOutOfBounds { page_num: u64, page_count: u64 },

    #[error("page {page_num} already has an entry in the transaction page table")]
    DuplicatePageEntry { page_num: u64 },

    #[error("unrecognized transaction flags {flags:#010x}")]
    UnknownFlags { flags: u32 },

    #[error(
        "page {meta_page_num} is not tagged as a metadata page \
         (found type {found_type:#04x} while resolving page {page_num})"
    )]
    NotAMetadataPage {
        meta_page_num: u64,
        page_num: u64,
        found_type: u8,
    },

    #[error("out of memory allocating {bytes} bytes for {what}")]
    OutOfMemory { bytes: usize, what: &'static str },

    #[error("failed to write page {page_num} to the database file")]
    WriteFailed {
        page_num: u64,
        #[source]
        source: std::io::Error,
    },
}

impl PagerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PagerError::PageOutOfBounds { .. }
            | PagerError::DuplicatePageEntry { .. }
            | PagerError::UnknownFlags { .. }
            | PagerError::NotAMetadataPage { .. } => ErrorKind::InvalidArgument,
            PagerError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            PagerError::WriteFailed { .. } => ErrorKind::Io,
        }
    }
}

/// Recovers the [`ErrorKind`] from an `eyre` report raised by this crate.
///
/// Returns `None` for errors that did not originate in the paging core
/// (for example an `io::Error` from opening the database file).
pub fn error_kind(report: &eyre::Report) -> Option<ErrorKind> {
    report.downcast_ref::<PagerError>().map(PagerError::kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_classify_variants() {
        let e = PagerError::PageOutOfBounds {
            page_num: 100,
            page_count: 16,
        };
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);

        let e = PagerError::OutOfMemory {
            bytes: 8192,
            what: "copy-on-write page buffer",
        };
        assert_eq!(e.kind(), ErrorKind::OutOfMemory);

        let e = PagerError::WriteFailed {
            page_num: 3,
            source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
        };
        assert_eq!(e.kind(), ErrorKind::Io);
    }

    #[test]
    fn kind_survives_context_wrapping() {
        use eyre::WrapErr;

        let report: eyre::Report = Err::<(), _>(PagerError::DuplicatePageEntry { page_num: 7 })
            .wrap_err("failed to allocate entry")
            .unwrap_err();

        assert_eq!(error_kind(&report), Some(ErrorKind::InvalidArgument));
        assert!(report.to_string().contains("failed to allocate entry"));
    }
}
