//! # Page Metadata Entries
//!
//! Every page in the file is described by a fixed-size metadata entry.
//! Entries are packed many-to-a-page into dedicated metadata pages: page 0
//! and every page whose number is a multiple of `PAGES_IN_METADATA` is a
//! metadata page, and its first entry describes the metadata page itself.
//!
//! ## Grouping Arithmetic
//!
//! ```text
//! page_num & PAGES_IN_METADATA_MASK   -> owning metadata page number
//! page_num & !PAGES_IN_METADATA_MASK  -> entry index within that page
//! ```
//!
//! With 8KB pages and 64-byte entries, one metadata page covers 128 pages.
//!
//! ## Entry Layout (64 bytes)
//!
//! ```text
//! Offset  Size  Field          Description
//! ------  ----  -------------  --------------------------------------
//! 0       1     page_type      Type tag (metadata, data, overflow, ...)
//! 1       1     flags          Reserved for per-page flags
//! 2       2     reserved0      Padding
//! 4       4     overflow_size  Byte length of the page's overflow run
//! 8       56    reserved       Room for allocation/free-space layers
//! ```
//!
//! The wide reservation leaves room for the allocation bookkeeping and
//! free-space map that sit above this layer without a format change.
//!
//! All multi-byte fields are little-endian; the struct is read in place
//! from mapped pages via `zerocopy`, never copied.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{METADATA_ENTRY_SIZE, PAGES_IN_METADATA_MASK};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Free = 0x00,
    Metadata = 0x01,
    Data = 0x02,
    Overflow = 0x03,
}

impl PageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(PageType::Free),
            0x01 => Some(PageType::Metadata),
            0x02 => Some(PageType::Data),
            0x03 => Some(PageType::Overflow),
            _ => None,
        }
    }
}

/// Fixed-size metadata record describing a single page.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct PageMetadata {
    page_type: u8,
    flags: u8,
    reserved0: [u8; 2],
    overflow_size: U32,
    reserved: [u8; 56],
}

const _: () = assert!(std::mem::size_of::<PageMetadata>() == METADATA_ENTRY_SIZE);

impl PageMetadata {
    pub fn new(page_type: PageType) -> Self {
        Self {
            page_type: page_type as u8,
            flags: 0,
            reserved0: [0; 2],
            overflow_size: U32::new(0),
            reserved: [0; 56],
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= METADATA_ENTRY_SIZE,
            "buffer too small for PageMetadata: {} < {}",
            data.len(),
            METADATA_ENTRY_SIZE
        );

        Self::ref_from_bytes(&data[..METADATA_ENTRY_SIZE])
            .map_err(|e| eyre::eyre!("failed to read PageMetadata: {:?}", e))
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= METADATA_ENTRY_SIZE,
            "buffer too small for PageMetadata: {} < {}",
            data.len(),
            METADATA_ENTRY_SIZE
        );

        Self::mut_from_bytes(&mut data[..METADATA_ENTRY_SIZE])
            .map_err(|e| eyre::eyre!("failed to read PageMetadata: {:?}", e))
    }

    pub fn page_type(&self) -> Option<PageType> {
        PageType::from_byte(self.page_type)
    }

    pub fn type_byte(&self) -> u8 {
        self.page_type
    }

    pub fn set_page_type(&mut self, page_type: PageType) {
        self.page_type = page_type as u8;
    }

    pub fn overflow_size(&self) -> u32 {
        self.overflow_size.get()
    }

    pub fn set_overflow_size(&mut self, size: u32) {
        self.overflow_size = U32::new(size);
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }
}

/// The metadata page that describes `page_num`.
#[inline]
pub fn metadata_page_of(page_num: u64) -> u64 {
    page_num & PAGES_IN_METADATA_MASK
}

/// The entry index of `page_num` within its metadata page.
#[inline]
pub fn entry_index_of(page_num: u64) -> usize {
    (page_num & !PAGES_IN_METADATA_MASK) as usize
}

/// Whether `page_num` is itself a metadata page.
#[inline]
pub fn is_metadata_page(page_num: u64) -> bool {
    page_num & PAGES_IN_METADATA_MASK == page_num
}
