//! # Configuration Module
//!
//! This module centralizes the configuration constants for the paging core.
//! Constants are grouped by functional area and their interdependencies are
//! documented and enforced through compile-time assertions, so values that
//! must agree (page size, buffer alignment, metadata grouping) cannot drift
//! apart silently.
//!
//! ## Module Organization
//!
//! - `constants`: page geometry, metadata grouping, and table sizing values
//!   with dependency documentation

mod constants;

pub use constants::{
    overflow_page_count, INITIAL_BUCKET_COUNT, METADATA_ENTRY_SIZE, PAGES_IN_METADATA,
    PAGES_IN_METADATA_MASK, PAGE_ALIGNMENT, PAGE_SIZE,
};
