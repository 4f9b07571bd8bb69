//! A fixed-region, power-of-two block page allocator with buddy coalescing.
//!
//! [`BuddyPool`] manages a single contiguous, page-aligned address range as a
//! set of power-of-two blocks ("ranks"), splitting blocks on allocation and
//! coalescing them back together on release. It never reads or writes
//! through the memory it hands out — all bookkeeping lives in its own
//! metadata, which makes it usable both as a real kernel page allocator and
//! as a standalone component under test on the host.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod bits;
mod error;
mod freelist;
mod pool;

#[cfg(feature = "global")]
mod global;

pub use error::AllocError;
pub use pool::{BuddyPool, MAX_PAGES, PAGE_SIZE, R_MAX};

#[cfg(feature = "global")]
pub use global::{alloc_pages, init_pool, query_page_counts, query_ranks, return_pages};
