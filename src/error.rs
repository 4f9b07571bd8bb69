//! Allocator error type.

use core::fmt;

/// Errors returned by [`crate::BuddyPool`] operations.
///
/// Mirrors the reference implementation's `-EINVAL` / `-ENOSPC` sentinels as a
/// sum type instead of a bare negative integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// A rank was out of `[1, R_MAX]`, an address did not belong to the pool,
  /// was not page-aligned, or did not name a currently allocated block head.
  InvalidArgument,
  /// No free block of the requested rank or larger was available.
  OutOfSpace,
}

impl fmt::Display for AllocError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AllocError::InvalidArgument => f.write_str("invalid argument"),
      AllocError::OutOfSpace => f.write_str("out of space"),
    }
  }
}

impl core::error::Error for AllocError {}
