//! Optional process-wide pool, for callers that want a single global
//! allocator instance instead of owning a [`crate::BuddyPool`] directly.
//!
//! Grounded on the `spin::Mutex<Option<Allocator>>` singleton pattern used by
//! kernel allocators in the reference pack.

use spin::Mutex;

use crate::error::AllocError;
use crate::pool::BuddyPool;

static POOL: Mutex<Option<BuddyPool>> = Mutex::new(None);

/// Initialize the global pool. Replaces any pool installed by a previous
/// call, dropping its state.
pub fn init_pool(base: usize, page_count: usize) -> Result<(), AllocError> {
  let pool = BuddyPool::init(base, page_count)?;
  *POOL.lock() = Some(pool);
  Ok(())
}

/// Allocate a block of the given rank from the global pool.
///
/// # Returns
///
/// `AllocError::InvalidArgument` if the global pool has not been installed
/// via `init_pool` yet, in addition to the error conditions of
/// [`BuddyPool::alloc`].
pub fn alloc_pages(rank: u8) -> Result<usize, AllocError> {
  POOL.lock().as_mut().ok_or(AllocError::InvalidArgument)?.alloc(rank)
}

/// Release a block previously allocated from the global pool.
pub fn return_pages(addr: usize) -> Result<(), AllocError> {
  POOL.lock().as_mut().ok_or(AllocError::InvalidArgument)?.release(addr)
}

/// Query the rank of the block containing `addr` in the global pool.
pub fn query_ranks(addr: usize) -> Result<u8, AllocError> {
  POOL.lock().as_ref().ok_or(AllocError::InvalidArgument)?.query_rank(addr)
}

/// Query the free-block count of `rank` in the global pool.
pub fn query_page_counts(rank: u8) -> Result<usize, AllocError> {
  POOL.lock().as_ref().ok_or(AllocError::InvalidArgument)?.query_page_counts(rank)
}

#[cfg(test)]
mod tests {
  use super::*;

  // Single test function: POOL is one process-wide static, so splitting this
  // across multiple #[test] fns would race under cargo test's default
  // parallelism.
  #[test]
  fn global_pool_round_trips_through_the_free_functions() {
    assert_eq!(alloc_pages(1), Err(AllocError::InvalidArgument));

    init_pool(0x8000_0000, 8).unwrap();
    assert_eq!(query_page_counts(4).unwrap(), 1);

    let addr = alloc_pages(1).unwrap();
    assert_eq!(query_ranks(addr).unwrap(), 1);

    return_pages(addr).unwrap();
    assert_eq!(query_page_counts(4).unwrap(), 1);
    assert_eq!(return_pages(addr), Err(AllocError::InvalidArgument));
  }
}
