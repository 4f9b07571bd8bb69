//! Buddy page pool: a fixed-region, power-of-two block page allocator.

use crate::bits;
use crate::error::AllocError;
use crate::freelist::FreeLists;
use alloc::vec;
use alloc::vec::Vec;

/// A fixed power-of-two page size. The reference uses 4 KiB pages.
pub const PAGE_SIZE: usize = 4096;

/// Maximum rank. Rank `r` spans `2^(r-1)` pages, so `R_MAX` blocks span
/// `2^(R_MAX - 1)` pages — 32768 pages of `PAGE_SIZE` each at the default
/// constants, not `2^R_MAX`. See the rank-convention warning in SPEC_FULL.md.
pub const R_MAX: u8 = 16;

/// Compile-time upper bound on pool size, in pages. `init` rejects a larger
/// `page_count` with `AllocError::InvalidArgument`.
pub const MAX_PAGES: usize = 32768;

/// Per-page metadata: the block's rank and whether this page currently heads
/// a free block.
#[derive(Clone, Copy)]
struct PageMeta {
  /// 0 for a filler page never consulted as a block head; otherwise the rank
  /// of the block this page heads (free or allocated).
  rank: u8,
  is_free: bool,
}

impl Default for PageMeta {
  fn default() -> Self {
    Self { rank: 0, is_free: false }
  }
}

/// A buddy page allocator serving one contiguous, page-aligned address range.
///
/// `BuddyPool` owns all of its bookkeeping state and never reads or writes
/// through the address range it hands out — callers are free to back that
/// range with real memory, a mock, or nothing at all in tests.
pub struct BuddyPool {
  base: usize,
  total_pages: usize,
  metadata: Vec<PageMeta>,
  free_lists: FreeLists,
}

impl BuddyPool {
  /// Initialize a pool covering `page_count` pages starting at `base`.
  ///
  /// # Parameters
  ///
  /// * `base` - Page-aligned base address of the region. Only ever used for
  ///   address arithmetic; never dereferenced.
  /// * `page_count` - Number of pages in the region. Must be `<= MAX_PAGES`.
  ///
  /// # Description
  ///
  /// Decomposes `[0, page_count)` into free blocks with a greedy
  /// largest-aligned-block walk: at each step, the largest rank that both
  /// fits in the remaining pages and is aligned at the current page index is
  /// chosen, pushed onto its free list, and the walk advances past it.
  ///
  /// A `page_count` of 0 is a valid, fully empty pool: every subsequent
  /// `alloc` call returns `AllocError::OutOfSpace`.
  ///
  /// # Returns
  ///
  /// The new pool, or `AllocError::InvalidArgument` if `page_count` exceeds
  /// `MAX_PAGES`.
  pub fn init(base: usize, page_count: usize) -> Result<Self, AllocError> {
    if page_count > MAX_PAGES {
      log::debug!("buddy: init rejected, page_count {page_count} exceeds MAX_PAGES {MAX_PAGES}");
      return Err(AllocError::InvalidArgument);
    }

    let mut pool = Self {
      base,
      total_pages: page_count,
      metadata: vec![PageMeta::default(); page_count],
      free_lists: FreeLists::new(page_count),
    };

    pool.seed_free_lists();

    log::trace!("buddy: init base={base:#x} pages={page_count}");
    Ok(pool)
  }

  /// Greedy largest-aligned-block decomposition. See `init`.
  fn seed_free_lists(&mut self) {
    let mut cur = 0usize;

    while cur < self.total_pages {
      let rank = self.largest_fitting_rank(cur);
      self.free_lists.push_front(rank, cur);
      self.metadata[cur] = PageMeta { rank, is_free: true };
      cur += block_pages(rank);
    }
  }

  /// Largest rank that fits at `page_idx` given the pool's remaining extent.
  ///
  /// # Assumptions
  ///
  /// Assumes `page_idx < self.total_pages`, so rank 1 always fits.
  fn largest_fitting_rank(&self, page_idx: usize) -> u8 {
    let mut rank = R_MAX;

    while rank > 1 {
      if bits::rank_aligned(page_idx, rank) && page_idx + block_pages(rank) <= self.total_pages {
        break;
      }
      rank -= 1;
    }

    rank
  }

  /// Allocate a block of the given rank.
  ///
  /// # Parameters
  ///
  /// * `rank` - Requested rank in `[1, R_MAX]`.
  ///
  /// # Description
  ///
  /// Scans free lists from `rank` upward for the first non-empty list, pops
  /// its head, and splits downward to `rank`, pushing each freed right-half
  /// buddy onto its own free list. The left half keeps its address at every
  /// split, so the returned address is the lowest address in the original
  /// block (§4.4 LIFO / tie-break policy).
  ///
  /// # Returns
  ///
  /// The byte address of the allocated block, `AllocError::InvalidArgument`
  /// if `rank` is out of range, or `AllocError::OutOfSpace` if no free block
  /// of rank `rank` or larger exists.
  pub fn alloc(&mut self, rank: u8) -> Result<usize, AllocError> {
    if rank < 1 || rank > R_MAX {
      log::debug!("buddy: alloc rejected rank {rank}");
      return Err(AllocError::InvalidArgument);
    }

    let mut found_rank = rank;
    while found_rank <= R_MAX && self.free_lists.head(found_rank).is_none() {
      found_rank += 1;
    }

    if found_rank > R_MAX {
      log::warn!("buddy: alloc(rank={rank}) out of space");
      return Err(AllocError::OutOfSpace);
    }

    let page = self.free_lists.pop_front(found_rank).expect("scanned rank was non-empty");
    self.metadata[page].is_free = false;

    let mut split_rank = found_rank;
    while split_rank > rank {
      split_rank -= 1;
      let bsize = block_pages(split_rank);
      let buddy_page = page + bsize;

      self.free_lists.push_front(split_rank, buddy_page);
      self.metadata[buddy_page] = PageMeta { rank: split_rank, is_free: true };
    }

    self.metadata[page].rank = rank;
    log::trace!("buddy: alloc(rank={rank}) -> page {page} (from rank {found_rank})");
    Ok(self.addr_of(page))
  }

  /// Release a block previously returned by `alloc`, coalescing with its
  /// buddy chain as far as possible.
  ///
  /// # Parameters
  ///
  /// * `addr` - An address previously returned by `alloc` and not yet
  ///   released.
  ///
  /// # Returns
  ///
  /// `Ok(())` on success. `AllocError::InvalidArgument` if `addr` is 0, does
  /// not name a page in this pool, or does not name the head of a currently
  /// allocated block (including double-release and interior-page release).
  pub fn release(&mut self, addr: usize) -> Result<(), AllocError> {
    if addr == 0 {
      return Err(AllocError::InvalidArgument);
    }

    let page = self.page_of(addr).ok_or(AllocError::InvalidArgument)?;
    let meta = self.metadata[page];

    if meta.is_free || meta.rank == 0 {
      log::debug!("buddy: release rejected page {page} (not an allocated head)");
      return Err(AllocError::InvalidArgument);
    }

    let mut p = page;
    let mut r = meta.rank;

    while r < R_MAX {
      let bsize = block_pages(r);
      let b = p ^ bsize;

      if b + bsize > self.total_pages {
        break;
      }

      let buddy_meta = self.metadata[b];
      if !(buddy_meta.is_free && buddy_meta.rank == r) {
        break;
      }

      self.free_lists.unlink(r, b);
      self.metadata[b].is_free = false;
      p = p.min(b);
      r += 1;
    }

    self.free_lists.push_front(r, p);
    self.metadata[p] = PageMeta { rank: r, is_free: true };

    if r == R_MAX {
      log::warn!("buddy: release(addr={addr:#x}) merged all the way to R_MAX at page {p}");
    } else {
      log::trace!("buddy: release(addr={addr:#x}) merged to page {p} rank {r}");
    }

    Ok(())
  }

  /// The rank of the block containing `addr`.
  ///
  /// # Description
  ///
  /// If `addr` names an allocated block's head or a free block's head,
  /// returns that block's own rank directly from its metadata. Otherwise
  /// (a filler page of a free block, or page 0 of an empty pool) returns
  /// rank 1 as a safe default — see the §9 open question in SPEC_FULL.md.
  pub fn query_rank(&self, addr: usize) -> Result<u8, AllocError> {
    let page = self.page_of(addr).ok_or(AllocError::InvalidArgument)?;
    let meta = self.metadata[page];

    if meta.is_free || meta.rank > 0 {
      return Ok(meta.rank);
    }

    Ok(1)
  }

  /// The number of free blocks currently on rank `rank`'s free list.
  pub fn query_page_counts(&self, rank: u8) -> Result<usize, AllocError> {
    if rank < 1 || rank > R_MAX {
      return Err(AllocError::InvalidArgument);
    }

    Ok(self.free_lists.count(rank))
  }

  /// The page index of every free block currently on rank `rank`'s free
  /// list, head to tail. Exposed for invariant checking (maximality,
  /// uniqueness); not part of the allocator's core contract.
  #[doc(hidden)]
  pub fn free_pages(&self, rank: u8) -> Result<Vec<usize>, AllocError> {
    if rank < 1 || rank > R_MAX {
      return Err(AllocError::InvalidArgument);
    }

    Ok(self.free_lists.pages(rank))
  }

  /// Total number of pages served by this pool.
  pub fn total_pages(&self) -> usize {
    self.total_pages
  }

  /// Map a byte address to a page index, or `None` if it is below `base`,
  /// not page-aligned, or past the end of the pool.
  fn page_of(&self, addr: usize) -> Option<usize> {
    if addr < self.base {
      return None;
    }

    let offset = addr - self.base;
    if offset % PAGE_SIZE != 0 {
      return None;
    }

    let idx = offset / PAGE_SIZE;
    if idx >= self.total_pages { None } else { Some(idx) }
  }

  /// Map a page index to its byte address.
  fn addr_of(&self, page_idx: usize) -> usize {
    self.base + page_idx * PAGE_SIZE
  }
}

/// Number of pages in a block of the given rank: `2^(rank - 1)`.
fn block_pages(rank: u8) -> usize {
  1usize << (rank - 1)
}
