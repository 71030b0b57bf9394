//! Page-granular memory used to stage firmware data.

use alloc::boxed::Box;
use alloc::vec::Vec;

/// log2 of [`PAGE_SIZE`].
pub const PAGE_SHIFT: u32 = 12;

/// Allocation unit. Block sizes are `PAGE_SIZE << order`.
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;

/// Smallest order whose block holds `size` bytes.
pub fn get_order(size: usize) -> u32 {
    let pages = size.div_ceil(PAGE_SIZE);
    if pages <= 1 {
        0
    } else {
        usize::BITS - (pages - 1).leading_zeros()
    }
}

/// Largest order whose block fits in `pages` pages. `pages` must not be zero.
pub(crate) fn floor_order(pages: usize) -> u32 {
    debug_assert!(pages > 0);
    usize::BITS - 1 - pages.leading_zeros()
}

/// A physically contiguous run of `1 << order` pages.
///
/// Owned by exactly one pool and freed when dropped.
pub struct PageBlock {
    data: Box<[u8]>,
    order: u32,
}

impl PageBlock {
    /// Wraps an allocation of exactly `PAGE_SIZE << order` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `data` has any other length.
    pub fn new(data: Box<[u8]>, order: u32) -> Self {
        assert_eq!(data.len(), PAGE_SIZE << order, "block length must match its order");
        Self { data, order }
    }

    /// Size class of the block.
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Number of pages in the block.
    pub fn pages(&self) -> usize {
        1 << self.order
    }

    /// Block size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`, a block holds at least one page.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Block contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable block contents.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl core::fmt::Debug for PageBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("PageBlock").field("order", &self.order).finish()
    }
}

/// Source of page blocks and of the free-memory figure the staging budget
/// is derived from.
pub trait PageAllocator {
    /// Share of free pages a single staging may claim, as a right shift of
    /// [`free_pages()`](PageAllocator::free_pages). Default is `4`, one sixteenth.
    const BUDGET_SHIFT: u32 = 4;

    /// Pages currently free for general use.
    ///
    /// Only read to size a request, nothing is reserved.
    fn free_pages(&self) -> usize;

    /// Allocate `1 << order` contiguous pages.
    ///
    /// Returns `None` when a block of this order is not available right now.
    /// Must not block or retry, the caller falls back to smaller orders.
    fn alloc_pages(&mut self, order: u32) -> Option<PageBlock>;
}

/// [`PageAllocator`] backed by the global heap.
///
/// Reports a fixed free-page figure and refuses orders above `max_order`.
/// Heap exhaustion is reported as a failed allocation, not an abort.
#[derive(Clone, Copy, Debug)]
pub struct HeapPages {
    free_pages: usize,
    max_order: u32,
}

impl HeapPages {
    /// Largest order handed out by default, 4 MiB blocks.
    pub const DEFAULT_MAX_ORDER: u32 = 10;

    /// Allocator reporting `free_pages` free pages.
    pub fn new(free_pages: usize) -> Self {
        Self::with_max_order(free_pages, Self::DEFAULT_MAX_ORDER)
    }

    /// Allocator reporting `free_pages` free pages that refuses blocks
    /// larger than `max_order`.
    pub fn with_max_order(free_pages: usize, max_order: u32) -> Self {
        Self {
            free_pages,
            max_order,
        }
    }
}

impl PageAllocator for HeapPages {
    fn free_pages(&self) -> usize {
        self.free_pages
    }

    fn alloc_pages(&mut self, order: u32) -> Option<PageBlock> {
        if order > self.max_order {
            return None;
        }
        let len = PAGE_SIZE.checked_shl(order)?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(len).ok()?;
        buf.resize(len, 0u8);
        Some(PageBlock::new(buf.into_boxed_slice(), order))
    }
}
