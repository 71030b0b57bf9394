use alloc::vec::Vec;

use crate::error::AllocError;
use crate::pages::{PageBlock, PAGE_SIZE};

/// Ordered set of page blocks backing one transfer.
///
/// The segment array has an explicit capacity that only grows through
/// [`grow()`](PagePool::grow), and never past the host segment limit fixed at
/// construction. Dropping the pool (or [`clear()`](PagePool::clear)) frees
/// every block.
#[derive(Debug)]
pub struct PagePool {
    blocks: Vec<PageBlock>,
    capacity: usize,
    limit: usize,
}

impl PagePool {
    /// Empty pool whose capacity may never exceed `limit` segments.
    pub fn new(limit: usize) -> Self {
        Self {
            blocks: Vec::new(),
            capacity: 0,
            limit,
        }
    }

    /// Sets the initial segment capacity.
    pub fn reserve(&mut self, capacity: usize) -> Result<(), AllocError> {
        if capacity > self.limit {
            return Err(AllocError::TooManySegments {
                requested: capacity,
                limit: self.limit,
            });
        }
        self.reserve_slots(capacity)?;
        self.capacity = capacity;
        Ok(())
    }

    /// Raises the segment capacity by `by`.
    pub fn grow(&mut self, by: usize) -> Result<(), AllocError> {
        let requested = self.capacity.saturating_add(by);
        if requested > self.limit {
            return Err(AllocError::TooManySegments {
                requested,
                limit: self.limit,
            });
        }
        self.reserve_slots(requested)?;
        self.capacity = requested;
        Ok(())
    }

    fn reserve_slots(&mut self, capacity: usize) -> Result<(), AllocError> {
        let extra = capacity.saturating_sub(self.blocks.len());
        self.blocks
            .try_reserve_exact(extra)
            .map_err(|_| AllocError::OutOfMemory { pages: 0 })
    }

    /// Appends a block. The pool must have a free segment slot.
    pub fn push(&mut self, block: PageBlock) {
        debug_assert!(self.blocks.len() < self.capacity, "segment capacity exceeded");
        self.blocks.push(block);
    }

    /// Number of blocks held.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// No blocks held.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Current segment capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hard segment limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Blocks in allocation order.
    pub fn blocks(&self) -> &[PageBlock] {
        &self.blocks
    }

    /// Mutable blocks in allocation order.
    pub fn blocks_mut(&mut self) -> &mut [PageBlock] {
        &mut self.blocks
    }

    /// Total pages held.
    pub fn pages(&self) -> usize {
        self.blocks.iter().map(PageBlock::pages).sum()
    }

    /// Total bytes held.
    pub fn total_len(&self) -> usize {
        self.pages() * PAGE_SIZE
    }

    /// Frees every block and the segment array. Safe to call repeatedly.
    pub fn clear(&mut self) {
        self.blocks = Vec::new();
        self.capacity = 0;
    }
}
