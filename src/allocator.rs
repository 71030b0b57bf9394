//! Staging memory allocation.
//!
//! Allocate a lot of memory, preferably the whole transfer but at least a
//! minimum. When memory is short do not take more than a fraction of the
//! free pages (see [`PageAllocator::BUDGET_SHIFT`]). Do not exceed the host
//! segment count, and try not to make blocks much bigger than the host
//! segment size.
//!
//! Blocks come in powers of two pages, so the preferred block is the host
//! segment size rounded up to the next order. A 61440 byte segment limit
//! gives 65536 byte blocks and descriptor entries, the transport splits an
//! entry that is longer than its segment limit.

use core::cmp::min;

use tracing::{debug, trace};

use crate::error::AllocError;
use crate::pages::{floor_order, get_order, PageAllocator, PageBlock, PAGE_SIZE};
use crate::pool::PagePool;

/// Bounds a single staging works against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AreaLimits {
    /// Bytes to stage. Lowered when the free-memory budget is smaller.
    pub max_transfer_size: usize,
    /// Segments the pool may start with. Lowered when fewer suffice.
    pub max_segments: usize,
    /// Preferred segment size in bytes.
    pub max_segment_size: usize,
}

/// Fill `pool` with blocks covering `limits.max_transfer_size` bytes.
///
/// The pool's segment limit is the hard cap. `limits` is updated to what was
/// actually staged.
pub fn alloc_mem<P: PageAllocator>(
    pages: &mut P,
    pool: &mut PagePool,
    limits: &mut AreaLimits,
    min_size: usize,
) -> Result<(), AllocError> {
    let mut max_page_cnt = limits.max_transfer_size.div_ceil(PAGE_SIZE);
    let mut min_page_cnt = min_size.div_ceil(PAGE_SIZE);
    let max_seg_page_cnt = limits.max_segment_size.div_ceil(PAGE_SIZE).max(1);
    let mut page_cnt: usize = 0;

    let budget = pages.free_pages() >> P::BUDGET_SHIFT;

    if max_page_cnt > budget {
        debug!(
            pages = max_page_cnt,
            budget, "staging capped by free memory budget"
        );
        max_page_cnt = budget;
        limits.max_transfer_size = max_page_cnt * PAGE_SIZE;
    }

    if max_page_cnt == 0 {
        return Err(AllocError::OutOfMemory { pages: 0 });
    }

    if min_page_cnt > max_page_cnt {
        min_page_cnt = max_page_cnt;
    }

    if limits.max_segments.saturating_mul(max_seg_page_cnt) > max_page_cnt {
        limits.max_segments = max_page_cnt.div_ceil(max_seg_page_cnt);
        trace!(segments = limits.max_segments, "segment count shrunk to fit");
    }

    pool.reserve(min(limits.max_segments, pool.limit()))?;

    let seg_order = get_order(max_seg_page_cnt * PAGE_SIZE);

    while max_page_cnt > 0 {
        if pool.len() >= pool.capacity() {
            pool.grow(max_page_cnt.div_ceil(max_seg_page_cnt))?;
            limits.max_segments = pool.capacity();
        }

        // never let a block take the staging past the budget
        let order = min(seg_order, floor_order(budget - page_cnt));
        let block = alloc_block(pages, order, max_page_cnt)?;

        let got = block.pages();
        pool.push(block);
        page_cnt += got;
        if max_page_cnt <= got {
            break;
        }
        max_page_cnt -= got;
    }

    if page_cnt < min_page_cnt {
        return Err(AllocError::BelowMinimum {
            allocated: page_cnt,
            required: min_page_cnt,
        });
    }

    Ok(())
}

/// Try `order`, then every smaller order down to a single page.
fn alloc_block<P: PageAllocator>(
    pages: &mut P,
    order: u32,
    pending: usize,
) -> Result<PageBlock, AllocError> {
    for o in (0..=order).rev() {
        if let Some(block) = pages.alloc_pages(o) {
            if o != order {
                trace!(wanted = order, got = o, "fell back to smaller block");
            }
            return Ok(block);
        }
    }
    Err(AllocError::OutOfMemory { pages: pending })
}
