use alloc::vec::Vec;
use core::cmp::min;

use crate::allocator::{alloc_mem, AreaLimits};
use crate::error::{AllocError, Invalid, Result};
use crate::host::DeviceLimits;
use crate::pages::PageAllocator;
use crate::pool::PagePool;
use crate::sg::{map_sg, SgEntry, SgList};

/// Staged memory and descriptors for one transfer.
///
/// Built fresh for every chunk and released before the next one. Dropping
/// the area releases everything it holds, [`cleanup()`](TransferArea::cleanup)
/// does the same early and may be called any number of times.
#[derive(Debug)]
pub struct TransferArea {
    limits: AreaLimits,
    block_size: usize,
    sg_len: usize,
    mem: PagePool,
    sgtable: Vec<SgEntry>,
}

impl TransferArea {
    /// Empty area for a transfer of `max_transfer_size` bytes under `limits`.
    pub fn new(limits: &DeviceLimits, max_transfer_size: usize) -> Self {
        Self {
            limits: AreaLimits {
                max_transfer_size,
                max_segments: limits.max_segments,
                max_segment_size: limits.max_segment_size,
            },
            block_size: limits.block_size,
            sg_len: 0,
            mem: PagePool::new(limits.max_segments),
            sgtable: Vec::new(),
        }
    }

    /// Stage the leading bytes of `data` and map them for transfer.
    ///
    /// Staging may shrink the transfer to fit the free-memory budget, read
    /// [`max_transfer_size()`](TransferArea::max_transfer_size) afterwards.
    /// On error the area is left empty.
    pub fn init<P: PageAllocator>(&mut self, pages: &mut P, data: &[u8]) -> Result<()> {
        let ret = self.init_inner(pages, data);
        if ret.is_err() {
            self.cleanup();
        }
        ret
    }

    fn init_inner<P: PageAllocator>(&mut self, pages: &mut P, data: &[u8]) -> Result<()> {
        // any allocation will do here, the caller sizes the transfer
        alloc_mem(pages, &mut self.mem, &mut self.limits, 1)?;

        let max_tfr = self.limits.max_transfer_size;
        if data.len() < max_tfr {
            return Err(Invalid::ShortSource {
                available: data.len(),
                needed: max_tfr,
            }
            .into());
        }

        let mut length = 0;
        for block in self.mem.blocks_mut() {
            if length > max_tfr {
                return Err(Invalid::TransferOverrun {
                    staged: length,
                    max: max_tfr,
                }
                .into());
            }
            let page_length = block.len();
            let n = min(max_tfr - length, page_length);
            block.as_mut_slice()[..n].copy_from_slice(&data[length..length + n]);
            length += page_length;
        }

        self.sgtable
            .try_reserve_exact(self.mem.len())
            .map_err(|_| AllocError::OutOfMemory { pages: 0 })?;
        self.sg_len = map_sg(&self.mem, max_tfr, &mut self.sgtable);

        Ok(())
    }

    /// Release descriptors and staged memory.
    pub fn cleanup(&mut self) {
        self.sgtable = Vec::new();
        self.sg_len = 0;
        self.mem.clear();
    }

    /// Bytes covered by the transfer.
    pub fn max_transfer_size(&self) -> usize {
        self.limits.max_transfer_size
    }

    /// Segment capacity the staging ended up with.
    pub fn max_segments(&self) -> usize {
        self.limits.max_segments
    }

    /// Device blocks covered by the transfer.
    pub fn blocks(&self) -> usize {
        self.limits.max_transfer_size / self.block_size
    }

    /// Number of descriptor entries.
    pub fn sg_len(&self) -> usize {
        self.sg_len
    }

    /// Staged memory.
    pub fn mem(&self) -> &PagePool {
        &self.mem
    }

    /// Descriptor list over the staged memory.
    pub fn sg_list(&self) -> SgList<'_> {
        SgList::new(&self.mem, &self.sgtable[..self.sg_len])
    }
}
