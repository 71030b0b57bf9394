//! Scatter-gather descriptors over staged pages.

use alloc::vec::Vec;
use core::cmp::min;

use crate::pool::PagePool;

/// One descriptor entry. Refers into a block of the owning pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SgEntry {
    /// Index of the block in the pool.
    pub block: usize,
    /// Bytes of the block covered by this entry.
    pub length: usize,
    /// Start of the data in the block. Always `0` for freshly staged pages.
    pub offset: usize,
}

/// Map the blocks of `mem` into `sgl`, covering exactly `size` bytes.
///
/// Every block up to the one holding the last byte gets one entry, only the
/// final entry may be shorter than its block. Returns the number of entries.
pub fn map_sg(mem: &PagePool, size: usize, sgl: &mut Vec<SgEntry>) -> usize {
    let mut sz = size;
    let mut sctr_len = 0;

    for (i, block) in mem.blocks().iter().enumerate() {
        if sz == 0 {
            break;
        }
        let len = min(block.len(), sz);

        sgl.push(SgEntry {
            block: i,
            length: len,
            offset: 0,
        });
        sctr_len += 1;
        sz -= len;
    }

    sctr_len
}

/// Borrowed descriptor list handed to the transport.
#[derive(Clone, Copy, Debug)]
pub struct SgList<'a> {
    mem: &'a PagePool,
    entries: &'a [SgEntry],
}

impl<'a> SgList<'a> {
    /// View `entries` over the blocks of `mem`.
    pub fn new(mem: &'a PagePool, entries: &'a [SgEntry]) -> Self {
        Self { mem, entries }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw entries.
    pub fn entries(&self) -> &'a [SgEntry] {
        self.entries
    }

    /// Sum of entry lengths.
    pub fn total_len(&self) -> usize {
        self.entries.iter().map(|e| e.length).sum()
    }

    /// Byte ranges described by the entries, in transfer order.
    pub fn segments(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let blocks = self.mem.blocks();
        self.entries
            .iter()
            .map(move |e| &blocks[e.block].as_slice()[e.offset..e.offset + e.length])
    }

    /// Gather the described bytes into `buf`. Returns the number copied.
    pub fn copy_to_buffer(&self, buf: &mut [u8]) -> usize {
        let mut copied = 0;
        for seg in self.segments() {
            let n = min(seg.len(), buf.len() - copied);
            buf[copied..copied + n].copy_from_slice(&seg[..n]);
            copied += n;
            if copied == buf.len() {
                break;
            }
        }
        copied
    }
}
