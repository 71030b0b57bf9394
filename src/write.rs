use tracing::{error, trace};

use crate::area::TransferArea;
use crate::error::{Invalid, Result};
use crate::host::{DeviceLimits, MmcCard};
use crate::pages::PageAllocator;

/// Send `src` to the device in chunks that fit every host limit.
///
/// Each chunk is staged into a fresh [`TransferArea`], written with `arg`
/// and released before the next one is built. The first failed write ends
/// the transfer, nothing is retried.
pub fn write_firmware<C: MmcCard, P: PageAllocator>(
    card: &mut C,
    pages: &mut P,
    limits: &DeviceLimits,
    src: &[u8],
    arg: u32,
) -> Result<()> {
    let block_size = limits.block_size;

    if src.is_empty() {
        return Err(Invalid::EmptyImage.into());
    }
    if src.len() % block_size != 0 {
        return Err(Invalid::Misaligned {
            size: src.len(),
            block_size,
        }
        .into());
    }

    let mut offset = 0;
    while offset < src.len() {
        let mut area = TransferArea::new(limits, limits.max_transfer(src.len() - offset));
        area.init(pages, &src[offset..])?;

        let max_tfr = area.max_transfer_size();
        trace!(
            offset,
            len = max_tfr,
            segments = area.sg_len(),
            "ffu chunk"
        );

        let rc = card.simple_transfer(
            area.sg_list(),
            arg,
            area.blocks() as u32,
            block_size as u32,
            true,
        );
        area.cleanup();
        if let Err(e) = rc {
            error!(host = card.hostname(), offset, "ffu transfer failed: {}", e);
            return Err(e.into());
        }

        offset += max_tfr;
    }

    Ok(())
}
