use core::cmp::min;
use core::ops::{Deref, DerefMut};

use crate::error::{Invalid, MmcError};
use crate::ext_csd::EXT_CSD_LEN;
use crate::sg::SgList;

/// Request limits of the host controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostLimits {
    /// Segments per request.
    pub max_segs: u32,
    /// Bytes per segment.
    pub max_seg_size: u32,
    /// Blocks per request.
    pub max_blk_count: u32,
    /// Bytes per request.
    pub max_req_size: u32,
}

/// Host limits combined with the device sector size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Segments per request.
    pub max_segments: usize,
    /// Bytes per segment, rounded down to a whole number of sectors.
    pub max_segment_size: usize,
    /// Blocks per request.
    pub max_block_count: usize,
    /// Bytes per request.
    pub max_request_size: usize,
    /// Device data sector size.
    pub block_size: usize,
}

impl DeviceLimits {
    /// Combine host limits with a device sector size.
    ///
    /// Fails when the limits cannot carry a single sector per request.
    pub fn new(host: HostLimits, block_size: usize) -> Result<Self, Invalid> {
        if !block_size.is_power_of_two() {
            return Err(Invalid::HostLimits { block_size });
        }

        let limits = Self {
            max_segments: host.max_segs as usize,
            max_segment_size: host.max_seg_size as usize & !(block_size - 1),
            max_block_count: host.max_blk_count as usize,
            max_request_size: host.max_req_size as usize,
            block_size,
        };

        if limits.max_transfer(block_size) < block_size {
            return Err(Invalid::HostLimits { block_size });
        }
        Ok(limits)
    }

    /// Largest whole-sector transfer of at most `remaining` bytes all host
    /// limits allow.
    pub fn max_transfer(&self, remaining: usize) -> usize {
        let mut max_tfr = remaining;
        max_tfr = min(
            max_tfr,
            self.max_block_count.saturating_mul(self.block_size),
        );
        max_tfr = min(max_tfr, self.max_request_size);
        max_tfr = min(
            max_tfr,
            self.max_segments.saturating_mul(self.max_segment_size),
        );
        max_tfr - max_tfr % self.block_size
    }
}

/// Trait that describes the card and host primitives the FFU code drives.
///
/// Every call is synchronous: it runs to completion or failure before
/// returning. The implementation does the actual bus work, FFU only
/// sequences it.
pub trait MmcCard {
    /// Host name used to tag log records. Default is `"mmc"`.
    fn hostname(&self) -> &str {
        "mmc"
    }

    /// Request limits of the host controller.
    fn host_limits(&self) -> HostLimits;

    /// Take exclusive use of the host. See [`HostClaim`].
    fn claim_host(&mut self);

    /// Give up exclusive use of the host.
    fn release_host(&mut self);

    /// Flush the device write cache.
    fn flush_cache(&mut self) -> Result<(), MmcError>;

    /// Read the EXT_CSD register (CMD8).
    fn send_ext_csd(&mut self, ext_csd: &mut [u8; EXT_CSD_LEN]) -> Result<(), MmcError>;

    /// Write `value` to EXT_CSD byte `index` (CMD6) and wait up to
    /// `timeout_ms` for the device to finish.
    fn switch(&mut self, index: u8, value: u8, timeout_ms: u32) -> Result<(), MmcError>;

    /// Transfer `blocks` blocks of `blksz` bytes described by `sg`.
    ///
    /// `arg` is the command argument. In FFU mode its meaning is vendor
    /// specific and it is not an address. An entry may be longer than
    /// `max_seg_size` when the segment size is not a power of two pages,
    /// see [`crate::allocator`].
    fn simple_transfer(
        &mut self,
        sg: SgList<'_>,
        arg: u32,
        blocks: u32,
        blksz: u32,
        write: bool,
    ) -> Result<(), MmcError>;

    /// Put the card to sleep and power the host down.
    fn power_save_host(&mut self) -> Result<(), MmcError>;

    /// Power the host up and re-initialize the card.
    fn power_restore_host(&mut self) -> Result<(), MmcError>;
}

/// Exclusive use of the host for as long as the guard lives.
pub struct HostClaim<'a, C: MmcCard> {
    card: &'a mut C,
}

impl<'a, C: MmcCard> HostClaim<'a, C> {
    /// Claim the host of `card`.
    pub fn new(card: &'a mut C) -> Self {
        card.claim_host();
        Self { card }
    }
}

impl<C: MmcCard> Deref for HostClaim<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.card
    }
}

impl<C: MmcCard> DerefMut for HostClaim<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.card
    }
}

impl<C: MmcCard> Drop for HostClaim<'_, C> {
    fn drop(&mut self) {
        self.card.release_host();
    }
}
