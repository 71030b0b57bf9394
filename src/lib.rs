#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
//!
//! Implements eMMC Field Firmware Update (FFU) as defined by JEDEC eMMC 5.0
//! and later.
//!
//! ## About
//!
//! FFU lets the host replace the firmware of an eMMC device in the field.
//! The host switches the device to FFU mode, writes the firmware image with
//! ordinary data write commands carrying a device-provided argument, and then
//! asks the device to install it, either through a MODE_OPERATION_CODES
//! write or, on devices without that feature, by switching back to normal
//! mode and power cycling the card.
//!
//! This library is a protocol implementation only. Code that actually talks
//! to the host controller (CMD6, CMD8, data transfers, power management) is
//! not a part of the library and is expected to be provided by the library
//! user through the [`MmcCard`] trait. Memory used to stage the image comes
//! from a [`PageAllocator`].
//!
//! ### Staging
//!
//! An image is sent in chunks. Each chunk is the largest whole-sector
//! transfer the host allows (segment count, segment size, block count and
//! request size) and is staged into page blocks that never take more than a
//! sixteenth of the free memory. Blocks are as large as the host segment
//! size so that few descriptor entries are needed.
//!
//! ### Supported operations
//!
//! * Firmware download in FFU mode
//! * Install through MODE_OPERATION_CODES, with device status verification
//! * Install through power cycle
//! * Check of the sector count the device reports as programmed
//!
//! ### Limitations
//!
//! * Aborting an update (MODE_OPERATION_CODES = FFU_ABORT) is not supported.
//!
//! * Loading the image from storage is up to the caller.
//!
//! ## Example
//!
//! The example below focuses on [`FfuUpdater`], host controller setup is not
//! in the scope of the example.
//!
//! ```no_run
//! use mmc_ffu::*;
//!
//! struct MyCard {}
//!
//! impl MmcCard for MyCard {
//!     fn host_limits(&self) -> HostLimits {
//!         HostLimits {
//!             max_segs: 128,
//!             max_seg_size: 65536,
//!             max_blk_count: 65535,
//!             max_req_size: 512 * 1024,
//!         }
//!     }
//!
//!     fn claim_host(&mut self) {}
//!
//!     fn release_host(&mut self) {}
//!
//!     fn flush_cache(&mut self) -> core::result::Result<(), MmcError> {
//!         Ok(())
//!     }
//!
//!     fn send_ext_csd(&mut self, ext_csd: &mut [u8; EXT_CSD_LEN]) -> core::result::Result<(), MmcError> {
//!         // TODO: issue CMD8 and read the register into ext_csd
//!         Err(MmcError::Timeout)
//!     }
//!
//!     fn switch(&mut self, index: u8, value: u8, timeout_ms: u32) -> core::result::Result<(), MmcError> {
//!         // TODO: issue CMD6 and wait for busy to clear
//!         Err(MmcError::Timeout)
//!     }
//!
//!     fn simple_transfer(
//!         &mut self,
//!         sg: SgList<'_>,
//!         arg: u32,
//!         blocks: u32,
//!         blksz: u32,
//!         write: bool,
//!     ) -> core::result::Result<(), MmcError> {
//!         // TODO: CMD25 with `arg`, data from sg.segments()
//!         Err(MmcError::Timeout)
//!     }
//!
//!     fn power_save_host(&mut self) -> core::result::Result<(), MmcError> {
//!         Ok(())
//!     }
//!
//!     fn power_restore_host(&mut self) -> core::result::Result<(), MmcError> {
//!         Ok(())
//!     }
//! }
//!
//! let firmware = [0u8; 64 * 1024];
//!
//! // Stage through the heap, reporting 128 MiB of free memory.
//! let mut ffu = FfuUpdater::new(MyCard {}, HeapPages::new(32 * 1024));
//!
//! match ffu.invoke("emmc_fw.bin", &firmware) {
//!     Ok(()) => {}
//!     Err(FfuError::Unsupported) => {}
//!     Err(e) => panic!("update failed: {}", e),
//! }
//! ```
//!

extern crate alloc;

pub mod allocator;
/// Per-chunk staging area
pub mod area;
/// Error types
pub mod error;
pub mod ext_csd;
/// Update sequencing
pub mod ffu;
/// Card and host interface
pub mod host;
pub mod mode;
pub mod pages;
/// Page block pool
pub mod pool;
pub mod sg;
/// Chunked firmware transfer
pub mod write;

#[doc(inline)]
pub use crate::area::TransferArea;
#[doc(inline)]
pub use crate::error::{AllocError, FfuError, FfuStatus, Invalid, MmcError};
#[doc(inline)]
pub use crate::ext_csd::{ExtCsd, EXT_CSD_LEN};
#[doc(inline)]
pub use crate::ffu::{FfuUpdater, MAX_FIRMWARE_NAME_LEN};
#[doc(inline)]
pub use crate::host::{DeviceLimits, HostClaim, HostLimits, MmcCard};
#[doc(inline)]
pub use crate::mode::FfuMode;
#[doc(inline)]
pub use crate::pages::{HeapPages, PageAllocator, PageBlock, PAGE_SIZE};
#[doc(inline)]
pub use crate::sg::{SgEntry, SgList};
#[doc(inline)]
pub use crate::write::write_firmware;
