#![allow(dead_code)]
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use mmc_ffu::{HeapPages, PAGE_SIZE};

// FFU_STATUS
pub const FFU_STATUS_SUCCESS: u8 = 0x00;
pub const FFU_STATUS_GENERAL_ERROR: u8 = 0x10;
pub const FFU_STATUS_INSTALL_ERROR: u8 = 0x11;
pub const FFU_STATUS_DOWNLOAD_ERROR: u8 = 0x12;

pub const FFU_STATUSES: [u8; 4] = [
    FFU_STATUS_SUCCESS,
    FFU_STATUS_GENERAL_ERROR,
    FFU_STATUS_INSTALL_ERROR,
    FFU_STATUS_DOWNLOAD_ERROR,
];

// MODE_CONFIG
pub const MODE_CONFIG_NORMAL: u8 = 0x0;
pub const MODE_CONFIG_FFU: u8 = 0x1;

// MODE_OPERATION_CODES
pub const MODE_OPERATION_CODES_INSTALL: u8 = 0x1;

pub const EXT_CSD_MODE_OPERATION_CODES: u8 = 29;
pub const EXT_CSD_MODE_CONFIG: u8 = 30;

pub const BLOCK_SIZE_512: usize = 512;
pub const BLOCK_SIZE_4K: usize = 4096;

/// Free pages reported by [`average_memory()`], the staging budget is a
/// sixteenth of it.
pub const AVERAGE_FREE_PAGES: usize = 1024;
pub const AVERAGE_BUDGET: usize = (AVERAGE_FREE_PAGES >> 4) * PAGE_SIZE;

pub const SCARCE_FREE_PAGES: usize = 64;
pub const SCARCE_BUDGET: usize = (SCARCE_FREE_PAGES >> 4) * PAGE_SIZE;

pub fn average_memory() -> HeapPages {
    HeapPages::new(AVERAGE_FREE_PAGES)
}

pub fn scarce_memory() -> HeapPages {
    HeapPages::new(SCARCE_FREE_PAGES)
}

/// Plenty of memory, but no two pages are contiguous.
pub fn fragmented_memory() -> HeapPages {
    HeapPages::with_max_order(1 << 20, 0)
}

/// Reproducible firmware image.
pub fn random_image(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    buf
}

/// Timeout of ordinary switches for the test card, in milliseconds.
pub fn cmd6_timeout_ms() -> u32 {
    10 * 10
}
