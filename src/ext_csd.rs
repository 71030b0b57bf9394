//! EXT_CSD register snapshot.
//!
//! The device reports its configuration as a 512-byte register with fields
//! at fixed offsets. [`ExtCsd::decode`] is the only place where those offsets
//! are read, everything else works with the typed snapshot.

use crate::error::FfuStatus;

/// Size of the EXT_CSD register in bytes.
pub const EXT_CSD_LEN: usize = 512;

/// FFU_STATUS, R/W/E_P.
pub const EXT_CSD_FFU_STATUS: usize = 26;
/// MODE_OPERATION_CODES, W/E_P.
pub const EXT_CSD_MODE_OPERATION_CODES: usize = 29;
/// MODE_CONFIG, R/W/E_P.
pub const EXT_CSD_MODE_CONFIG: usize = 30;
/// DATA_SECTOR_SIZE, R.
pub const EXT_CSD_DATA_SECTOR_SIZE: usize = 61;
/// FW_CONFIG, R/W.
pub const EXT_CSD_FW_CONFIG: usize = 169;
/// EXT_CSD_REV, R.
pub const EXT_CSD_REV: usize = 192;
/// GENERIC_CMD6_TIME, R.
pub const EXT_CSD_GENERIC_CMD6_TIME: usize = 248;
/// FIRMWARE_VERSION, R, 8 bytes.
pub const EXT_CSD_FIRMWARE_VERSION: usize = 254;
/// NUMBER_OF_FW_SECTORS_CORRECTLY_PROGRAMMED, R, 4 bytes little endian.
pub const EXT_CSD_NUM_OF_FW_SEC_PROG: usize = 302;
/// FFU_ARG, R, 4 bytes little endian.
pub const EXT_CSD_FFU_ARG: usize = 487;
/// OPERATION_CODE_TIMEOUT, R.
pub const EXT_CSD_OPERATION_CODE_TIMEOUT: usize = 491;
/// FFU_FEATURES, R.
pub const EXT_CSD_FFU_FEATURES: usize = 492;
/// SUPPORTED_MODES, R.
pub const EXT_CSD_SUPPORTED_MODES: usize = 493;

/// First EXT_CSD revision (eMMC 5.0) defining FFU.
pub const EXT_CSD_REV_FFU: u8 = 7;

/// MODE_OPERATION_CODES value that starts the firmware install.
pub const MODE_OPERATION_CODE_FFU_INSTALL: u8 = 0x01;

const SUPPORTED_MODES_FFU: u8 = 0x01;
const FW_CONFIG_UPDATE_DISABLE: u8 = 0x01;
const FFU_FEATURES_SUPPORTED_MODE_OPERATION_CODES: u8 = 0x01;
const DATA_SECTOR_SIZE_4K: u8 = 0x01;

/// Decoded EXT_CSD snapshot. Immutable, re-read the device for a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtCsd {
    /// Register revision.
    pub rev: u8,
    /// Raw FFU_STATUS.
    pub ffu_status: u8,
    /// Raw MODE_OPERATION_CODES.
    pub mode_operation_codes: u8,
    /// Raw MODE_CONFIG.
    pub mode_config: u8,
    /// Raw DATA_SECTOR_SIZE, `0` for 512 B and `1` for 4 KiB sectors.
    pub data_sector_size: u8,
    /// Raw FW_CONFIG.
    pub fw_config: u8,
    /// GENERIC_CMD6_TIME in units of 10 ms.
    pub generic_cmd6_time: u8,
    /// Vendor firmware version.
    pub firmware_version: [u8; 8],
    /// Firmware sectors the device accepted in FFU mode.
    pub fw_sectors_programmed: u32,
    /// Argument for the FFU data write commands.
    pub ffu_arg: u32,
    /// Install timeout exponent, see [`crate::mode::install_timeout_ms`].
    pub operation_code_timeout: u8,
    /// Raw FFU_FEATURES.
    pub ffu_features: u8,
    /// Raw SUPPORTED_MODES.
    pub supported_modes: u8,
}

fn le32(raw: &[u8; EXT_CSD_LEN], at: usize) -> u32 {
    u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

impl ExtCsd {
    /// Decodes a raw register read.
    pub fn decode(raw: &[u8; EXT_CSD_LEN]) -> Self {
        let mut firmware_version = [0u8; 8];
        firmware_version
            .copy_from_slice(&raw[EXT_CSD_FIRMWARE_VERSION..EXT_CSD_FIRMWARE_VERSION + 8]);

        Self {
            rev: raw[EXT_CSD_REV],
            ffu_status: raw[EXT_CSD_FFU_STATUS],
            mode_operation_codes: raw[EXT_CSD_MODE_OPERATION_CODES],
            mode_config: raw[EXT_CSD_MODE_CONFIG],
            data_sector_size: raw[EXT_CSD_DATA_SECTOR_SIZE],
            fw_config: raw[EXT_CSD_FW_CONFIG],
            generic_cmd6_time: raw[EXT_CSD_GENERIC_CMD6_TIME],
            firmware_version,
            fw_sectors_programmed: le32(raw, EXT_CSD_NUM_OF_FW_SEC_PROG),
            ffu_arg: le32(raw, EXT_CSD_FFU_ARG),
            operation_code_timeout: raw[EXT_CSD_OPERATION_CODE_TIMEOUT],
            ffu_features: raw[EXT_CSD_FFU_FEATURES],
            supported_modes: raw[EXT_CSD_SUPPORTED_MODES],
        }
    }

    /// Device supports FFU and updates are not disabled.
    pub fn ffu_capable(&self) -> bool {
        self.rev >= EXT_CSD_REV_FFU
            && self.supported_modes & SUPPORTED_MODES_FFU != 0
            && self.fw_config & FW_CONFIG_UPDATE_DISABLE == 0
    }

    /// Install can be triggered through MODE_OPERATION_CODES instead of a
    /// power cycle.
    pub fn ffu_mode_op(&self) -> bool {
        self.ffu_features & FFU_FEATURES_SUPPORTED_MODE_OPERATION_CODES != 0
    }

    /// Native data sector size in bytes.
    pub fn block_size(&self) -> usize {
        if self.data_sector_size == DATA_SECTOR_SIZE_4K {
            4096
        } else {
            512
        }
    }

    /// Timeout for ordinary CMD6 switches, in milliseconds.
    pub fn cmd6_timeout_ms(&self) -> u32 {
        10 * self.generic_cmd6_time as u32
    }

    /// Firmware bytes the device accounts for.
    ///
    /// NUM_OF_FW_SEC_PROG counts native sectors, so this is the count times
    /// [`block_size()`](ExtCsd::block_size). The 4 KiB block size is not
    /// scaled by DATA_SECTOR_SIZE a second time.
    pub fn programmed_bytes(&self) -> u64 {
        // DATA_SECTOR_SIZE 1 means 4 KiB = 512 << 3
        let sector = 512u64 << (3 * (self.data_sector_size & DATA_SECTOR_SIZE_4K) as u64);
        self.fw_sectors_programmed as u64 * sector
    }

    /// Typed FFU_STATUS.
    pub fn status(&self) -> FfuStatus {
        FfuStatus::from(self.ffu_status)
    }
}
