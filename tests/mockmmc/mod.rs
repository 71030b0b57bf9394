#![allow(dead_code)]

use mmc_ffu::ext_csd::*;
use mmc_ffu::{HostLimits, MmcCard, MmcError, SgList};

pub const FW_VERSION_OLD: &[u8; 8] = b"FW000001";
pub const FW_VERSION_NEW: &[u8; 8] = b"FW000002";
pub const TEST_FFU_ARG: u32 = 0xc0de_0042;
pub const TEST_CMD6_TIME: u8 = 10;

/// One data command as seen by the card.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub arg: u32,
    pub blocks: u32,
    pub blksz: u32,
    pub write: bool,
    pub sg_len: usize,
    pub claimed: bool,
    pub data: Vec<u8>,
}

pub struct TestCardOverride {
    pub flush_cache: Option<fn(&mut TestCard) -> Result<(), MmcError>>,
    pub send_ext_csd: Option<fn(&mut TestCard) -> Result<(), MmcError>>,
    pub switch: Option<fn(&mut TestCard, u8, u8, u32) -> Result<(), MmcError>>,
    pub simple_transfer:
        Option<for<'a> fn(&mut TestCard, SgList<'a>, u32, u32, u32) -> Result<(), MmcError>>,
    pub power_save_host: Option<fn(&mut TestCard) -> Result<(), MmcError>>,
    pub power_restore_host: Option<fn(&mut TestCard) -> Result<(), MmcError>>,
}

impl TestCardOverride {
    pub fn none() -> Self {
        Self {
            flush_cache: None,
            send_ext_csd: None,
            switch: None,
            simple_transfer: None,
            power_save_host: None,
            power_restore_host: None,
        }
    }
}

/// Emulated eMMC device with an FFU capable EXT_CSD.
pub struct TestCard {
    pub ext_csd: [u8; EXT_CSD_LEN],
    pub limits: HostLimits,
    /// FFU_STATUS the device reports after an install.
    pub install_status: u8,
    /// Refuse every command sent while the host is not claimed.
    pub strict_claim: bool,

    pub transfers: Vec<Transfer>,
    pub switches: Vec<(u8, u8, u32)>,
    pub ext_csd_reads: usize,
    pub flushes: usize,
    pub power_saves: usize,
    pub power_restores: usize,
    pub claims: usize,
    pub releases: usize,
    pub claimed: bool,

    pub overrides: TestCardOverride,
}

impl TestCard {
    pub fn new(sector_4k: bool, mode_op_codes: bool) -> Self {
        let mut ext_csd = [0u8; EXT_CSD_LEN];
        set_ffu(&mut ext_csd, sector_4k, mode_op_codes);

        Self {
            ext_csd,
            limits: default_limits(),
            install_status: 0,
            strict_claim: false,
            transfers: Vec::new(),
            switches: Vec::new(),
            ext_csd_reads: 0,
            flushes: 0,
            power_saves: 0,
            power_restores: 0,
            claims: 0,
            releases: 0,
            claimed: false,
            overrides: TestCardOverride::none(),
        }
    }

    pub fn with_limits(mut self, limits: HostLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_install_status(mut self, status: u8) -> Self {
        self.install_status = status;
        self
    }

    pub fn with_op_code_timeout(mut self, exp: u8) -> Self {
        self.ext_csd[EXT_CSD_OPERATION_CODE_TIMEOUT] = exp;
        self
    }

    pub fn with_strict_claim(mut self) -> Self {
        self.strict_claim = true;
        self
    }

    pub fn with_overrides(mut self, overrides: TestCardOverride) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn mode_config(&self) -> u8 {
        self.ext_csd[EXT_CSD_MODE_CONFIG]
    }

    pub fn mode_operation_codes(&self) -> u8 {
        self.ext_csd[EXT_CSD_MODE_OPERATION_CODES]
    }

    pub fn firmware_version(&self) -> &[u8] {
        &self.ext_csd[EXT_CSD_FIRMWARE_VERSION..EXT_CSD_FIRMWARE_VERSION + 8]
    }

    pub fn sectors_programmed(&self) -> u32 {
        let at = EXT_CSD_NUM_OF_FW_SEC_PROG;
        u32::from_le_bytes([
            self.ext_csd[at],
            self.ext_csd[at + 1],
            self.ext_csd[at + 2],
            self.ext_csd[at + 3],
        ])
    }

    pub fn set_sectors_programmed(&mut self, sectors: u32) {
        let at = EXT_CSD_NUM_OF_FW_SEC_PROG;
        self.ext_csd[at..at + 4].copy_from_slice(&sectors.to_le_bytes());
    }

    /// Everything written so far, in order.
    pub fn written(&self) -> Vec<u8> {
        self.transfers
            .iter()
            .flat_map(|t| t.data.iter().copied())
            .collect()
    }

    fn check_claim(&self) -> Result<(), MmcError> {
        if self.strict_claim && !self.claimed {
            return Err(MmcError::Rejected);
        }
        Ok(())
    }

    fn sector_size(&self) -> u32 {
        512 << (3 * self.ext_csd[EXT_CSD_DATA_SECTOR_SIZE] as u32)
    }

    // emulate the device picking up downloaded firmware
    fn apply_install(&mut self) {
        self.ext_csd[EXT_CSD_FFU_STATUS] = self.install_status;
        if self.install_status == 0 {
            self.ext_csd[EXT_CSD_FIRMWARE_VERSION..EXT_CSD_FIRMWARE_VERSION + 8]
                .copy_from_slice(FW_VERSION_NEW);
        }
    }

    /// Default data command handling, usable from overrides.
    pub fn record_transfer(
        &mut self,
        sg: SgList<'_>,
        arg: u32,
        blocks: u32,
        blksz: u32,
    ) -> Result<(), MmcError> {
        if self.mode_config() != 0x1 {
            // not in FFU mode, arg would be an address
            return Err(MmcError::Rejected);
        }

        let len = (blocks * blksz) as usize;
        if sg.total_len() != len {
            return Err(MmcError::Rejected);
        }

        let mut data = vec![0u8; len];
        assert_eq!(sg.copy_to_buffer(&mut data), len);

        self.transfers.push(Transfer {
            arg,
            blocks,
            blksz,
            write: true,
            sg_len: sg.len(),
            claimed: self.claimed,
            data,
        });

        let sectors = self.sectors_programmed() + len as u32 / self.sector_size();
        self.set_sectors_programmed(sectors);
        Ok(())
    }
}

impl MmcCard for TestCard {
    fn hostname(&self) -> &str {
        "mmc0"
    }

    fn host_limits(&self) -> HostLimits {
        self.limits
    }

    fn claim_host(&mut self) {
        assert!(!self.claimed, "host claimed twice");
        self.claimed = true;
        self.claims += 1;
    }

    fn release_host(&mut self) {
        assert!(self.claimed, "host released while not claimed");
        self.claimed = false;
        self.releases += 1;
    }

    fn flush_cache(&mut self) -> Result<(), MmcError> {
        self.check_claim()?;
        if self.overrides.flush_cache.is_some() {
            return self.overrides.flush_cache.unwrap()(self);
        }
        self.flushes += 1;
        Ok(())
    }

    fn send_ext_csd(&mut self, ext_csd: &mut [u8; EXT_CSD_LEN]) -> Result<(), MmcError> {
        self.check_claim()?;
        if self.overrides.send_ext_csd.is_some() {
            self.overrides.send_ext_csd.unwrap()(self)?;
        }
        self.ext_csd_reads += 1;
        ext_csd.copy_from_slice(&self.ext_csd);
        Ok(())
    }

    fn switch(&mut self, index: u8, value: u8, timeout_ms: u32) -> Result<(), MmcError> {
        self.check_claim()?;
        if self.overrides.switch.is_some() {
            return self.overrides.switch.unwrap()(self, index, value, timeout_ms);
        }
        self.switches.push((index, value, timeout_ms));

        match index as usize {
            EXT_CSD_MODE_CONFIG => {
                self.ext_csd[EXT_CSD_MODE_CONFIG] = value;
            }
            EXT_CSD_MODE_OPERATION_CODES => {
                if self.mode_config() != 0x1 {
                    return Err(MmcError::Rejected);
                }
                self.ext_csd[EXT_CSD_MODE_OPERATION_CODES] = value;
                if value == MODE_OPERATION_CODE_FFU_INSTALL {
                    self.apply_install();
                    self.ext_csd[EXT_CSD_MODE_CONFIG] = 0;
                }
            }
            _ => return Err(MmcError::Rejected),
        }
        Ok(())
    }

    fn simple_transfer(
        &mut self,
        sg: SgList<'_>,
        arg: u32,
        blocks: u32,
        blksz: u32,
        write: bool,
    ) -> Result<(), MmcError> {
        assert!(write, "FFU only writes");
        self.check_claim()?;
        if self.overrides.simple_transfer.is_some() {
            return self.overrides.simple_transfer.unwrap()(self, sg, arg, blocks, blksz);
        }
        self.record_transfer(sg, arg, blocks, blksz)
    }

    fn power_save_host(&mut self) -> Result<(), MmcError> {
        self.check_claim()?;
        if self.overrides.power_save_host.is_some() {
            return self.overrides.power_save_host.unwrap()(self);
        }
        self.power_saves += 1;
        Ok(())
    }

    fn power_restore_host(&mut self) -> Result<(), MmcError> {
        self.check_claim()?;
        if self.overrides.power_restore_host.is_some() {
            return self.overrides.power_restore_host.unwrap()(self);
        }
        self.power_restores += 1;
        self.apply_install();
        Ok(())
    }
}

/// Fill EXT_CSD of an FFU capable device.
pub fn set_ffu(ext_csd: &mut [u8; EXT_CSD_LEN], sector_4k: bool, mode_op_codes: bool) {
    ext_csd[EXT_CSD_REV] = 8;
    ext_csd[EXT_CSD_SUPPORTED_MODES] = 0x1;
    ext_csd[EXT_CSD_FW_CONFIG] = 0x0;
    ext_csd[EXT_CSD_FFU_FEATURES] = mode_op_codes as u8;
    ext_csd[EXT_CSD_DATA_SECTOR_SIZE] = sector_4k as u8;
    ext_csd[EXT_CSD_GENERIC_CMD6_TIME] = TEST_CMD6_TIME;
    ext_csd[EXT_CSD_OPERATION_CODE_TIMEOUT] = 0x10;
    ext_csd[EXT_CSD_FFU_ARG..EXT_CSD_FFU_ARG + 4].copy_from_slice(&TEST_FFU_ARG.to_le_bytes());
    ext_csd[EXT_CSD_FIRMWARE_VERSION..EXT_CSD_FIRMWARE_VERSION + 8]
        .copy_from_slice(FW_VERSION_OLD);
}

pub fn default_limits() -> HostLimits {
    HostLimits {
        max_segs: 128,
        max_seg_size: 65536,
        max_blk_count: 65535,
        max_req_size: 512 * 1024,
    }
}
