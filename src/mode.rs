//! FFU mode switching and firmware install.
//!
//! ```text
//!   NORMAL --switch(MODE_CONFIG=FFU)--> FFU_SET --data writes-->
//!
//!   FFU_SET --+-- MODE_OPERATION_CODES supported --> INSTALL_SET
//!             |   (MODE_OPERATION_CODES=FFU_INSTALL, device returns
//!             |    to NORMAL by itself)
//!             |
//!             +-- not supported --> NORMAL + power cycle
//! ```

use core::convert::TryFrom;

use tracing::{error, warn};

use crate::error::{FfuError, FfuStatus, Invalid, Result};
use crate::ext_csd::{
    ExtCsd, EXT_CSD_LEN, EXT_CSD_MODE_CONFIG, EXT_CSD_MODE_OPERATION_CODES,
    MODE_OPERATION_CODE_FFU_INSTALL,
};
use crate::host::MmcCard;

/// Largest valid OPERATION_CODE_TIMEOUT exponent.
pub const OPERATION_CODE_TIMEOUT_MAX: u8 = 0x17;

/// Device modes driven during an update.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FfuMode {
    /// Normal read/write operation.
    Normal = 0x0,
    /// FFU mode, data writes carry firmware.
    FfuSet = 0x1,
    /// Install the downloaded firmware.
    InstallSet = 0x2,
}

impl TryFrom<u8> for FfuMode {
    type Error = Invalid;

    fn try_from(v: u8) -> core::result::Result<Self, Invalid> {
        match v {
            0x0 => Ok(FfuMode::Normal),
            0x1 => Ok(FfuMode::FfuSet),
            0x2 => Ok(FfuMode::InstallSet),
            v => Err(Invalid::UnknownMode(v)),
        }
    }
}

impl FfuMode {
    /// EXT_CSD byte and value a switch to this mode writes.
    pub fn target(self) -> (u8, u8) {
        match self {
            FfuMode::Normal | FfuMode::FfuSet => (EXT_CSD_MODE_CONFIG as u8, self as u8),
            FfuMode::InstallSet => (
                EXT_CSD_MODE_OPERATION_CODES as u8,
                MODE_OPERATION_CODE_FFU_INSTALL,
            ),
        }
    }
}

/// Read and decode EXT_CSD.
pub fn read_ext_csd<C: MmcCard>(card: &mut C) -> Result<ExtCsd> {
    let mut raw = [0u8; EXT_CSD_LEN];
    card.send_ext_csd(&mut raw)?;
    Ok(ExtCsd::decode(&raw))
}

/// Switch the device to `mode`.
pub fn switch_mode<C: MmcCard>(card: &mut C, mode: FfuMode, timeout_ms: u32) -> Result<()> {
    let (index, value) = mode.target();
    card.switch(index, value, timeout_ms)?;
    Ok(())
}

/// Power cycle the card so it boots the new firmware.
pub fn restart<C: MmcCard>(card: &mut C) -> Result<()> {
    if let Err(e) = card.power_save_host() {
        warn!(host = card.hostname(), "going to sleep failed: {}", e);
        return Err(e.into());
    }
    card.power_restore_host()?;
    Ok(())
}

/// Install timeout for an OPERATION_CODE_TIMEOUT exponent, in milliseconds.
///
/// The device waits `100 us * 2^exp`. Out of range exponents, `0` included,
/// use the maximum. Returns the timeout and whether the exponent was clamped.
pub fn install_timeout_ms(exp: u8) -> (u32, bool) {
    let (exp, clamped) = if exp == 0 || exp > OPERATION_CODE_TIMEOUT_MAX {
        (OPERATION_CODE_TIMEOUT_MAX, true)
    } else {
        (exp, false)
    };

    // timeout is at millisecond resolution
    ((100u32 << exp).div_ceil(1000), clamped)
}

/// Install downloaded firmware and check the outcome.
///
/// `ext_csd` is the snapshot taken after the data transfer. Returns the
/// snapshot read after the install.
pub fn install<C: MmcCard>(card: &mut C, ext_csd: &ExtCsd) -> Result<ExtCsd> {
    if !ext_csd.ffu_mode_op() {
        // host switch back to work in normal MMC read/write commands
        if let Err(e) = switch_mode(card, FfuMode::Normal, ext_csd.cmd6_timeout_ms()) {
            error!(host = card.hostname(), "switch to normal mode error {}", e);
            return Err(e);
        }

        if let Err(e) = restart(card) {
            error!(host = card.hostname(), "install error {}", e);
            return Err(e);
        }
    } else {
        let (timeout, clamped) = install_timeout_ms(ext_csd.operation_code_timeout);
        if clamped {
            warn!(
                host = card.hostname(),
                exp = ext_csd.operation_code_timeout,
                "operation code timeout is out of range, using maximum timeout"
            );
        }

        if let Err(e) = switch_mode(card, FfuMode::InstallSet, timeout) {
            error!(host = card.hostname(), "error {} setting install mode", e);
            return Err(e);
        }
    }

    let after = match read_ext_csd(card) {
        Ok(csd) => csd,
        Err(e) => {
            error!(host = card.hostname(), "error {} sending ext_csd", e);
            return Err(e);
        }
    };

    match after.status() {
        FfuStatus::Success => Ok(after),
        status => {
            error!(host = card.hostname(), "FFU install error: {}", status);
            Err(FfuError::InvalidArgument(Invalid::InstallStatus(status)))
        }
    }
}
