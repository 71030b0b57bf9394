use tracing::{error, info, warn};

use crate::error::{FfuError, Invalid, Result};
use crate::ext_csd::ExtCsd;
use crate::host::{DeviceLimits, HostClaim, MmcCard};
use crate::mode::{install, read_ext_csd, switch_mode, FfuMode};
use crate::pages::PageAllocator;
use crate::write::write_firmware;

/// Longest accepted firmware name.
pub const MAX_FIRMWARE_NAME_LEN: usize = 512;

/// Field firmware updater for one card.
///
/// Owns the card and the page allocator used for staging. Every
/// [`invoke()`](FfuUpdater::invoke) holds the host for its whole duration.
pub struct FfuUpdater<C: MmcCard, P: PageAllocator> {
    card: C,
    pages: P,
}

impl<C: MmcCard, P: PageAllocator> FfuUpdater<C, P> {
    /// Creates an updater for `card`, staging through `pages`.
    pub fn new(card: C, pages: P) -> Self {
        Self { card, pages }
    }

    /// The card.
    pub fn card(&self) -> &C {
        &self.card
    }

    /// The card, mutably.
    pub fn card_mut(&mut self) -> &mut C {
        &mut self.card
    }

    /// The page allocator.
    pub fn pages(&self) -> &P {
        &self.pages
    }

    /// Give back the card and the page allocator.
    pub fn into_inner(self) -> (C, P) {
        (self.card, self.pages)
    }

    /// Download `firmware` to the device and install it.
    ///
    /// `name` identifies the image in log records. The host is claimed for
    /// the whole call, capability checks included. On any failure after the
    /// device left normal mode, it is switched back before the error is
    /// returned.
    pub fn invoke(&mut self, name: &str, firmware: &[u8]) -> Result<()> {
        let mut card = HostClaim::new(&mut self.card);

        let info = match read_ext_csd(&mut *card) {
            Ok(csd) => csd,
            Err(e) => {
                error!(host = card.hostname(), "error {} sending ext_csd", e);
                return Err(e);
            }
        };

        if !info.ffu_capable() {
            error!(host = card.hostname(), rev = info.rev, "FFU is not supported");
            return Err(FfuError::Unsupported);
        }

        if name.len() > MAX_FIRMWARE_NAME_LEN {
            error!(host = card.hostname(), "firmware name is not a valid argument");
            return Err(Invalid::NameTooLong {
                len: name.len(),
                max: MAX_FIRMWARE_NAME_LEN,
            }
            .into());
        }

        let block_size = info.block_size();
        if firmware.len() % block_size != 0 {
            warn!(
                host = card.hostname(),
                size = firmware.len(),
                block_size,
                "firmware data size is not aligned"
            );
        }

        let err = match Self::update(&mut *card, &mut self.pages, &info, name, firmware) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        // host switch back to work in normal MMC read/write commands
        if let Err(e) = switch_mode(&mut *card, FfuMode::Normal, info.cmd6_timeout_ms()) {
            warn!(
                host = card.hostname(),
                "restoring normal mode failed: {}", e
            );
        }
        Err(err)
    }

    fn update(
        card: &mut C,
        pages: &mut P,
        info: &ExtCsd,
        name: &str,
        firmware: &[u8],
    ) -> Result<()> {
        if let Err(e) = card.flush_cache() {
            error!(host = card.hostname(), "error {} flushing data", e);
            return Err(e.into());
        }

        let ext_csd = match read_ext_csd(card) {
            Ok(csd) => csd,
            Err(e) => {
                error!(host = card.hostname(), "error {} sending ext_csd", e);
                return Err(e);
            }
        };
        info!(
            host = card.hostname(),
            firmware = name,
            version = ?ext_csd.firmware_version,
            "starting firmware update"
        );

        if let Err(e) = switch_mode(card, FfuMode::FfuSet, info.cmd6_timeout_ms()) {
            error!(host = card.hostname(), "error {} FFU is not supported", e);
            return Err(e);
        }

        let limits = DeviceLimits::new(card.host_limits(), info.block_size())?;
        if let Err(e) = write_firmware(card, pages, &limits, firmware, ext_csd.ffu_arg) {
            error!(host = card.hostname(), "write error {}", e);
            return Err(e);
        }

        let mut ext_csd = ext_csd;
        // payload is checked only when mode operation codes are supported
        if info.ffu_mode_op() {
            ext_csd = match read_ext_csd(card) {
                Ok(csd) => csd,
                Err(e) => {
                    error!(host = card.hostname(), "error {} sending ext_csd", e);
                    return Err(e);
                }
            };

            let programmed = ext_csd.programmed_bytes();
            if programmed != firmware.len() as u64 {
                error!(
                    host = card.hostname(),
                    programmed,
                    size = firmware.len(),
                    "number of programmed fw sectors incorrect"
                );
                return Err(Invalid::ProgrammedSize {
                    programmed,
                    expected: firmware.len(),
                }
                .into());
            }
        }

        let after = match install(card, &ext_csd) {
            Ok(csd) => csd,
            Err(e) => {
                error!(host = card.hostname(), "error firmware install {}", e);
                return Err(e);
            }
        };

        info!(
            host = card.hostname(),
            version = ?after.firmware_version,
            "firmware update complete"
        );
        Ok(())
    }
}
