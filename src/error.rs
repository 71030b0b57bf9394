use core::fmt;

use thiserror::Error;

/// FFU_STATUS byte reported by the device after an install attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FfuStatus {
    /// Firmware was installed.
    Success,
    /// Unspecified device error.
    GeneralError,
    /// The downloaded firmware could not be installed.
    FirmwareInstallError,
    /// The firmware download itself failed.
    DownloadFirmwareError,
    /// Reserved or vendor-specific status value.
    Other(u8),
}

impl From<u8> for FfuStatus {
    fn from(v: u8) -> Self {
        match v {
            0x00 => FfuStatus::Success,
            0x10 => FfuStatus::GeneralError,
            0x11 => FfuStatus::FirmwareInstallError,
            0x12 => FfuStatus::DownloadFirmwareError,
            v => FfuStatus::Other(v),
        }
    }
}

impl From<FfuStatus> for u8 {
    fn from(s: FfuStatus) -> Self {
        match s {
            FfuStatus::Success => 0x00,
            FfuStatus::GeneralError => 0x10,
            FfuStatus::FirmwareInstallError => 0x11,
            FfuStatus::DownloadFirmwareError => 0x12,
            FfuStatus::Other(v) => v,
        }
    }
}

impl fmt::Display for FfuStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FfuStatus::Success => write!(f, "success"),
            FfuStatus::GeneralError => write!(f, "general error (0x10)"),
            FfuStatus::FirmwareInstallError => write!(f, "firmware install error (0x11)"),
            FfuStatus::DownloadFirmwareError => write!(f, "firmware download error (0x12)"),
            FfuStatus::Other(v) => write!(f, "unknown status {:#04x}", v),
        }
    }
}

/// Opaque failure reported by the card or host primitives.
///
/// The FFU code never interprets these, it only passes them up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MmcError {
    /// Command or data phase timed out.
    #[error("command timed out")]
    Timeout,
    /// CRC mismatch on the command or data lines.
    #[error("CRC error")]
    Crc,
    /// The card refused the command in its current state.
    #[error("card rejected the command")]
    Rejected,
    /// Host controller specific error code.
    #[error("host error {0}")]
    Host(i32),
}

/// Reasons an argument, a limit set or a device report was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Invalid {
    /// Firmware identifier is longer than the protocol allows.
    #[error("firmware name is {len} bytes long, the limit is {max}")]
    NameTooLong {
        /// Length of the offered name.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },
    /// There is nothing to send.
    #[error("firmware image is empty")]
    EmptyImage,
    /// Image length is not a whole number of device sectors.
    #[error("firmware size {size} is not a multiple of the {block_size} byte sector")]
    Misaligned {
        /// Image length in bytes.
        size: usize,
        /// Device data sector size.
        block_size: usize,
    },
    /// Host limits cannot carry even one device sector per request.
    #[error("host limits cannot carry a {block_size} byte sector")]
    HostLimits {
        /// Device data sector size.
        block_size: usize,
    },
    /// Source buffer is shorter than the transfer built over it.
    #[error("source holds {available} bytes but the transfer needs {needed}")]
    ShortSource {
        /// Bytes available in the source.
        available: usize,
        /// Bytes the transfer covers.
        needed: usize,
    },
    /// More blocks were staged than the transfer size accounts for.
    #[error("staged {staged} bytes past a {max} byte transfer")]
    TransferOverrun {
        /// Bytes staged when the overrun was found.
        staged: usize,
        /// Transfer size of the area.
        max: usize,
    },
    /// Raw mode value that names no FFU mode.
    #[error("unknown FFU mode {0:#x}")]
    UnknownMode(u8),
    /// Device accounted for a different number of bytes than were sent.
    #[error("device reports {programmed} firmware bytes programmed, image is {expected}")]
    ProgrammedSize {
        /// Bytes the device reports as programmed.
        programmed: u64,
        /// Image length.
        expected: usize,
    },
    /// Device reported a failed install.
    #[error("firmware install failed: {0}")]
    InstallStatus(FfuStatus),
}

/// Outcome of staging memory for one transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AllocError {
    /// Staging needs more segments than the host can map.
    #[error("staging needs {requested} segments, the host allows {limit}")]
    TooManySegments {
        /// Segment capacity that would be required.
        requested: usize,
        /// Host segment limit.
        limit: usize,
    },
    /// Not even a single page could be allocated.
    #[error("out of memory staging {pages} pages")]
    OutOfMemory {
        /// Pages still to be staged when allocation failed.
        pages: usize,
    },
    /// Allocation stopped short of the required minimum.
    #[error("allocated {allocated} pages, at least {required} are required")]
    BelowMinimum {
        /// Pages allocated.
        allocated: usize,
        /// Pages required.
        required: usize,
    },
}

/// Error returned by every FFU operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FfuError {
    /// Device lacks FFU capability.
    #[error("field firmware update is not supported by the device")]
    Unsupported,
    /// Malformed input or a failed post-operation check.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] Invalid),
    /// Staging memory could not be provided.
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] AllocError),
    /// A card or host primitive failed.
    #[error("transport error: {0}")]
    Transport(#[from] MmcError),
}

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, FfuError>;
