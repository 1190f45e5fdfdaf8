//! Error types for cartflash-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. Every variant carries enough context to serve as
//! the diagnostic for a failed operation.

use core::fmt;

/// Which end of a written range failed read-back verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStage {
    /// First 4 bytes of the range
    Start,
    /// Last 4 bytes of the range
    End,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Bus errors
    /// The transport failed to complete a command
    BusError,

    // Device errors
    /// The bus did not answer like the expected cart (already unlocked, or
    /// a different cart)
    NotDetected,
    /// The detection probe classified the cart as unsupported
    UnsupportedDevice,
    /// The device must be initialized before this operation
    NotInitialized,
    /// The device family has no command for this operation
    OperationNotSupported,

    // Operation errors
    /// Reading a sector for read-modify-write failed
    ReadFailure {
        /// Start of the sector being read
        addr: u32,
    },
    /// Sector did not read back as all-ones after exhausting the retries
    EraseVerifyFailure {
        /// Start of the sector that failed to erase
        addr: u32,
    },
    /// Read-back of the written range did not match the source
    WriteVerifyFailure {
        /// Address of the mismatching word
        addr: u32,
        /// Which endpoint mismatched
        stage: VerifyStage,
    },

    // Address/size errors
    /// The payload does not fit the space reserved for it
    SizeExceeded {
        /// Requested length
        len: usize,
        /// Maximum accepted length
        max: usize,
    },
    /// Address range is beyond the flash size
    AddressOutOfBounds,
    /// Key material is shorter than a Blowfish P-array plus S-boxes
    InvalidKey,
}

impl fmt::Display for VerifyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusError => write!(f, "cartridge bus transfer failed"),
            Self::NotDetected => write!(f, "cart did not respond as expected"),
            Self::UnsupportedDevice => write!(f, "cart detected but not supported"),
            Self::NotInitialized => write!(f, "cart not initialized"),
            Self::OperationNotSupported => write!(f, "operation not supported by this cart"),
            Self::ReadFailure { addr } => {
                write!(f, "failed to read NOR sector at 0x{:06X}", addr)
            }
            Self::EraseVerifyFailure { addr } => {
                write!(f, "NOR erase sanity check failed at 0x{:06X}", addr)
            }
            Self::WriteVerifyFailure { addr, stage } => write!(
                f,
                "NOR write {} verification failed at 0x{:06X}",
                stage, addr
            ),
            Self::SizeExceeded { len, max } => {
                write!(f, "payload too big ({} bytes, max {} bytes)", len, max)
            }
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidKey => write!(f, "Blowfish key too short"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
