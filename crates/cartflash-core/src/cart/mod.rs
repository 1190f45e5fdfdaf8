//! Flashcart families
//!
//! This module provides the [`Flashcart`] trait that abstracts over the
//! supported cart families, and their implementations on top of a
//! [`CartBus`](crate::bus::CartBus).

mod detect;
mod r4isdhc;
#[cfg(feature = "alloc")]
mod r4sdhc_dualcore;

pub use detect::{probe, DetectState, ProbeOutcome, ProbeStage};
pub use r4isdhc::R4iSdhc;
#[cfg(feature = "alloc")]
pub use r4sdhc_dualcore::R4SdhcDualCore;

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::inject::InjectionLayout;
use crate::nor::SettlePolicy;
use crate::progress::Progress;

bitflags! {
    /// Cart family capabilities
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CartFeatures: u32 {
        /// NOR passthrough with 256-byte page programs and 4 KiB erase
        const PAGE_PROGRAM    = 1 << 0;
        /// Controller-driven byte programs and 64 KiB erase
        const BYTE_PROGRAM    = 1 << 1;
        /// Data is obfuscated before it is committed
        const OBFUSCATED      = 1 << 2;
        /// Initialization runs the vendor detection probe
        const DETECTION_PROBE = 1 << 3;
        /// Flash contents can be read back
        const READ            = 1 << 4;
    }
}

/// Cart family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartFamily {
    /// R4iSDHC and its DSTT-clone siblings
    R4iSdhc,
    /// R4 SDHC Dual-Core
    R4SdhcDualCore,
}

/// Cart generation, decided during initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartVariant {
    /// Current carts keep a ROM <=> NOR map in NOR
    #[default]
    Current,
    /// Older carts have no map and read part of the FIRM from the mirror
    Legacy,
}

impl CartVariant {
    /// Whether this is a legacy cart
    pub fn is_legacy(self) -> bool {
        self == Self::Legacy
    }
}

/// Static description of a cart's flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NorProfile {
    /// Human readable family name
    pub name: &'static str,
    /// Family
    pub family: CartFamily,
    /// Flash size in bytes
    pub total_size: u32,
    /// Program granularity
    pub page_size: u32,
    /// Erase granularity
    pub erase_size: u32,
    /// Capabilities
    pub features: CartFeatures,
    /// Delays and retries
    pub policy: SettlePolicy,
}

impl NorProfile {
    /// The R4iSDHC family: 2 MiB NOR behind a passthrough FPGA
    pub const R4ISDHC: Self = Self {
        name: "R4iSDHC family",
        family: CartFamily::R4iSdhc,
        total_size: 0x200000,
        page_size: 256,
        erase_size: 4096,
        features: CartFeatures::PAGE_PROGRAM
            .union(CartFeatures::DETECTION_PROBE)
            .union(CartFeatures::READ),
        policy: SettlePolicy::R4ISDHC,
    };

    /// The R4 SDHC Dual-Core: 2 MiB, byte programmed, obfuscated
    pub const R4SDHC_DUALCORE: Self = Self {
        name: "R4 SDHC Dual-Core",
        family: CartFamily::R4SdhcDualCore,
        total_size: 0x200000,
        page_size: 1,
        erase_size: 0x10000,
        features: CartFeatures::BYTE_PROGRAM
            .union(CartFeatures::OBFUSCATED)
            .union(CartFeatures::READ),
        policy: SettlePolicy::BYTE_PROGRAM,
    };

    /// Check if a range is valid for this device
    pub fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        (addr as u64)
            .checked_add(len as u64)
            .map_or(false, |end| end <= self.total_size as u64)
    }

    /// Fail with [`Error::OperationNotSupported`] unless the cart has `feature`
    pub fn require(&self, feature: CartFeatures) -> Result<()> {
        if !self.features.contains(feature) {
            log::error!("{}: operation needs {:?}", self.name, feature);
            return Err(Error::OperationNotSupported);
        }
        Ok(())
    }

    /// [`Self::is_valid_range`] as a `Result`
    pub fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        if !self.is_valid_range(addr, len) {
            log::error!(
                "{}: range 0x{:06X}+0x{:X} is beyond the 0x{:X}-byte flash",
                self.name,
                addr,
                len,
                self.total_size
            );
            return Err(Error::AddressOutOfBounds);
        }
        Ok(())
    }
}

/// A flashcart that can be read, written and injected
///
/// Operations other than [`Flashcart::initialize`] and
/// [`Flashcart::injection_layout`] fail with [`Error::NotInitialized`] until
/// initialization has succeeded.
///
/// # Example
///
/// ```ignore
/// use cartflash_core::cart::Flashcart;
///
/// fn dump<C: Flashcart>(cart: &mut C) -> Result<Vec<u8>> {
///     let mut buf = vec![0u8; cart.profile().total_size as usize];
///     cart.initialize()?;
///     cart.read_flash(0, &mut buf, &mut NoProgress)?;
///     Ok(buf)
/// }
/// ```
pub trait Flashcart {
    /// The flash description of this cart
    fn profile(&self) -> &NorProfile;

    /// Family name
    fn name(&self) -> &'static str {
        self.profile().name
    }

    /// Variant detected during initialization
    fn variant(&self) -> CartVariant {
        CartVariant::Current
    }

    /// Identify the cart and prepare it for flash access
    fn initialize(&mut self) -> Result<()>;

    /// Release the cart
    fn shutdown(&mut self) -> Result<()>;

    /// Read `buf.len()` bytes at `addr`
    fn read_flash(&mut self, addr: u32, buf: &mut [u8], progress: &mut dyn Progress)
        -> Result<()>;

    /// Write `data` at `addr`, preserving the rest of the touched erase units
    fn write_flash(&mut self, addr: u32, data: &[u8], progress: &mut dyn Progress) -> Result<()>;

    /// Compute where an injection of a `firm_len`-byte FIRM would write
    fn injection_layout(&self, firm_len: usize) -> Result<InjectionLayout>;

    /// Write the Blowfish `key` and the `firm` boot image
    ///
    /// Size checks happen before any bus traffic. A failing step aborts the
    /// injection; steps already written stay written.
    fn inject_boot(&mut self, key: &[u8], firm: &[u8], progress: &mut dyn Progress)
        -> Result<()>;
}
