//! cartflash-dummy - Emulated flashcarts for testing
//!
//! This crate provides in-memory emulations of the supported carts. They
//! implement [`CartBus`](cartflash_core::bus::CartBus), so the real device
//! code in `cartflash-core` runs against them unchanged. It's useful for
//! testing and development without real hardware.
//!
//! Both emulators count the operations they see and can inject faults
//! (bus failures, slow erases, stale reads).

mod dualcore;
mod error;
pub mod image;
mod r4isdhc;

pub use dualcore::{DualCoreConfig, EmulatedDualCore};
pub use error::{ImageError, Result};
pub use r4isdhc::{EmulatedR4iSdhc, R4iSdhcConfig};

/// Operations seen by an emulated cart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    /// Commands accepted
    pub commands: usize,
    /// Flash reads
    pub reads: usize,
    /// Vendor probe reads
    pub vendor_reads: usize,
    /// Sector or block erases performed
    pub erases: usize,
    /// Pages committed
    pub page_programs: usize,
    /// Single bytes programmed
    pub byte_writes: usize,
    /// Sum of all requested delay cycles
    pub delay_cycles: u64,
}
