//! R4 SDHC Dual-Core
//!
//! The controller programs single bytes and erases 64 KiB blocks. Injected
//! data is obfuscated with [`crate::cipher::encode`].

use alloc::vec;

use crate::bus::CartBus;
use crate::cipher;
use crate::error::{Error, Result};
use crate::inject::{self, InjectionLayout, Region};
use crate::naive::{self, BLOCK_SIZE};
use crate::progress::Progress;

use super::{CartFeatures, Flashcart, NorProfile};

const fn block_floor(addr: u32) -> u32 {
    addr & !(BLOCK_SIZE - 1)
}

const fn block_ceil(addr: u32) -> u32 {
    (addr + BLOCK_SIZE - 1) & !(BLOCK_SIZE - 1)
}

/// R4 SDHC Dual-Core cart on bus `B`
pub struct R4SdhcDualCore<B> {
    bus: B,
    profile: NorProfile,
    initialized: bool,
}

impl<B: CartBus> R4SdhcDualCore<B> {
    /// Wrap a bus; the cart still has to be initialized
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            profile: NorProfile::R4SDHC_DUALCORE,
            initialized: false,
        }
    }

    /// The underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Access the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give back the bus
    pub fn into_bus(self) -> B {
        self.bus
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Rewrite the blocks covering `regions`, keeping everything else in them
    ///
    /// All regions must fall inside `start..end`.
    fn rewrite_span(
        &mut self,
        start: u32,
        end: u32,
        regions: &[Region],
        key: &[u8],
        firm: &[u8],
        progress: &mut dyn Progress,
    ) -> Result<()> {
        let policy = self.profile.policy;
        let mut buf = vec![0u8; (end - start) as usize];
        naive::read(&mut self.bus, &policy, start, &mut buf, None)?;

        for region in regions {
            let at = (region.offset - start) as usize;
            let dst = &mut buf[at..at + region.len()];
            let src = region.bytes(key, firm);
            if region.encoded {
                cipher::encode_into(dst, src);
            } else {
                dst.copy_from_slice(src);
            }
        }

        let label = regions.first().map_or("Writing", |r| r.name);
        naive::write(&mut self.bus, &policy, start, &buf, progress, label)
    }
}

impl<B: CartBus> Flashcart for R4SdhcDualCore<B> {
    fn profile(&self) -> &NorProfile {
        &self.profile
    }

    fn initialize(&mut self) -> Result<()> {
        log::info!("R4SDHC: Init");
        let policy = self.profile.policy;
        let version = naive::cart_version(&mut self.bus, &policy)?;
        let chip = naive::chip_id(&mut self.bus, &policy)?;
        log::info!("R4SDHC: cart version {:04X}, chip id {:04X}", version, chip);
        self.initialized = true;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        log::info!("R4SDHC: Shutdown");
        self.initialized = false;
        Ok(())
    }

    fn read_flash(&mut self, addr: u32, buf: &mut [u8], progress: &mut dyn Progress) -> Result<()> {
        self.ensure_ready()?;
        self.profile.require(CartFeatures::READ)?;
        self.profile.check_range(addr, buf.len())?;
        naive::read(&mut self.bus, &self.profile.policy, addr, buf, Some(progress))
    }

    fn write_flash(&mut self, addr: u32, data: &[u8], progress: &mut dyn Progress) -> Result<()> {
        self.ensure_ready()?;
        self.profile.check_range(addr, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        let start = block_floor(addr);
        let end = block_ceil(addr + data.len() as u32);
        let policy = self.profile.policy;
        let mut buf = vec![0u8; (end - start) as usize];
        naive::read(&mut self.bus, &policy, start, &mut buf, None)?;

        let at = (addr - start) as usize;
        buf[at..at + data.len()].copy_from_slice(data);
        naive::write(&mut self.bus, &policy, start, &buf, progress, "Writing")
    }

    fn injection_layout(&self, firm_len: usize) -> Result<InjectionLayout> {
        InjectionLayout::dualcore(firm_len)
    }

    fn inject_boot(&mut self, key: &[u8], firm: &[u8], progress: &mut dyn Progress) -> Result<()> {
        let layout = self.injection_layout(firm.len())?;
        inject::check_key(key)?;
        self.ensure_ready()?;

        log::info!("R4SDHC: Injecting ntrboot");
        naive::unlock(&mut self.bus, &self.profile.policy)?;

        // Regions sharing an erase block are written in one pass
        let regions = layout.regions();
        let mut first = 0;
        while first < regions.len() {
            let start = block_floor(regions[first].offset);
            let mut end = block_ceil(regions[first].offset + regions[first].len() as u32);
            let mut last = first + 1;
            while last < regions.len() && block_floor(regions[last].offset) < end {
                end = end.max(block_ceil(regions[last].offset + regions[last].len() as u32));
                last += 1;
            }

            log::info!("Rewriting 0x{:06X}..0x{:06X}", start, end);
            self.rewrite_span(start, end, &regions[first..last], key, firm, progress)?;
            first = last;
        }
        Ok(())
    }
}
