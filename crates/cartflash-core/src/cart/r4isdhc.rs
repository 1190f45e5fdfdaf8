//! R4iSDHC family
//!
//! A family of DSTT clones with a 2 MiB NOR behind a passthrough FPGA.
//! Known members include the R4iSDHC RTS Lite, the R4i-SDHC 3DS RTS and the
//! R4i-SDHC B9S.

use crate::bus::{self, CartBus};
use crate::cmd::{nor_cmd, opcodes};
use crate::error::{Error, Result};
use crate::inject::{self, InjectionLayout};
use crate::nor;
use crate::progress::Progress;

use super::detect::{probe, DetectState, ProbeOutcome};
use super::{CartFeatures, CartVariant, Flashcart, NorProfile};

/// Answer of a locked cart to any command
const LOCKED_WORD: u32 = 0xFFFF_FFFF;

/// R4iSDHC family cart on bus `B`
pub struct R4iSdhc<B> {
    bus: B,
    profile: NorProfile,
    state: DetectState,
    variant: CartVariant,
}

impl<B: CartBus> R4iSdhc<B> {
    /// Wrap a bus; the cart still has to be initialized
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            profile: NorProfile::R4ISDHC,
            state: DetectState::Locked,
            variant: CartVariant::Current,
        }
    }

    /// Current detection state
    pub fn state(&self) -> DetectState {
        self.state
    }

    /// Assume a variant instead of the detected one
    ///
    /// Takes effect until the next initialization.
    pub fn force_variant(&mut self, variant: CartVariant) {
        self.variant = variant;
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

    /// Send the write disable command and return its answer
    ///
    /// A locked cart answers all-ones; once unlocked a current cart answers
    /// zero.
    fn write_disable(&mut self) -> Result<u32> {
        let cmd = nor_cmd(0, 1, opcodes::WRDI, 0, 0, 0);
        let word = bus::send_read(&mut self.bus, &cmd.bytes(), self.profile.policy.command_latency)?;
        Ok(bus::word_le(word))
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            DetectState::Classified(outcome) if outcome.is_supported() => Ok(()),
            _ => Err(Error::NotInitialized),
        }
    }
}

impl<B: CartBus> Flashcart for R4iSdhc<B> {
    fn profile(&self) -> &NorProfile {
        &self.profile
    }

    fn variant(&self) -> CartVariant {
        self.variant
    }

    fn initialize(&mut self) -> Result<()> {
        self.state = DetectState::Locked;

        let answer = self.write_disable()?;
        if answer != LOCKED_WORD {
            log::error!("R4iSDHC: cart answered {:08X} before unlock", answer);
            return Err(Error::NotDetected);
        }

        self.state = DetectState::Probing;
        let outcome = match probe(&mut self.bus, &self.profile.policy) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("R4iSDHC: probe failed: {}", e);
                self.state = DetectState::Locked;
                return Err(e);
            }
        };
        self.state = DetectState::Classified(outcome);
        if let ProbeOutcome::Unsupported(stage) = outcome {
            log::error!("R4iSDHC: unsupported cart (probe stage {:?})", stage);
            return Err(Error::UnsupportedDevice);
        }

        self.variant = match self.write_disable()? {
            0 => CartVariant::Current,
            _ => CartVariant::Legacy,
        };
        log::info!("R4iSDHC: detected {:?} ({:?} cart)", outcome, self.variant);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        log::debug!("R4iSDHC: shutdown");
        Ok(())
    }

    fn read_flash(&mut self, addr: u32, buf: &mut [u8], progress: &mut dyn Progress) -> Result<()> {
        self.ensure_ready()?;
        self.profile.require(CartFeatures::READ)?;
        self.profile.check_range(addr, buf.len())?;
        nor::read_range(&mut self.bus, &self.profile.policy, addr, buf, Some(progress))
    }

    fn write_flash(&mut self, addr: u32, data: &[u8], progress: &mut dyn Progress) -> Result<()> {
        self.ensure_ready()?;
        self.profile.check_range(addr, data.len())?;
        nor::write(&mut self.bus, &self.profile.policy, addr, data, progress, "Writing NOR")
    }

    fn injection_layout(&self, firm_len: usize) -> Result<InjectionLayout> {
        InjectionLayout::r4isdhc(self.variant.is_legacy(), firm_len)
    }

    fn inject_boot(&mut self, key: &[u8], firm: &[u8], progress: &mut dyn Progress) -> Result<()> {
        let layout = match self.injection_layout(firm.len()) {
            Ok(layout) => layout,
            Err(e) => {
                progress.report(0, 1, "FIRM too big (max 2003456 bytes)");
                return Err(e);
            }
        };
        inject::check_key(key)?;
        self.ensure_ready()?;

        log::info!("R4iSDHC: injecting ntrboot ({} byte FIRM)", firm.len());
        for region in layout.regions() {
            log::info!("{} at 0x{:06X} (0x{:X} bytes)", region.name, region.offset, region.len());
            let data = region.bytes(key, firm);
            nor::write(&mut self.bus, &self.profile.policy, region.offset, data, progress, region.name)?;
        }
        Ok(())
    }
}
