//! Emulated R4iSDHC cart
//!
//! Decodes NOR passthrough commands against an in-memory 2 MiB NOR. The cart
//! starts locked and answers everything with all-ones until it sees the
//! `0x68` unlock; after that it serves the detection probe until the next
//! write disable.

use cartflash_core::bus::{CartBus, COMMAND_LEN};
use cartflash_core::cmd::opcodes;
use cartflash_core::error::{Error, Result};

use crate::Counters;

/// Address the probe reads the family marker from
const MARKER_ADDR: usize = 0x7084;
/// First address of the probe's vendor window
const VENDOR_WINDOW: usize = 0x2F00;

const SECTOR_SIZE: usize = 4096;
const PAGE_SIZE: usize = 256;

/// Configuration for the emulated R4iSDHC
#[derive(Debug, Clone)]
pub struct R4iSdhcConfig {
    /// Flash size in bytes
    pub size: usize,
    /// Legacy carts keep answering all-ones to write disable after unlock
    pub legacy: bool,
    /// Low byte of the marker word read during detection
    pub marker: u8,
    /// First 8 bytes of the vendor window read during detection
    pub vendor_window: [u8; 8],
    /// Reads of a freshly erased sector's first word that still see old data
    pub erase_busy_checks: u32,
}

impl Default for R4iSdhcConfig {
    fn default() -> Self {
        Self {
            size: 0x200000,
            legacy: false,
            marker: 0x32,
            vendor_window: [0; 8],
            erase_busy_checks: 0,
        }
    }
}

/// Page program being streamed
struct OpenPage {
    addr: usize,
    data: Vec<u8>,
}

/// Emulated R4iSDHC cart
pub struct EmulatedR4iSdhc {
    config: R4iSdhcConfig,
    data: Vec<u8>,
    locked: bool,
    probing: bool,
    write_enabled: bool,
    page: Option<OpenPage>,
    busy_sector: Option<usize>,
    busy_remaining: u32,
    stale_reads: Vec<usize>,
    fail_after: Option<usize>,
    counters: Counters,
}

impl EmulatedR4iSdhc {
    /// Create a cart with blank flash
    pub fn new(config: R4iSdhcConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self::with_data(config, data)
    }

    /// Create a cart with default configuration
    pub fn new_default() -> Self {
        Self::new(R4iSdhcConfig::default())
    }

    /// Create a cart from an existing flash image
    ///
    /// The image is truncated or padded with 0xFF to the configured size.
    pub fn with_data(config: R4iSdhcConfig, mut data: Vec<u8>) -> Self {
        data.resize(config.size, 0xFF);
        Self {
            config,
            data,
            locked: true,
            probing: false,
            write_enabled: false,
            page: None,
            busy_sector: None,
            busy_remaining: 0,
            stale_reads: Vec::new(),
            fail_after: None,
            counters: Counters::default(),
        }
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Take the flash data
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &R4iSdhcConfig {
        &self.config
    }

    /// Operation counters
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Lock the cart again, as after a power cycle
    pub fn power_cycle(&mut self) {
        self.locked = true;
        self.probing = false;
        self.write_enabled = false;
        self.page = None;
    }

    /// Reads of the word at `addr` return the complement of the flash content
    pub fn inject_stale_read(&mut self, addr: usize) {
        self.stale_reads.push(addr);
    }

    /// Fail every command after the first `n` with a bus error
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    fn read(&mut self, addr: usize, resp: &mut [u8]) -> Result<()> {
        self.counters.reads += 1;

        if self.probing && addr == MARKER_ADDR {
            resp.fill(0);
            if let Some(first) = resp.first_mut() {
                *first = self.config.marker;
            }
            return Ok(());
        }

        let end = addr + resp.len();
        if end > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }
        resp.copy_from_slice(&self.data[addr..end]);

        if self.busy_sector == Some(addr) && self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            resp.fill(0);
        }
        if self.stale_reads.contains(&addr) {
            resp.iter_mut().for_each(|b| *b = !*b);
        }
        Ok(())
    }

    fn vendor_read(&mut self, addr: usize, resp: &mut [u8]) {
        self.counters.vendor_reads += 1;
        resp.fill(0);

        let Some(offset) = addr.checked_sub(VENDOR_WINDOW).map(|words| words * 4) else {
            return;
        };
        for (i, b) in resp.iter_mut().enumerate() {
            if let Some(&v) = self.config.vendor_window.get(offset + i) {
                *b = v;
            }
        }
    }

    fn erase(&mut self, addr: usize) -> Result<()> {
        if !self.write_enabled {
            log::warn!("Sector erase at 0x{:06X} without write enable ignored", addr);
            return Ok(());
        }
        let start = addr & !(SECTOR_SIZE - 1);
        if start + SECTOR_SIZE > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }

        self.data[start..start + SECTOR_SIZE].fill(0xFF);
        self.busy_sector = Some(start);
        self.busy_remaining = self.config.erase_busy_checks;
        self.write_enabled = false;
        self.counters.erases += 1;
        Ok(())
    }

    fn stream(&mut self, cmd: &[u8; COMMAND_LEN]) -> Result<()> {
        match cmd[1] {
            0x00 => {
                let page = self.page.as_mut().ok_or(Error::BusError)?;
                page.data.extend_from_slice(&cmd[2..4]);
                Ok(())
            }
            opcodes::LATCH_COMMIT => {
                let page = self.page.take().ok_or(Error::BusError)?;
                if page.data.len() != PAGE_SIZE {
                    log::error!("Page commit after {} bytes", page.data.len());
                    return Err(Error::BusError);
                }
                if page.addr + PAGE_SIZE > self.data.len() {
                    return Err(Error::AddressOutOfBounds);
                }
                // Flash programming: can only change 1 -> 0
                for (dst, src) in self.data[page.addr..].iter_mut().zip(&page.data) {
                    *dst &= src;
                }
                self.counters.page_programs += 1;
                Ok(())
            }
            _ => Err(Error::BusError),
        }
    }

    fn passthrough(&mut self, cmd: &[u8; COMMAND_LEN], resp: &mut [u8]) -> Result<()> {
        if self.page.is_some() {
            return self.stream(cmd);
        }

        let addr = (cmd[3] as usize) << 16 | (cmd[4] as usize) << 8 | cmd[5] as usize;
        match cmd[2] {
            opcodes::WREN => {
                self.write_enabled = true;
                resp.fill(0);
            }
            opcodes::WRDI => {
                self.write_enabled = false;
                self.probing = false;
                resp.fill(if self.config.legacy { 0xFF } else { 0x00 });
            }
            opcodes::SE_20 => self.erase(addr)?,
            opcodes::PP => {
                if !self.write_enabled {
                    log::warn!("Page program at 0x{:06X} without write enable ignored", addr);
                    return Ok(());
                }
                if addr % PAGE_SIZE != 0 {
                    return Err(Error::BusError);
                }
                self.page = Some(OpenPage {
                    addr,
                    data: vec![cmd[6], cmd[7]],
                });
                self.write_enabled = false;
            }
            opcodes::DOR => self.read(addr, resp)?,
            opcodes::PROBE_1F => self.vendor_read(addr, resp),
            other => {
                log::error!("Unknown NOR opcode 0x{:02X}", other);
                return Err(Error::BusError);
            }
        }
        Ok(())
    }
}

impl CartBus for EmulatedR4iSdhc {
    fn send(&mut self, cmd: &[u8; COMMAND_LEN], resp: &mut [u8], _settle: u32) -> Result<()> {
        if self.fail_after.is_some_and(|n| self.counters.commands >= n) {
            return Err(Error::BusError);
        }
        self.counters.commands += 1;

        if self.locked {
            if cmd[0] == opcodes::VENDOR_68 {
                log::debug!("Emulated R4iSDHC unlocked");
                self.locked = false;
                self.probing = true;
            }
            resp.fill(0xFF);
            return Ok(());
        }

        match cmd[0] {
            opcodes::NOR_PASSTHROUGH => self.passthrough(cmd, resp),
            opcodes::VENDOR_68 => {
                // Vendor select: the index the loader uses into its buffer.
                // It also restarts the probe window on an unlocked cart.
                self.probing = true;
                resp.fill(0);
                Ok(())
            }
            other => {
                log::error!("Unknown cart command 0x{:02X}", other);
                Err(Error::BusError)
            }
        }
    }

    fn delay(&mut self, cycles: u32) {
        self.counters.delay_cycles += cycles as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartflash_core::cart::{
        CartVariant, DetectState, Flashcart, ProbeOutcome, ProbeStage, R4iSdhc,
    };
    use cartflash_core::inject::{KEY_LEN, MAP_TABLE};
    use cartflash_core::progress::NoProgress;
    use cartflash_core::error::VerifyStage;

    fn key() -> Vec<u8> {
        (0..KEY_LEN).map(|i| (i as u8).wrapping_mul(13)).collect()
    }

    #[test]
    fn test_detect_current_cart() {
        let mut emu = EmulatedR4iSdhc::new_default();
        let mut cart = R4iSdhc::new(&mut emu);

        cart.initialize().unwrap();

        assert_eq!(cart.state(), DetectState::Classified(ProbeOutcome::TypeB));
        assert_eq!(cart.variant(), CartVariant::Current);
    }

    #[test]
    fn test_detect_legacy_cart() {
        let mut emu = EmulatedR4iSdhc::new(R4iSdhcConfig {
            legacy: true,
            ..Default::default()
        });
        let mut cart = R4iSdhc::new(&mut emu);

        cart.initialize().unwrap();

        assert_eq!(cart.variant(), CartVariant::Legacy);
    }

    #[test]
    fn test_wrong_marker_unsupported() {
        let mut emu = EmulatedR4iSdhc::new(R4iSdhcConfig {
            marker: 0x00,
            ..Default::default()
        });
        let mut cart = R4iSdhc::new(&mut emu);

        assert_eq!(cart.initialize(), Err(Error::UnsupportedDevice));
        assert_eq!(
            cart.state(),
            DetectState::Classified(ProbeOutcome::Unsupported(ProbeStage::Marker))
        );
        let mut buf = [0u8; 4];
        assert_eq!(
            cart.read_flash(0, &mut buf, &mut NoProgress),
            Err(Error::NotInitialized)
        );
    }

    #[test]
    fn test_vendor_mismatch_unsupported() {
        let mut emu = EmulatedR4iSdhc::new(R4iSdhcConfig {
            vendor_window: [0, 0x2F, 0, 0, 0, 0, 0, 0],
            ..Default::default()
        });
        let mut cart = R4iSdhc::new(&mut emu);

        assert_eq!(cart.initialize(), Err(Error::UnsupportedDevice));
        assert_eq!(emu.counters().vendor_reads, 9);
    }

    #[test]
    fn test_already_unlocked_not_detected() {
        let mut emu = EmulatedR4iSdhc::new_default();
        R4iSdhc::new(&mut emu).initialize().unwrap();

        assert_eq!(R4iSdhc::new(&mut emu).initialize(), Err(Error::NotDetected));

        emu.power_cycle();
        assert!(R4iSdhc::new(&mut emu).initialize().is_ok());
    }

    #[test]
    fn test_legacy_cart_redetects_after_unlock() {
        let mut emu = EmulatedR4iSdhc::new(R4iSdhcConfig {
            legacy: true,
            ..Default::default()
        });
        R4iSdhc::new(&mut emu).initialize().unwrap();

        // A legacy cart keeps answering all-ones, so it looks locked again
        let mut cart = R4iSdhc::new(&mut emu);
        cart.initialize().unwrap();
        assert_eq!(cart.state(), DetectState::Classified(ProbeOutcome::TypeB));
        assert_eq!(cart.variant(), CartVariant::Legacy);
    }

    #[test]
    fn test_bus_failure_during_detection_resets_state() {
        let mut emu = EmulatedR4iSdhc::new_default();
        emu.fail_after(2);
        let mut cart = R4iSdhc::new(&mut emu);

        assert_eq!(cart.initialize(), Err(Error::BusError));
        assert_eq!(cart.state(), DetectState::Locked);
    }

    #[test]
    fn test_inject_end_to_end() {
        let mut emu = EmulatedR4iSdhc::new_default();
        let key = key();
        let firm: Vec<u8> = (0..0x3000u32).map(|i| (i % 251) as u8).collect();

        let mut cart = R4iSdhc::new(&mut emu);
        cart.initialize().unwrap();
        cart.inject_boot(&key, &firm, &mut NoProgress).unwrap();

        let mem = emu.data();
        assert_eq!(&mem[0x40..0x140], &MAP_TABLE[..]);
        assert_eq!(&mem[0x1000..0x1048], &key[..0x48]);
        assert_eq!(&mem[0x1F2000..0x1F3000], &key[0x48..]);
        assert_eq!(&mem[0x7E00..0xAE00], &firm[..]);
        assert_eq!(&mem[0x1F7E00..0x1F8000], &firm[..0x200]);
    }

    #[test]
    fn test_reinject_skips_erases() {
        let mut emu = EmulatedR4iSdhc::new_default();
        let key = key();
        let firm = vec![0x5Au8; 0x2000];

        let mut cart = R4iSdhc::new(&mut emu);
        cart.initialize().unwrap();
        cart.inject_boot(&key, &firm, &mut NoProgress).unwrap();
        let first = emu.counters().erases;

        emu.power_cycle();
        let mut cart = R4iSdhc::new(&mut emu);
        cart.initialize().unwrap();
        cart.inject_boot(&key, &firm, &mut NoProgress).unwrap();

        assert!(first > 0);
        assert_eq!(emu.counters().erases, first);
    }

    #[test]
    fn test_slow_erase_is_waited_for() {
        let mut emu = EmulatedR4iSdhc::new(R4iSdhcConfig {
            erase_busy_checks: 3,
            ..Default::default()
        });
        let mut cart = R4iSdhc::new(&mut emu);
        cart.initialize().unwrap();

        cart.write_flash(0x10000, &[0u8; 16], &mut NoProgress).unwrap();

        assert_eq!(&emu.data()[0x10000..0x10010], &[0u8; 16]);
        assert_eq!(emu.counters().erases, 1);
    }

    #[test]
    fn test_stuck_erase() {
        let mut emu = EmulatedR4iSdhc::new(R4iSdhcConfig {
            erase_busy_checks: u32::MAX,
            ..Default::default()
        });
        let mut cart = R4iSdhc::new(&mut emu);
        cart.initialize().unwrap();

        assert_eq!(
            cart.write_flash(0x10000, &[0u8; 16], &mut NoProgress),
            Err(Error::EraseVerifyFailure { addr: 0x10000 })
        );
    }

    #[test]
    fn test_stale_tail_read() {
        let mut emu = EmulatedR4iSdhc::new_default();
        emu.inject_stale_read(0x2000C);
        let mut cart = R4iSdhc::new(&mut emu);
        cart.initialize().unwrap();

        assert_eq!(
            cart.write_flash(0x20000, &[0x11; 16], &mut NoProgress),
            Err(Error::WriteVerifyFailure {
                addr: 0x2000C,
                stage: VerifyStage::End
            })
        );
    }

    #[test]
    fn test_bus_failure_propagates() {
        let mut emu = EmulatedR4iSdhc::new_default();
        let mut cart = R4iSdhc::new(&mut emu);
        cart.initialize().unwrap();
        cart.bus_mut().fail_after(0);

        let mut buf = [0u8; 8];
        assert_eq!(
            cart.read_flash(0, &mut buf, &mut NoProgress),
            Err(Error::BusError)
        );
    }

    #[test]
    fn test_read_flash() {
        let mut data = vec![0xFF; 0x200000];
        data[0x100..0x106].copy_from_slice(b"cartfl");
        let mut emu = EmulatedR4iSdhc::with_data(R4iSdhcConfig::default(), data);
        let mut cart = R4iSdhc::new(&mut emu);
        cart.initialize().unwrap();

        let mut buf = [0u8; 6];
        cart.read_flash(0x100, &mut buf, &mut NoProgress).unwrap();

        assert_eq!(&buf, b"cartfl");
    }
}
