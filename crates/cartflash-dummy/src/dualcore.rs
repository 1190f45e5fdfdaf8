//! Emulated R4 SDHC Dual-Core cart
//!
//! Queues one erase or byte program per `D4` command and performs it on the
//! following `C0`. Reads use the `B7` command.

use cartflash_core::bus::{CartBus, COMMAND_LEN};
use cartflash_core::cmd::opcodes;
use cartflash_core::error::{Error, Result};

use crate::Counters;

const BLOCK_SIZE: usize = 0x10000;

/// Configuration for the emulated Dual-Core cart
#[derive(Debug, Clone)]
pub struct DualCoreConfig {
    /// Flash size in bytes
    pub size: usize,
    /// Raw answer to the cart version command
    pub version: [u8; 4],
    /// Raw answer to the chip id command
    pub chip_id: [u8; 4],
}

impl Default for DualCoreConfig {
    fn default() -> Self {
        Self {
            size: 0x200000,
            version: [0x01, 0x05, 0x00, 0x00],
            chip_id: [0xC2, 0x20, 0x00, 0x00],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Queued {
    Erase(usize),
    Write(usize, u8),
}

/// Emulated R4 SDHC Dual-Core cart
pub struct EmulatedDualCore {
    config: DualCoreConfig,
    data: Vec<u8>,
    queued: Option<Queued>,
    unlock_step: u8,
    fail_after: Option<usize>,
    counters: Counters,
}

impl EmulatedDualCore {
    /// Create a cart with blank flash
    pub fn new(config: DualCoreConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self::with_data(config, data)
    }

    /// Create a cart with default configuration
    pub fn new_default() -> Self {
        Self::new(DualCoreConfig::default())
    }

    /// Create a cart from an existing flash image
    pub fn with_data(config: DualCoreConfig, mut data: Vec<u8>) -> Self {
        data.resize(config.size, 0xFF);
        Self {
            config,
            data,
            queued: None,
            unlock_step: 0,
            fail_after: None,
            counters: Counters::default(),
        }
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the flash data
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Operation counters
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Whether the full D0 unlock sequence has been seen
    pub fn is_unlocked(&self) -> bool {
        self.unlock_step == 3
    }

    /// Fail every command after the first `n` with a bus error
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    fn apply(&mut self) -> Result<()> {
        match self.queued.take() {
            Some(Queued::Erase(addr)) => {
                let start = addr & !(BLOCK_SIZE - 1);
                if start + BLOCK_SIZE > self.data.len() {
                    return Err(Error::AddressOutOfBounds);
                }
                self.data[start..start + BLOCK_SIZE].fill(0xFF);
                self.counters.erases += 1;
            }
            Some(Queued::Write(addr, value)) => {
                let byte = self.data.get_mut(addr).ok_or(Error::AddressOutOfBounds)?;
                *byte &= value;
                self.counters.byte_writes += 1;
            }
            None => log::warn!("Apply without a queued operation"),
        }
        Ok(())
    }

    fn unlock(&mut self, cmd: &[u8; COMMAND_LEN]) {
        self.unlock_step = match (self.unlock_step, *cmd) {
            (0, opcodes::UNLOCK_D0AA) => 1,
            (1, opcodes::UNLOCK_D0) => 2,
            (2, opcodes::UNLOCK_D0AA) => 3,
            (3, _) => 3,
            (_, opcodes::UNLOCK_D0AA) => 1,
            _ => 0,
        };
    }
}

impl CartBus for EmulatedDualCore {
    fn send(&mut self, cmd: &[u8; COMMAND_LEN], resp: &mut [u8], _settle: u32) -> Result<()> {
        if self.fail_after.is_some_and(|n| self.counters.commands >= n) {
            return Err(Error::BusError);
        }
        self.counters.commands += 1;
        resp.fill(0);

        let addr = (cmd[1] as usize) << 16 | (cmd[2] as usize) << 8 | cmd[3] as usize;
        match cmd[0] {
            0xD4 => match cmd[5] {
                0x01 => self.queued = Some(Queued::Erase(addr)),
                0x03 => self.queued = Some(Queued::Write(addr, cmd[4])),
                other => {
                    log::error!("Unknown D4 operation 0x{:02X}", other);
                    return Err(Error::BusError);
                }
            },
            0xC0 => self.apply()?,
            0xB7 => {
                let addr = u32::from_be_bytes([cmd[1], cmd[2], cmd[3], cmd[4]]) as usize;
                let end = addr + resp.len();
                if end > self.data.len() {
                    return Err(Error::AddressOutOfBounds);
                }
                resp.copy_from_slice(&self.data[addr..end]);
                self.counters.reads += 1;
            }
            0xC5 => resp.copy_from_slice(&self.config.version[..resp.len()]),
            0xB8 => resp.copy_from_slice(&self.config.chip_id[..resp.len()]),
            0xD0 => self.unlock(cmd),
            other => {
                log::error!("Unknown cart command 0x{:02X}", other);
                return Err(Error::BusError);
            }
        }
        Ok(())
    }

    fn delay(&mut self, cycles: u32) {
        self.counters.delay_cycles += cycles as u64;
    }
}
