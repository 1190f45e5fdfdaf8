//! Lean NOR emulator used by the unit tests
//!
//! Decodes passthrough commands only. The full cart emulators with
//! detection and the byte-programming family live in `cartflash-dummy`.

use std::vec;
use std::vec::Vec;

use crate::bus::{CartBus, COMMAND_LEN};
use crate::cmd::opcodes;
use crate::error::{Error, Result};
use crate::nor::{PAGE_SIZE, SECTOR_SIZE};

/// In-progress page program
struct OpenPage {
    addr: usize,
    data: Vec<u8>,
}

pub(crate) struct MockNor {
    data: Vec<u8>,
    write_enabled: bool,
    page: Option<OpenPage>,
    erases: Vec<u32>,
    page_programs: usize,
    commands: usize,
    last_command: [u8; COMMAND_LEN],
    erase_busy_checks: u32,
    busy_remaining: u32,
    busy_sector: Option<usize>,
    corrupt_addr: Option<usize>,
}

impl MockNor {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            data: vec![0xFF; size],
            write_enabled: false,
            page: None,
            erases: Vec::new(),
            page_programs: 0,
            commands: 0,
            last_command: [0; COMMAND_LEN],
            erase_busy_checks: 0,
            busy_remaining: 0,
            busy_sector: None,
            corrupt_addr: None,
        }
    }

    pub(crate) fn memory(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn fill(&mut self, addr: usize, bytes: &[u8]) {
        self.data[addr..addr + bytes.len()].copy_from_slice(bytes);
    }

    pub(crate) fn erases(&self) -> Vec<u32> {
        self.erases.clone()
    }

    pub(crate) fn erase_count(&self) -> usize {
        self.erases.len()
    }

    pub(crate) fn page_program_count(&self) -> usize {
        self.page_programs
    }

    /// Make the first `n` reads of a freshly erased sector start look busy
    pub(crate) fn set_erase_busy_checks(&mut self, n: u32) {
        self.erase_busy_checks = n;
    }

    /// Reads of the word at `addr` return the complement of its content
    pub(crate) fn corrupt_reads_at(&mut self, addr: usize) {
        self.corrupt_addr = Some(addr);
    }

    pub(crate) fn command_count(&self) -> usize {
        self.commands
    }

    pub(crate) fn last_command(&self) -> [u8; COMMAND_LEN] {
        self.last_command
    }

    fn read(&mut self, addr: usize, resp: &mut [u8]) -> Result<()> {
        if addr + resp.len() > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }
        resp.copy_from_slice(&self.data[addr..addr + resp.len()]);

        if self.busy_sector == Some(addr) && self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            resp.fill(0x00);
        }
        if self.corrupt_addr == Some(addr) {
            resp.iter_mut().for_each(|b| *b = !*b);
        }
        Ok(())
    }

    fn stream(&mut self, cmd: &[u8; COMMAND_LEN]) -> Result<()> {
        match cmd[1] {
            0x00 => {
                let page = self.page.as_mut().ok_or(Error::BusError)?;
                page.data.extend_from_slice(&cmd[2..4]);
            }
            opcodes::LATCH_COMMIT => {
                let page = self.page.take().ok_or(Error::BusError)?;
                if page.data.len() != PAGE_SIZE as usize {
                    return Err(Error::BusError);
                }
                // Programming only clears bits
                for (dst, src) in self.data[page.addr..].iter_mut().zip(&page.data) {
                    *dst &= src;
                }
                self.page_programs += 1;
            }
            _ => return Err(Error::BusError),
        }
        Ok(())
    }
}

impl CartBus for MockNor {
    fn send(&mut self, cmd: &[u8; COMMAND_LEN], resp: &mut [u8], _settle: u32) -> Result<()> {
        self.commands += 1;
        self.last_command = *cmd;

        if cmd[0] != opcodes::NOR_PASSTHROUGH {
            return Err(Error::BusError);
        }
        if self.page.is_some() {
            return self.stream(cmd);
        }

        let addr = (cmd[3] as usize) << 16 | (cmd[4] as usize) << 8 | cmd[5] as usize;
        match cmd[2] {
            opcodes::WREN => self.write_enabled = true,
            opcodes::WRDI => self.write_enabled = false,
            opcodes::SE_20 => {
                if !self.write_enabled {
                    return Err(Error::BusError);
                }
                let start = addr & !(SECTOR_SIZE as usize - 1);
                self.data[start..start + SECTOR_SIZE as usize].fill(0xFF);
                self.erases.push(start as u32);
                self.busy_sector = Some(start);
                self.busy_remaining = self.erase_busy_checks;
                self.write_enabled = false;
            }
            opcodes::PP => {
                if !self.write_enabled {
                    return Err(Error::BusError);
                }
                self.page = Some(OpenPage {
                    addr,
                    data: vec![cmd[6], cmd[7]],
                });
                self.write_enabled = false;
            }
            opcodes::DOR => self.read(addr, resp)?,
            _ => return Err(Error::BusError),
        }
        Ok(())
    }

    fn delay(&mut self, _cycles: u32) {}
}

/// Operation queued by a `D4` command until the next apply
#[derive(Clone, Copy)]
enum Queued {
    Erase(usize),
    Write(usize, u8),
}

/// Byte-programming cart that records every command
pub(crate) struct MockByteCart {
    data: Vec<u8>,
    queued: Option<Queued>,
    commands: Vec<[u8; COMMAND_LEN]>,
    erased_blocks: Vec<u32>,
    byte_writes: usize,
}

impl MockByteCart {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            data: vec![0xFF; size],
            queued: None,
            commands: Vec::new(),
            erased_blocks: Vec::new(),
            byte_writes: 0,
        }
    }

    pub(crate) fn memory(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn fill(&mut self, addr: usize, bytes: &[u8]) {
        self.data[addr..addr + bytes.len()].copy_from_slice(bytes);
    }

    pub(crate) fn commands(&self) -> Vec<[u8; COMMAND_LEN]> {
        self.commands.clone()
    }

    pub(crate) fn erased_blocks(&self) -> Vec<u32> {
        self.erased_blocks.clone()
    }

    pub(crate) fn byte_writes(&self) -> usize {
        self.byte_writes
    }
}

impl CartBus for MockByteCart {
    fn send(&mut self, cmd: &[u8; COMMAND_LEN], resp: &mut [u8], _settle: u32) -> Result<()> {
        self.commands.push(*cmd);
        resp.fill(0);

        let addr24 = (cmd[1] as usize) << 16 | (cmd[2] as usize) << 8 | cmd[3] as usize;
        match cmd[0] {
            0xD4 if cmd[5] == 0x01 => self.queued = Some(Queued::Erase(addr24 & !0xFFFF)),
            0xD4 if cmd[5] == 0x03 => self.queued = Some(Queued::Write(addr24, cmd[4])),
            0xC0 => match self.queued.take() {
                Some(Queued::Erase(start)) => {
                    self.data[start..start + 0x10000].fill(0xFF);
                    self.erased_blocks.push(start as u32);
                }
                Some(Queued::Write(addr, value)) => {
                    self.data[addr] &= value;
                    self.byte_writes += 1;
                }
                None => return Err(Error::BusError),
            },
            0xB7 => {
                let addr = u32::from_be_bytes([cmd[1], cmd[2], cmd[3], cmd[4]]) as usize;
                resp.copy_from_slice(&self.data[addr..addr + resp.len()]);
            }
            0xC5 => resp.copy_from_slice(&[0x34, 0x12, 0x00, 0x00][..resp.len()]),
            0xB8 | 0xD0 => {}
            _ => return Err(Error::BusError),
        }
        Ok(())
    }

    fn delay(&mut self, _cycles: u32) {}
}
