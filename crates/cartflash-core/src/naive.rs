//! Byte-at-a-time programming for carts without page buffering
//!
//! The R4 SDHC Dual-Core controller takes one queued operation (erase a
//! 64 KiB block, or program one byte) and performs it on an apply command.
//! There is no write enable and no status; the command latency is the only
//! settle time.

use crate::bus::{self, CartBus};
use crate::cmd::{erase_block_cmd, opcodes, read_word_cmd, write_byte_cmd};
use crate::error::Result;
use crate::nor::{SettlePolicy, READ_PROGRESS_STRIDE};
use crate::progress::Progress;

/// Erase granularity of the byte-programming family
pub const BLOCK_SIZE: u32 = 0x10000;

fn apply<B: CartBus + ?Sized>(bus: &mut B, policy: &SettlePolicy) -> Result<()> {
    bus::send_only(bus, &opcodes::APPLY, policy.command_latency)
}

/// Erase the 64 KiB block containing `addr`
pub fn erase_block<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
) -> Result<()> {
    log::debug!("erase(0x{:08X})", addr);
    bus::send_only(bus, &erase_block_cmd(addr).bytes(), policy.command_latency)?;
    apply(bus, policy)
}

/// Program a single byte
pub fn write_byte<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
    value: u8,
) -> Result<()> {
    log::trace!("write(0x{:08X}) = 0x{:02X}", addr, value);
    bus::send_only(bus, &write_byte_cmd(addr, value).bytes(), policy.command_latency)?;
    apply(bus, policy)
}

/// Write `data` at `addr`
///
/// Erases every 64 KiB block that `[addr, addr + data.len())` touches, then
/// programs the bytes in address order. Anything else in the erased blocks
/// is lost; callers that need to keep it read the blocks first.
pub fn write<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
    data: &[u8],
    progress: &mut dyn Progress,
    label: &str,
) -> Result<()> {
    log::info!("writeFlash(addr=0x{:08X}, size=0x{:X})", addr, data.len());
    let len = data.len() as u32;

    if len > 0 {
        let first = addr & !(BLOCK_SIZE - 1);
        let last = (addr + len - 1) & !(BLOCK_SIZE - 1);
        for block in (first..=last).step_by(BLOCK_SIZE as usize) {
            erase_block(bus, policy, block)?;
        }
    }

    for (i, &value) in data.iter().enumerate() {
        write_byte(bus, policy, addr + i as u32, value)?;
        progress.report(i as u32, len, label);
    }
    if !data.is_empty() {
        progress.report(len, len, label);
    }
    Ok(())
}

/// Read the 4 bytes at `addr`
pub fn read_word<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
) -> Result<[u8; 4]> {
    let word = bus::send_read(bus, &read_word_cmd(addr).bytes(), policy.command_latency)?;
    log::trace!("B7 read at {:X} returned {:X}", addr, bus::word_le(word));
    Ok(word)
}

/// Read `buf.len()` bytes starting at `addr`
pub fn read<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
    buf: &mut [u8],
    mut progress: Option<&mut dyn Progress>,
) -> Result<()> {
    let total = buf.len() as u32;
    for (i, chunk) in buf.chunks_mut(4).enumerate() {
        let offset = (i * 4) as u32;
        let word = read_word(bus, policy, addr + offset)?;
        chunk.copy_from_slice(&word[..chunk.len()]);

        if let Some(p) = progress.as_deref_mut() {
            if (offset + 4) % READ_PROGRESS_STRIDE == 0 {
                p.report(offset + 4, total, "Reading flash");
            }
        }
    }
    if let Some(p) = progress {
        p.report(total, total, "Reading flash");
    }
    Ok(())
}

/// Run the D0 unlock sequence
pub fn unlock<B: CartBus + ?Sized>(bus: &mut B, policy: &SettlePolicy) -> Result<()> {
    let first = bus::send_read(bus, &opcodes::UNLOCK_D0AA, policy.command_latency)?;
    log::debug!("D0AA {:X}", bus::word_le(first));
    bus::send_only(bus, &opcodes::UNLOCK_D0, policy.command_latency)?;
    let second = bus::send_read(bus, &opcodes::UNLOCK_D0AA, policy.command_latency)?;
    log::debug!("D0AA {:X}", bus::word_le(second));
    Ok(())
}

/// Swap the two low bytes of a response word
fn low_half_swapped(word: u32) -> u16 {
    (((word << 8) & 0xFF00) | ((word >> 8) & 0xFF)) as u16
}

/// Read the cart version (`C5`)
pub fn cart_version<B: CartBus + ?Sized>(bus: &mut B, policy: &SettlePolicy) -> Result<u16> {
    let raw = bus::word_le(bus::send_read(bus, &opcodes::CART_VERSION, policy.command_latency)?);
    let version = low_half_swapped(raw);
    log::debug!("C5 {:X}({:X})", version, raw);
    Ok(version)
}

/// Read the chip id (`B8`)
pub fn chip_id<B: CartBus + ?Sized>(bus: &mut B, policy: &SettlePolicy) -> Result<u16> {
    let raw = bus::word_le(bus::send_read(bus, &opcodes::READ_CHIP_ID, policy.command_latency)?);
    let id = low_half_swapped(raw);
    log::debug!("B8 {:X}({:X})", id, raw);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::testing::MockByteCart;
    use std::vec::Vec;

    const POLICY: SettlePolicy = SettlePolicy::BYTE_PROGRAM;

    struct Counter(Vec<(u32, u32)>);

    impl Progress for Counter {
        fn report(&mut self, done: u32, total: u32, _label: &str) {
            self.0.push((done, total));
        }
    }

    #[test]
    fn test_erases_precede_writes() {
        let mut cart = MockByteCart::new(0x200000);
        let data = [0x10u8, 0x20, 0x30];

        write(&mut cart, &POLICY, 0x10000, &data, &mut NoProgress, "test").unwrap();

        let sent = cart.commands();
        assert_eq!(sent[0], erase_block_cmd(0x10000).bytes());
        assert_eq!(sent[1], opcodes::APPLY);
        for (i, &value) in data.iter().enumerate() {
            assert_eq!(sent[2 + 2 * i], write_byte_cmd(0x10000 + i as u32, value).bytes());
            assert_eq!(sent[3 + 2 * i], opcodes::APPLY);
        }
        assert_eq!(&cart.memory()[0x10000..0x10003], &data);
    }

    #[test]
    fn test_one_erase_per_block_step() {
        let mut cart = MockByteCart::new(0x200000);
        let data = std::vec![0u8; 0x10001];

        write(&mut cart, &POLICY, 0x20000, &data, &mut NoProgress, "test").unwrap();

        assert_eq!(cart.erased_blocks(), std::vec![0x20000, 0x30000]);
        assert_eq!(cart.byte_writes(), 0x10001);
    }

    #[test]
    fn test_unaligned_write_erases_every_touched_block() {
        let mut cart = MockByteCart::new(0x200000);
        cart.fill(0x20000, &[0x0F; 16]);

        write(&mut cart, &POLICY, 0x1FFF8, &[0xF0; 16], &mut NoProgress, "test").unwrap();

        assert_eq!(cart.erased_blocks(), std::vec![0x10000, 0x20000]);
        assert_eq!(&cart.memory()[0x1FFF8..0x20008], &[0xF0; 16]);
    }

    #[test]
    fn test_write_erases_rest_of_block() {
        let mut cart = MockByteCart::new(0x200000);
        cart.fill(0x10000, &[0x00; 0x100]);

        write(&mut cart, &POLICY, 0x10000, &[0x55], &mut NoProgress, "test").unwrap();

        assert_eq!(cart.memory()[0x10000], 0x55);
        assert_eq!(cart.memory()[0x10001], 0xFF);
    }

    #[test]
    fn test_progress_per_byte() {
        let mut cart = MockByteCart::new(0x200000);
        let mut progress = Counter(Vec::new());

        write(&mut cart, &POLICY, 0, &[1, 2, 3, 4], &mut progress, "test").unwrap();

        assert_eq!(progress.0, [(0, 4), (1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn test_read_back() {
        let mut cart = MockByteCart::new(0x200000);
        cart.fill(0x1BE00, &[1, 2, 3, 4, 5, 6]);

        let mut buf = [0u8; 6];
        read(&mut cart, &POLICY, 0x1BE00, &mut buf, None).unwrap();

        assert_eq!(buf, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_read_progress_cadence() {
        let mut cart = MockByteCart::new(0x200000);
        let mut buf = std::vec![0u8; 0x8002];
        let mut progress = Counter(Vec::new());

        read(&mut cart, &POLICY, 0, &mut buf, Some(&mut progress)).unwrap();

        assert_eq!(
            progress.0,
            [(0x4000, 0x8002), (0x8000, 0x8002), (0x8002, 0x8002)]
        );
    }

    #[test]
    fn test_unlock_and_ids() {
        let mut cart = MockByteCart::new(0x200000);

        unlock(&mut cart, &POLICY).unwrap();
        assert_eq!(
            cart.commands(),
            [opcodes::UNLOCK_D0AA, opcodes::UNLOCK_D0, opcodes::UNLOCK_D0AA]
        );

        // The mock answers C5 with 34 12 00 00
        assert_eq!(cart_version(&mut cart, &POLICY).unwrap(), 0x3412);
        assert_eq!(low_half_swapped(0xAABB_1234), 0x3412);
    }
}
