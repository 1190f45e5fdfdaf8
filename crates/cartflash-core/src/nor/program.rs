//! Sector-based NOR programming
//!
//! The cart exposes no status register, so every step is followed by a
//! fixed settle delay and the result is checked by reading back.

use crate::bus::{self, CartBus};
use crate::cmd::{nor_cmd, nor_raw, opcodes};
use crate::error::{Error, Result, VerifyStage};
use crate::progress::Progress;

use super::read::{read_range, read_word};
use super::{SettlePolicy, PAGE_SIZE, SECTOR_SIZE};

/// Value of a word in an erased sector
const ERASED_WORD: u32 = 0xFFFF_FFFF;

/// Set the write enable latch
pub fn write_enable<B: CartBus + ?Sized>(bus: &mut B, policy: &SettlePolicy) -> Result<()> {
    let cmd = nor_cmd(0, 1, opcodes::WREN, 0, 0, 0);
    bus::send_read(bus, &cmd.bytes(), policy.command_latency)?;
    bus.delay(policy.write_enable_delay);
    Ok(())
}

/// Erase the 4 KiB sector containing `addr`
///
/// Returns after the erase delay; the caller must still check that the
/// sector reads back erased.
pub fn erase_sector<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
) -> Result<()> {
    write_enable(bus, policy)?;
    let cmd = nor_cmd(0, 4, opcodes::SE_20, addr, 0, 0);
    bus::send_read(bus, &cmd.bytes(), policy.command_latency)?;
    bus.delay(policy.erase_delay);
    Ok(())
}

/// Check that the first and last word of the sector at `addr` are erased
fn sector_looks_erased<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
) -> Result<bool> {
    // The end is only read when the start already looks erased
    Ok(bus::word_le(read_word(bus, policy, addr)?) == ERASED_WORD
        && bus::word_le(read_word(bus, policy, addr + SECTOR_SIZE - 4)?) == ERASED_WORD)
}

/// Wait until the sector at `addr` reads back erased
///
/// Checks at most `max_erase_retries` times with an erase delay between
/// failed checks. `done`/`total` are the enclosing write's progress.
fn wait_erased<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
    progress: &mut dyn Progress,
    (done, total): (u32, u32),
) -> Result<()> {
    for attempt in 1..=policy.max_erase_retries {
        if sector_looks_erased(bus, policy, addr)? {
            return Ok(());
        }
        progress.report(done, total, "Waiting for NOR erase to finish");
        log::warn!(
            "Sector 0x{:06X}: start or end isn't FF (check {}/{})",
            addr,
            attempt,
            policy.max_erase_retries
        );
        bus.delay(policy.erase_delay);
    }

    log::error!("NOR erase sanity check failed at 0x{:06X}", addr);
    Err(Error::EraseVerifyFailure { addr })
}

/// Program one 256-byte page at `addr`
///
/// The page must lie in an erased sector. The first two bytes travel with
/// the page program opcode, the rest are streamed two at a time, and a final
/// raw command carrying the commit latch closes the page.
pub fn program_page<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
    page: &[u8; PAGE_SIZE as usize],
) -> Result<()> {
    write_enable(bus, policy)?;

    let cmd = nor_cmd(0, 6, opcodes::PP, addr, page[0], page[1]);
    bus::send_read(bus, &cmd.bytes(), policy.command_latency)?;
    for pair in page[2..].chunks_exact(2) {
        let cmd = nor_raw(pair[0], pair[1], 0);
        bus::send_read(bus, &cmd.bytes(), policy.command_latency)?;
    }
    let cmd = nor_raw(page[0], page[1], opcodes::LATCH_COMMIT);
    bus::send_read(bus, &cmd.bytes(), policy.command_latency)?;

    bus.delay(policy.page_delay);
    Ok(())
}

/// Program a full sector buffer at the sector-aligned `addr`
fn program_sector<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
    sector: &[u8; SECTOR_SIZE as usize],
) -> Result<()> {
    let mut page = [0u8; PAGE_SIZE as usize];
    for offset in (0..SECTOR_SIZE).step_by(PAGE_SIZE as usize) {
        let start = offset as usize;
        page.copy_from_slice(&sector[start..start + PAGE_SIZE as usize]);
        program_page(bus, policy, addr + offset, &page)?;
    }
    Ok(())
}

/// Compare the word at `addr` with `expected`
fn verify_word<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
    expected: &[u8],
    stage: VerifyStage,
) -> Result<()> {
    let word = read_word(bus, policy, addr)?;
    if word[..expected.len()] != *expected {
        log::error!("NOR write {} mismatch at 0x{:06X} after write", stage, addr);
        return Err(Error::WriteVerifyFailure { addr, stage });
    }
    Ok(())
}

/// Write `data` to flash at `dest`
///
/// Works sector by sector with read-modify-write:
///
/// 1. Read the whole sector
/// 2. Skip it if the covered bytes already hold the desired data
/// 3. Otherwise erase it, wait until it reads back erased, merge the new
///    bytes into the sector buffer and program it page by page
///
/// Once every sector is done the first and last 4 bytes of the range are
/// read back. Sectors already programmed stay programmed when a later step
/// fails.
pub fn write<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    dest: u32,
    data: &[u8],
    progress: &mut dyn Progress,
    label: &str,
) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }

    let len = data.len() as u32;
    let real_start = dest & !(SECTOR_SIZE - 1);
    let first_offset = dest - real_start;
    let real_len = (first_offset + len + SECTOR_SIZE - 1) & !(SECTOR_SIZE - 1);
    let mut sector = [0u8; SECTOR_SIZE as usize];

    progress.report(0, real_len, label);

    let mut cur = 0;
    while cur < real_len {
        let cur_addr = real_start + cur;
        let buf_ofs = dest.saturating_sub(cur_addr);
        let src_ofs = cur.saturating_sub(first_offset);
        let n = (SECTOR_SIZE - buf_ofs).min(len - src_ofs);

        let wanted = &data[src_ofs as usize..(src_ofs + n) as usize];
        let window = buf_ofs as usize..(buf_ofs + n) as usize;

        read_range(bus, policy, cur_addr, &mut sector, None).map_err(|e| {
            log::error!("Failed to read sector 0x{:06X}: {}", cur_addr, e);
            Error::ReadFailure { addr: cur_addr }
        })?;

        if sector[window.clone()] == *wanted {
            log::debug!("Sector 0x{:06X} already up to date", cur_addr);
        } else {
            log::debug!("Rewriting sector 0x{:06X}", cur_addr);
            erase_sector(bus, policy, cur_addr)?;
            if let Err(e) = wait_erased(bus, policy, cur_addr, progress, (cur, real_len)) {
                progress.report(0, 1, "NOR erase sanity check failed");
                return Err(e);
            }
            sector[window].copy_from_slice(wanted);
            program_sector(bus, policy, cur_addr, &sector)?;
        }

        cur += SECTOR_SIZE;
        progress.report(cur, real_len, label);
    }

    let head = &data[..data.len().min(4)];
    if let Err(e) = verify_word(bus, policy, dest, head, VerifyStage::Start) {
        progress.report(0, 1, "NOR write start verification failed");
        return Err(e);
    }

    if data.len() > 4 {
        let tail_addr = dest + len - 4;
        let tail = &data[data.len() - 4..];
        if let Err(e) = verify_word(bus, policy, tail_addr, tail, VerifyStage::End) {
            progress.report(0, 1, "NOR write end verification failed");
            return Err(e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::testing::MockNor;
    use std::vec;

    const POLICY: SettlePolicy = SettlePolicy::R4ISDHC;

    #[test]
    fn test_write_blank_flash() {
        let mut nor = MockNor::new(0x10000);
        let data: std::vec::Vec<u8> = (0..0x300u32).map(|i| i as u8).collect();

        write(&mut nor, &POLICY, 0x1100, &data, &mut NoProgress, "test").unwrap();

        assert_eq!(&nor.memory()[0x1100..0x1400], &data[..]);
        // Bytes around the range keep their erased value
        assert_eq!(nor.memory()[0x10FF], 0xFF);
        assert_eq!(nor.memory()[0x1400], 0xFF);
        assert_eq!(nor.erases(), vec![0x1000]);
    }

    #[test]
    fn test_write_preserves_rest_of_sector() {
        let mut nor = MockNor::new(0x10000);
        nor.fill(0x2000, &[0x11; 0x1000]);

        write(&mut nor, &POLICY, 0x2800, &[0x22; 0x10], &mut NoProgress, "test").unwrap();

        assert!(nor.memory()[0x2000..0x2800].iter().all(|&b| b == 0x11));
        assert!(nor.memory()[0x2800..0x2810].iter().all(|&b| b == 0x22));
        assert!(nor.memory()[0x2810..0x3000].iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_identical_content_skips_erase() {
        let mut nor = MockNor::new(0x10000);
        let data = [0xA5u8; 0x2000];
        nor.fill(0x4000, &data);

        write(&mut nor, &POLICY, 0x4000, &data, &mut NoProgress, "test").unwrap();

        assert_eq!(nor.erase_count(), 0);
        assert_eq!(nor.page_program_count(), 0);
    }

    #[test]
    fn test_one_and_a_half_sectors_touch_two() {
        let mut nor = MockNor::new(0x10000);
        let data = [0x5Au8; 0x1800];

        write(&mut nor, &POLICY, 0x1800, &data, &mut NoProgress, "test").unwrap();

        assert_eq!(nor.erases(), vec![0x1000, 0x2000]);
        assert_eq!(nor.page_program_count(), 2 * 16);
    }

    #[test]
    fn test_erase_succeeds_on_last_check() {
        let mut nor = MockNor::new(0x10000);
        nor.set_erase_busy_checks(9);

        write(&mut nor, &POLICY, 0x0, &[0x00; 8], &mut NoProgress, "test").unwrap();

        assert_eq!(&nor.memory()[..8], &[0x00; 8]);
    }

    #[test]
    fn test_erase_never_completes() {
        let mut nor = MockNor::new(0x10000);
        nor.set_erase_busy_checks(10);

        let result = write(&mut nor, &POLICY, 0x0, &[0x00; 8], &mut NoProgress, "test");

        assert_eq!(result, Err(Error::EraseVerifyFailure { addr: 0 }));
        assert_eq!(nor.page_program_count(), 0);
    }

    #[test]
    fn test_end_verification_failure() {
        let mut nor = MockNor::new(0x10000);
        let data = [0x12u8; 0x100];
        // Reads of the last word return stale data
        nor.corrupt_reads_at(0x30FC);

        let result = write(&mut nor, &POLICY, 0x3000, &data, &mut NoProgress, "test");

        assert_eq!(
            result,
            Err(Error::WriteVerifyFailure {
                addr: 0x30FC,
                stage: VerifyStage::End
            })
        );
    }

    #[test]
    fn test_start_verification_failure() {
        let mut nor = MockNor::new(0x10000);
        nor.corrupt_reads_at(0x3010);

        let result = write(&mut nor, &POLICY, 0x3010, &[0x12; 2], &mut NoProgress, "test");

        assert_eq!(
            result,
            Err(Error::WriteVerifyFailure {
                addr: 0x3010,
                stage: VerifyStage::Start
            })
        );
    }

    #[test]
    fn test_page_stream_shape() {
        let mut nor = MockNor::new(0x10000);
        let mut page = [0u8; 256];
        page[0] = 0xAB;
        page[1] = 0xCD;

        program_page(&mut nor, &POLICY, 0x100, &page).unwrap();

        // WREN + PP + 127 raw + commit
        assert_eq!(nor.command_count(), 1 + 1 + 127 + 1);
        assert_eq!(nor.last_command(), nor_raw(0xAB, 0xCD, opcodes::LATCH_COMMIT).bytes());
    }

    #[test]
    fn test_empty_write_is_noop() {
        let mut nor = MockNor::new(0x10000);
        write(&mut nor, &POLICY, 0x1234, &[], &mut NoProgress, "test").unwrap();
        assert_eq!(nor.command_count(), 0);
    }
}
