//! NOR reads through the passthrough command

use crate::bus::{self, CartBus};
use crate::cmd::{nor_cmd, opcodes};
use crate::error::Result;
use crate::progress::Progress;

use super::SettlePolicy;

/// Read progress is reported each time this many bytes have been covered
pub const READ_PROGRESS_STRIDE: u32 = 0x4000;

/// Read the 4 bytes at `addr`
///
/// Uses the fixed 5-in/2-out framing of the cart's read. The response is
/// returned verbatim, i.e. in flash byte order.
pub fn read_word<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
) -> Result<[u8; 4]> {
    let cmd = nor_cmd(2, 5, opcodes::DOR, addr, 0, 0);
    let word = bus::send_read(bus, &cmd.bytes(), policy.command_latency)?;
    log::debug!("NOR read at {:X} returned {:X}", addr, bus::word_le(word));
    Ok(word)
}

/// Read `buf.len()` bytes starting at `addr`
///
/// Issues one 4-byte read per step. The tail of the last word is dropped
/// when the length is not a multiple of four.
pub fn read_range<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
    buf: &mut [u8],
    progress: Option<&mut dyn Progress>,
) -> Result<()> {
    let total = buf.len() as u32;
    let mut progress = progress;

    for (i, chunk) in buf.chunks_mut(4).enumerate() {
        let offset = (i * 4) as u32;
        let word = read_word(bus, policy, addr + offset)?;
        chunk.copy_from_slice(&word[..chunk.len()]);

        let covered = offset + 4;
        if let Some(p) = progress.as_deref_mut() {
            if covered % READ_PROGRESS_STRIDE == 0 {
                p.report(covered, total, "Reading NOR");
            }
        }
    }

    if let Some(p) = progress {
        p.report(total, total, "Reading NOR");
    }
    Ok(())
}
