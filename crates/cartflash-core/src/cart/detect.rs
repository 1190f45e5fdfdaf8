//! R4iSDHC detection probe
//!
//! After the unlock command the cart answers a handful of vendor reads. The
//! probe runs up to five stages against them and classifies the cart. The
//! constants below are taken from the vendor's own loader and are matched
//! byte for byte; their meaning is unknown.

use crate::bus::{self, CartBus};
use crate::cmd::{nor_cmd, opcodes, vendor_cmd, CommandWord};
use crate::error::Result;
use crate::nor::{read_word, SettlePolicy};

/// Address whose low byte identifies the family
const MARKER_ADDR: u32 = 0x7084;
const MARKER_BYTE: u8 = 0x32;

/// First vendor window: 9 words from 0x2F00
const SIGNATURE_ADDR: u32 = 0x2F00;
const SIGNATURE_SPAN: u32 = 8;
/// Second vendor window: 129 words from 0x3000
const TRAILER_ADDR: u32 = 0x3000;
const TRAILER_SPAN: u32 = 0x80;
const TRAILER_OFFSET: usize = 95;

/// Enough room for the larger window
const PROBE_BUF_LEN: usize = (TRAILER_SPAN as usize + 1) * 4;

/// At least one byte must match positionally
const VENDOR_MATCH: [u8; 8] = [0xA2, 0x2F, 0xE3, 0x3B, 0xB6, 0x33, 0x7C, 0xFC];
/// Every byte must match
const VENDOR_SIGNATURE: [u8; 8] = [0x40, 0xAA, 0x91, 0xE1, 0x1D, 0x8D, 0xF2, 0x71];
/// Checked against [`HEADER_MARKER`]
const REFERENCE_HEADER: [u8; 4] = [0x30, 0x00, 0xFF, 0xFF];
const HEADER_MARKER: u8 = 0x30;
const TRAILER: [u8; 8] = [0x62, 0x54, 0xFE, 0x02, 0x6D, 0x3B, 0xE2, 0xF4];

/// Arguments of the vendor select command and of each vendor read
const SELECT: (u8, u8, u8, u32, u16) = (0xF8, 0x7F, 0x4E, 0xAA, 0xF7);
const READ_LENS: (u8, u8) = (0x48, 0xA2);
const READ_PARAM: u16 = 0x0070;

/// Probe stage that rejected a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    /// Marker byte at 0x7084
    Marker,
    /// Full signature in the first vendor window
    VendorSignature,
    /// Reference header check
    ReferenceHeader,
    /// Trailer bytes in the second vendor window
    Trailer,
}

/// Result of the detection probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Every stage passed
    TypeA,
    /// The first vendor window shares no byte with the match pattern
    TypeB,
    /// Rejected at the given stage
    Unsupported(ProbeStage),
}

impl ProbeOutcome {
    /// Whether the cart can be used
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

/// Detection progress of an R4iSDHC cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectState {
    /// Nothing sent yet, or the last initialization failed early
    Locked,
    /// Unlock sent, probe running
    Probing,
    /// Probe finished
    Classified(ProbeOutcome),
}

/// Fill `buf` with the vendor words at `addr..=addr + span`
///
/// Consecutive words come from consecutive addresses, not 4 bytes apart.
fn vendor_read<B: CartBus + ?Sized>(
    bus: &mut B,
    policy: &SettlePolicy,
    addr: u32,
    span: u32,
    buf: &mut [u8; PROBE_BUF_LEN],
) -> Result<()> {
    let (a1, a2, a3, a4, a5) = SELECT;
    let select = bus::send_read(bus, &vendor_cmd(a1, a2, a3, a4, a5).bytes(), policy.command_latency)?;
    // The loader indexes its buffer with this value; it is always 0 in practice
    log::debug!("NOR 68 at {:X} returned {:X}", a4, bus::word_le(select));

    let (out_len, in_len) = READ_LENS;
    let [hi, lo] = READ_PARAM.to_be_bytes();
    for (slot, a) in buf.chunks_exact_mut(4).zip(addr..=addr + span) {
        let cmd = nor_cmd(out_len, in_len, opcodes::PROBE_1F, a, hi, lo);
        let word = bus::send_read(bus, &cmd.bytes(), policy.command_latency)?;
        log::debug!("NOR {:X} at {:X} returned {:X}", opcodes::PROBE_1F, a, bus::word_le(word));
        slot.copy_from_slice(&word);
    }
    Ok(())
}

/// Run the detection probe
///
/// Sends the unlock command and classifies the cart. Only bus failures are
/// errors; an unknown cart is reported as [`ProbeOutcome::Unsupported`].
pub fn probe<B: CartBus + ?Sized>(bus: &mut B, policy: &SettlePolicy) -> Result<ProbeOutcome> {
    let unlock = CommandWord::from_u64(opcodes::VENDOR_68 as u64);
    bus::send_read(bus, &unlock.bytes(), policy.command_latency)?;

    let marker = read_word(bus, policy, MARKER_ADDR)?;
    if marker[0] != MARKER_BYTE {
        log::debug!("Probe: marker byte {:02X}", marker[0]);
        return Ok(ProbeOutcome::Unsupported(ProbeStage::Marker));
    }

    let mut buf = [0u8; PROBE_BUF_LEN];
    vendor_read(bus, policy, SIGNATURE_ADDR, SIGNATURE_SPAN, &mut buf)?;

    let window = &buf[..8];
    if !window.iter().zip(&VENDOR_MATCH).any(|(a, b)| a == b) {
        return Ok(ProbeOutcome::TypeB);
    }
    if window != VENDOR_SIGNATURE {
        return Ok(ProbeOutcome::Unsupported(ProbeStage::VendorSignature));
    }

    vendor_read(bus, policy, TRAILER_ADDR, TRAILER_SPAN, &mut buf)?;
    if REFERENCE_HEADER.iter().any(|&b| b != HEADER_MARKER) {
        return Ok(ProbeOutcome::Unsupported(ProbeStage::ReferenceHeader));
    }
    if buf[TRAILER_OFFSET..TRAILER_OFFSET + TRAILER.len()] != TRAILER {
        return Ok(ProbeOutcome::Unsupported(ProbeStage::Trailer));
    }
    Ok(ProbeOutcome::TypeA)
}
