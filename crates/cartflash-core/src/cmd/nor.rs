//! Command word encoders
//!
//! All builders are `const fn` and perform no I/O. A [`CommandWord`] is the
//! little-endian packing of the 8 bytes sent on the wire: bits 0-7 are the
//! first byte.

use super::opcodes;

/// A packed 8-byte cartridge command
///
/// Immutable once built. The `u64` view is what the encoders produce; the
/// byte view is what goes on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandWord(u64);

impl CommandWord {
    /// Wrap a packed command value
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Build a command from its wire bytes
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    /// The packed command value
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The command bytes in wire order
    pub const fn bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl From<CommandWord> for u64 {
    fn from(cmd: CommandWord) -> Self {
        cmd.0
    }
}

/// Build a NOR passthrough command
///
/// Layout, from the least significant byte: `99 XY CC AA AA AA D1 D2` where
/// `X` is `out_len`, `Y` is `in_len` (both truncated to 4 bits), `CC` is the
/// SPI opcode and the address is sent most significant byte first.
pub const fn nor_cmd(out_len: u8, in_len: u8, opcode: u8, addr: u32, d1: u8, d2: u8) -> CommandWord {
    let addr = addr as u64;
    CommandWord(
        opcodes::NOR_PASSTHROUGH as u64
            | ((out_len as u64 & 0xF) << 12)
            | ((in_len as u64 & 0xF) << 8)
            | ((opcode as u64) << 16)
            | ((addr & 0xFF0000) << 8)
            | ((addr & 0xFF00) << 24)
            | ((addr & 0xFF) << 40)
            | ((d1 as u64) << 48)
            | ((d2 as u64) << 56),
    )
}

/// Build a raw NOR data command
///
/// Streams two more bytes of an open page program. A non-zero `latch`
/// parameter ([`opcodes::LATCH_COMMIT`]) tells the cart FPGA to commit the
/// page.
pub const fn nor_raw(d1: u8, d2: u8, latch: u8) -> CommandWord {
    CommandWord(
        opcodes::NOR_PASSTHROUGH as u64
            | ((latch as u64) << 8)
            | ((d1 as u64) << 16)
            | ((d2 as u64) << 24),
    )
}

/// Build a vendor `0x68` command
///
/// Only used by the detection probe. The nibble packing of byte 1 keeps the
/// low nibble of `a2` and shifts `a1` up by four, dropping its high nibble.
pub const fn vendor_cmd(a1: u8, a2: u8, a3: u8, a4: u32, a5: u16) -> CommandWord {
    CommandWord::from_bytes([
        opcodes::VENDOR_68,
        (a2 & 0xF) | (a1 << 4),
        a3,
        (a4 >> 16) as u8,
        (a4 >> 8) as u8,
        a4 as u8,
        (a5 >> 8) as u8,
        a5 as u8,
    ])
}

/// Embed a 24-bit address big-endian into bytes 1-3 of a fixed command
const fn with_addr24(mut base: [u8; 8], addr: u32) -> [u8; 8] {
    base[1] = (addr >> 16) as u8;
    base[2] = (addr >> 8) as u8;
    base[3] = addr as u8;
    base
}

/// Erase the 64 KiB block at `addr` (byte-programming family)
pub const fn erase_block_cmd(addr: u32) -> CommandWord {
    CommandWord::from_bytes(with_addr24(opcodes::ERASE_FLASH, addr))
}

/// Program `value` at `addr` (byte-programming family)
pub const fn write_byte_cmd(addr: u32, value: u8) -> CommandWord {
    let mut bytes = with_addr24(opcodes::WRITE_BYTE_FLASH, addr);
    bytes[4] = value;
    CommandWord::from_bytes(bytes)
}

/// Read 4 bytes at `addr` (byte-programming family)
pub const fn read_word_cmd(addr: u32) -> CommandWord {
    let mut bytes = opcodes::READ_FLASH;
    bytes[1] = (addr >> 24) as u8;
    bytes[2] = (addr >> 16) as u8;
    bytes[3] = (addr >> 8) as u8;
    bytes[4] = addr as u8;
    CommandWord::from_bytes(bytes)
}

const _: () = assert!(nor_cmd(2, 5, 0x3B, 0xABCDEF, 0x12, 0x34).value() == 0x3412EFCDAB3B2599);
const _: () = assert!(nor_raw(0x34, 0x56, 0x12).value() == 0x56341299);
