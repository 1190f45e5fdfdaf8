//! Cartridge and NOR opcodes
//!
//! The NOR opcodes are standard 25-series SPI flash commands; the cart
//! forwards them to the chip when wrapped in a [`NOR_PASSTHROUGH`] command.

// ============================================================================
// Card command bytes (byte 0 of a command word)
// ============================================================================

/// NOR passthrough - the remaining bytes describe one SPI transaction
pub const NOR_PASSTHROUGH: u8 = 0x99;
/// Vendor command, doubles as the unlock for the NOR passthrough
pub const VENDOR_68: u8 = 0x68;

// ============================================================================
// NOR opcodes (byte 2 of a passthrough command)
// ============================================================================

/// Write Enable - required before any program/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable
pub const WRDI: u8 = 0x04;
/// Page Program (up to 256 bytes)
pub const PP: u8 = 0x02;
/// 4 KiB sector erase
pub const SE_20: u8 = 0x20;
/// Dual output read, used by the cart for 4-byte reads
pub const DOR: u8 = 0x3B;
/// Vendor read used by the detection probe
pub const PROBE_1F: u8 = 0x1F;

/// Latch parameter that commits a streamed page program
pub const LATCH_COMMIT: u8 = 0xF0;

// ============================================================================
// Byte-programming family (R4 SDHC Dual-Core)
// ============================================================================

/// Erase the 64 KiB block containing the embedded address
pub const ERASE_FLASH: [u8; 8] = [0xD4, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00];
/// Program one byte at the embedded address
pub const WRITE_BYTE_FLASH: [u8; 8] = [0xD4, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00];
/// Apply the previously queued erase/program
pub const APPLY: [u8; 8] = [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
/// Read the cart version
pub const CART_VERSION: [u8; 8] = [0xC5, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
/// Read the chip id
pub const READ_CHIP_ID: [u8; 8] = [0xB8; 8];
/// Unlock sequence, first and last step
pub const UNLOCK_D0AA: [u8; 8] = [0xD0, 0xAA, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
/// Unlock sequence, middle step
pub const UNLOCK_D0: [u8; 8] = [0xD0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
/// Read data at the embedded 32-bit address
pub const READ_FLASH: [u8; 8] = [0xB7, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
