//! Cartridge command words
//!
//! This module provides the command encoders for the NOR passthrough
//! (`0x99`) protocol, the vendor probe (`0x68`) command and the fixed
//! commands of the byte-programming family.

mod nor;
pub mod opcodes;

pub use nor::{
    erase_block_cmd, nor_cmd, nor_raw, read_word_cmd, vendor_cmd, write_byte_cmd, CommandWord,
};
