//! NOR passthrough operations
//!
//! Reading and sector-based programming of a 25-series NOR chip that sits
//! behind the cart FPGA. Every transaction is wrapped in a passthrough
//! command built by [`crate::cmd::nor_cmd`] or [`crate::cmd::nor_raw`].

mod policy;
mod program;
mod read;

pub use policy::SettlePolicy;
pub use program::{erase_sector, program_page, write, write_enable};
pub use read::{read_range, read_word, READ_PROGRESS_STRIDE};

/// Page program granularity
pub const PAGE_SIZE: u32 = 256;
/// Smallest erase unit
pub const SECTOR_SIZE: u32 = 4096;
