//! Settle delays and retry limits

/// Delay and retry policy for one cart family
///
/// All delays are busy-wait counts understood by the transport, not
/// wall-clock timeouts. The cart has no status readback, so these are the
/// only guarantee that a command has taken effect; never shorten them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    /// Latency programmed for every command
    pub command_latency: u32,
    /// Wait after a write enable
    pub write_enable_delay: u32,
    /// Wait after a sector erase, and between erase checks
    pub erase_delay: u32,
    /// Wait after committing a page
    pub page_delay: u32,
    /// Number of erase checks before giving up on a sector
    pub max_erase_retries: u32,
}

impl SettlePolicy {
    /// Timing of the R4iSDHC family (page-programmed NOR behind an FPGA)
    pub const R4ISDHC: Self = Self {
        command_latency: 0x180000,
        write_enable_delay: 0x60000,
        erase_delay: 41_000_000,
        page_delay: 0x60000,
        max_erase_retries: 10,
    };

    /// Timing of the byte-programming family
    ///
    /// The erase/apply cycle is handled by the cart controller; only the
    /// command latency applies.
    pub const BYTE_PROGRAM: Self = Self {
        command_latency: 0x50,
        write_enable_delay: 0,
        erase_delay: 0,
        page_delay: 0,
        max_erase_retries: 1,
    };
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::R4ISDHC
    }
}
