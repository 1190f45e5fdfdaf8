//! Bus trait definitions

use crate::error::Result;

/// Length of every command sent over the cartridge bus
pub const COMMAND_LEN: usize = 8;

/// Cartridge bus trait
///
/// This trait represents a transport that can send a single 8-byte card
/// command and collect its response. Every call is a blocking
/// request/response pair: the cart keeps implicit state (write enable latch,
/// erase in progress, unlock state) that only one in-flight command may
/// observe.
///
/// ## Settle delays
///
/// The cart offers no ready status. Each command therefore carries a
/// `settle` count that the transport must wait (busy-wait cycles, as
/// programmed into the card controller's latency field) before sampling the
/// response. Additional waits between commands go through
/// [`CartBus::delay`]. Neither may be shortened by an implementation.
///
/// ## Example
///
/// ```ignore
/// impl CartBus for MySlot {
///     fn send(&mut self, cmd: &[u8; 8], resp: &mut [u8], settle: u32) -> Result<()> {
///         self.card_write_command(cmd, settle)?;
///         self.card_read_data(resp)
///     }
///
///     fn delay(&mut self, cycles: u32) {
///         busy_wait(cycles);
///     }
/// }
/// ```
pub trait CartBus {
    /// Send a command and read `resp.len()` bytes of response (0 or 4)
    ///
    /// Byte 0 of `cmd` is the first byte on the wire.
    fn send(&mut self, cmd: &[u8; COMMAND_LEN], resp: &mut [u8], settle: u32) -> Result<()>;

    /// Busy-wait for the given number of delay cycles
    fn delay(&mut self, cycles: u32);
}

impl<B: CartBus + ?Sized> CartBus for &mut B {
    fn send(&mut self, cmd: &[u8; COMMAND_LEN], resp: &mut [u8], settle: u32) -> Result<()> {
        (**self).send(cmd, resp, settle)
    }

    fn delay(&mut self, cycles: u32) {
        (**self).delay(cycles)
    }
}

// Boxed buses allow the registry to pick a transport at runtime
#[cfg(feature = "alloc")]
impl CartBus for alloc::boxed::Box<dyn CartBus + Send> {
    fn send(&mut self, cmd: &[u8; COMMAND_LEN], resp: &mut [u8], settle: u32) -> Result<()> {
        (**self).send(cmd, resp, settle)
    }

    fn delay(&mut self, cycles: u32) {
        (**self).delay(cycles)
    }
}

/// Send a command that expects a 4-byte response and return it verbatim
///
/// The bytes are returned in wire order; callers decide how to interpret
/// them (see [`word_le`]).
pub fn send_read<B: CartBus + ?Sized>(
    bus: &mut B,
    cmd: &[u8; COMMAND_LEN],
    settle: u32,
) -> Result<[u8; 4]> {
    let mut resp = [0u8; 4];
    bus.send(cmd, &mut resp, settle)?;
    Ok(resp)
}

/// Send a command that has no response
pub fn send_only<B: CartBus + ?Sized>(
    bus: &mut B,
    cmd: &[u8; COMMAND_LEN],
    settle: u32,
) -> Result<()> {
    bus.send(cmd, &mut [], settle)
}

/// Interpret a 4-byte response as the little-endian word the card returned
#[inline]
pub fn word_le(resp: [u8; 4]) -> u32 {
    u32::from_le_bytes(resp)
}
