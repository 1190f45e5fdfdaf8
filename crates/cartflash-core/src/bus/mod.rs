//! Cartridge bus abstraction
//!
//! This module defines the transport trait every cart family drives. The
//! transport itself (a DS slot, a flashcart reader, an emulator) lives
//! outside this crate.

mod traits;

pub use traits::*;
