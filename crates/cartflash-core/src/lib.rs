//! cartflash-core - Core library for cartridge NOR flash programming
//!
//! This crate provides the functionality for reading and programming the NOR
//! flash of DS flashcarts over the cartridge command bus, and for injecting
//! an ntrboot payload (Blowfish key + FIRM) into it. It is designed to be
//! `no_std` compatible; the transport is supplied by the caller through the
//! [`bus::CartBus`] trait.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`, TOML export)
//! - `alloc` - Enable heap allocation (needed by the byte-programming family)
//!
//! # Example
//!
//! ```ignore
//! use cartflash_core::cart::{Flashcart, R4iSdhc};
//! use cartflash_core::progress::NoProgress;
//!
//! fn inject<B: cartflash_core::bus::CartBus>(bus: B, key: &[u8], firm: &[u8]) {
//!     let mut cart = R4iSdhc::new(bus);
//!     match cart.initialize().and_then(|_| cart.inject_boot(key, firm, &mut NoProgress)) {
//!         Ok(()) => println!("ntrboot injected"),
//!         Err(e) => println!("Injection failed: {}", e),
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bus;
pub mod cart;
pub mod cipher;
pub mod cmd;
pub mod error;
pub mod inject;
pub mod naive;
pub mod nor;
pub mod progress;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
