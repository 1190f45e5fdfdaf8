//! High-level cart access
//!
//! This crate opens carts by name and wraps them in a [`CartHandle`]. The CLI
//! should only interact with types from this crate and the core data types,
//! never directly with a [`CartBus`](cartflash_core::bus::CartBus).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  CLI (bin/cartflash)                 │
//! └─────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────┐
//! │              cartflash-flash (this crate)            │
//! │  - CartHandle: owns one initialized cart             │
//! │  - open_device: builds a cart from "name:k=v,..."    │
//! └─────────────────────────────────────────────────────┘
//!               │                          │
//!               ▼                          ▼
//! ┌──────────────────────────┐ ┌──────────────────────────┐
//! │      cartflash-core      │ │     cartflash-dummy      │
//! │  - Flashcart trait       │ │  - Emulated carts        │
//! │  - R4iSdhc, Dual-Core    │ │  - Implement CartBus     │
//! └──────────────────────────┘ └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cartflash_flash::open_device;
//!
//! let mut handle = open_device("r4isdhc:legacy=1", Some(Path::new("cart.bin")))?;
//! handle.inject(&key, &firm, &mut NoProgress)?;
//! handle.save_image()?;
//! ```

mod error;
mod handle;
mod registry;

pub use error::RegistryError;
pub use handle::CartHandle;
pub use registry::{
    available_devices, device_names_short, open_device, parse_device_params, DeviceInfo,
    DeviceParams,
};

// Re-export core types that the CLI needs
pub use cartflash_core::cart::{CartVariant, Flashcart, NorProfile};
pub use cartflash_core::inject::InjectionLayout;
pub use cartflash_core::progress::{NoProgress, Progress};
