//! Device registry and initialization
//!
//! This module handles opening carts by name and creating CartHandles. Every
//! device is backed by an emulated cart; its flash can be loaded from and
//! saved to an image file.

use std::collections::HashMap;
use std::path::Path;

use cartflash_core::cart::{CartVariant, Flashcart, R4SdhcDualCore, R4iSdhc};
use cartflash_dummy::{image, DualCoreConfig, EmulatedDualCore, EmulatedR4iSdhc, R4iSdhcConfig};

use crate::error::RegistryError;
use crate::handle::{CartDevice, CartHandle};

/// Parsed device parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParams {
    /// Device name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl DeviceParams {
    /// Remove and return a parameter
    fn take(&mut self, key: &str) -> Option<String> {
        self.params.remove(key)
    }

    /// Fail if any parameter was not consumed
    fn finish(self) -> Result<(), RegistryError> {
        match self.params.into_keys().next() {
            Some(name) => Err(RegistryError::InvalidParameter {
                name,
                message: format!("not supported by {}", self.name),
            }),
            None => Ok(()),
        }
    }
}

/// Parse a device string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_device_params("r4isdhc:legacy=1")?;
/// assert_eq!(params.name, "r4isdhc");
/// assert_eq!(params.params.get("legacy"), Some(&"1".to_string()));
/// ```
pub fn parse_device_params(s: &str) -> Result<DeviceParams, RegistryError> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(RegistryError::InvalidParameter {
                    name: opt.to_string(),
                    message: "expected key=value".to_string(),
                });
            }
        }
    }

    Ok(DeviceParams {
        name: name.to_string(),
        params,
    })
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(name: &str, s: &str) -> Result<u32, RegistryError> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| RegistryError::InvalidParameter {
        name: name.to_string(),
        message: format!("invalid number '{}': {}", s, e),
    })
}

fn parse_bool(name: &str, s: &str) -> Result<bool, RegistryError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(RegistryError::InvalidParameter {
            name: name.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

/// Load the backing image, or start blank without one
fn initial_data(image_path: Option<&Path>, size: usize) -> Result<Vec<u8>, RegistryError> {
    match image_path {
        Some(path) => Ok(image::load_or_blank(path, size)?),
        None => Ok(vec![0xFF; size]),
    }
}

/// Open a cart and create a CartHandle
///
/// This is the main entry point for the CLI. It handles:
/// 1. Parsing the device string
/// 2. Building the emulated cart, backed by `image_path` if given
/// 3. Initializing (detecting) the cart
///
/// # Arguments
/// * `device` - Device string (e.g., "r4isdhc" or "r4isdhc:legacy=1")
/// * `image_path` - Flash image file; created blank when missing
pub fn open_device(device: &str, image_path: Option<&Path>) -> Result<CartHandle, RegistryError> {
    let params = parse_device_params(device)?;

    match params.name.as_str() {
        "r4isdhc" | "r4i-sdhc" | "r4isdhc-rts" => open_r4isdhc(params, image_path),
        "r4sdhc-dualcore" | "r4sdhc_dualcore" | "dualcore" => open_dualcore(params, image_path),
        _ => Err(RegistryError::UnknownDevice(
            params.name,
            device_names_short(),
        )),
    }
}

fn open_r4isdhc(
    mut params: DeviceParams,
    image_path: Option<&Path>,
) -> Result<CartHandle, RegistryError> {
    let mut config = R4iSdhcConfig::default();
    if let Some(v) = params.take("legacy") {
        config.legacy = parse_bool("legacy", &v)?;
    }
    if let Some(v) = params.take("marker") {
        let marker = parse_number("marker", &v)?;
        config.marker = u8::try_from(marker).map_err(|_| RegistryError::InvalidParameter {
            name: "marker".to_string(),
            message: format!("0x{:X} does not fit in a byte", marker),
        })?;
    }
    if let Some(v) = params.take("erase_busy") {
        config.erase_busy_checks = parse_number("erase_busy", &v)?;
    }
    let forced = match params.take("variant").as_deref() {
        None => None,
        Some("current") => Some(CartVariant::Current),
        Some("legacy") => Some(CartVariant::Legacy),
        Some(other) => {
            return Err(RegistryError::InvalidParameter {
                name: "variant".to_string(),
                message: format!("expected 'current' or 'legacy', got '{}'", other),
            })
        }
    };
    params.finish()?;

    log::info!("Opening emulated R4iSDHC{}", if config.legacy { " (legacy)" } else { "" });
    let data = initial_data(image_path, config.size)?;
    let mut cart = R4iSdhc::new(EmulatedR4iSdhc::with_data(config, data));
    cart.initialize()?;
    if let Some(variant) = forced {
        log::info!("Overriding detected variant with {:?}", variant);
        cart.force_variant(variant);
    }

    Ok(CartHandle::new(Box::new(cart), image_path))
}

fn open_dualcore(
    params: DeviceParams,
    image_path: Option<&Path>,
) -> Result<CartHandle, RegistryError> {
    params.finish()?;

    log::info!("Opening emulated R4 SDHC Dual-Core");
    let config = DualCoreConfig::default();
    let data = initial_data(image_path, config.size)?;
    let mut cart = R4SdhcDualCore::new(EmulatedDualCore::with_data(config, data));
    cart.initialize()?;

    Ok(CartHandle::new(Box::new(cart), image_path))
}

// Device information and listing
/// Information about a device
pub struct DeviceInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available devices
pub fn available_devices() -> Vec<DeviceInfo> {
    vec![
        DeviceInfo {
            name: "r4isdhc",
            aliases: &["r4i-sdhc", "r4isdhc-rts"],
            description: "R4iSDHC family, emulated (legacy=<0|1>,marker=<n>,erase_busy=<n>,variant=<current|legacy>)",
        },
        DeviceInfo {
            name: "r4sdhc-dualcore",
            aliases: &["r4sdhc_dualcore", "dualcore"],
            description: "R4 SDHC Dual-Core, emulated",
        },
    ]
}

/// Generate a short list of device names for CLI help
pub fn device_names_short() -> String {
    let names: Vec<&str> = available_devices().iter().map(|d| d.name).collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartflash_core::progress::NoProgress;

    #[test]
    fn test_parse_device_params() {
        let params = parse_device_params("r4isdhc:legacy=1,erase_busy=0x3").unwrap();
        assert_eq!(params.name, "r4isdhc");
        assert_eq!(params.params.get("legacy"), Some(&"1".to_string()));
        assert_eq!(params.params.get("erase_busy"), Some(&"0x3".to_string()));

        let params = parse_device_params("dualcore").unwrap();
        assert!(params.params.is_empty());
    }

    #[test]
    fn test_parse_device_params_rejects_bare_option() {
        assert!(matches!(
            parse_device_params("r4isdhc:legacy"),
            Err(RegistryError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_parse_number_and_bool() {
        assert_eq!(parse_number("n", "0x32").unwrap(), 0x32);
        assert_eq!(parse_number("n", "50").unwrap(), 50);
        assert!(parse_number("n", "zz").is_err());
        assert!(parse_bool("b", "Yes").unwrap());
        assert!(!parse_bool("b", "0").unwrap());
        assert!(parse_bool("b", "maybe").is_err());
    }

    #[test]
    fn test_open_each_device() {
        for info in available_devices() {
            let handle = open_device(info.name, None).unwrap();
            assert_eq!(handle.size(), 0x200000);
        }
    }

    #[test]
    fn test_open_legacy() {
        let handle = open_device("r4isdhc:legacy=1", None).unwrap();
        assert_eq!(handle.variant(), CartVariant::Legacy);
    }

    #[test]
    fn test_forced_variant() {
        let handle = open_device("r4isdhc:variant=legacy", None).unwrap();
        assert_eq!(handle.variant(), CartVariant::Legacy);
    }

    #[test]
    fn test_unsupported_cart() {
        assert!(matches!(
            open_device("r4isdhc:marker=0x31", None),
            Err(RegistryError::Cart(cartflash_core::Error::UnsupportedDevice))
        ));
    }

    #[test]
    fn test_marker_must_fit_in_a_byte() {
        assert!(matches!(
            open_device("r4isdhc:marker=0x132", None),
            Err(RegistryError::InvalidParameter { ref name, .. }) if name == "marker"
        ));
        assert!(open_device("r4isdhc:marker=0x32", None).is_ok());
    }

    #[test]
    fn test_unknown_device_and_param() {
        assert!(matches!(
            open_device("supercard", None),
            Err(RegistryError::UnknownDevice(..))
        ));
        assert!(matches!(
            open_device("dualcore:legacy=1", None),
            Err(RegistryError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_image_round_trip() {
        let path = std::env::temp_dir().join(format!("cartflash-registry-{}.bin", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut handle = open_device("r4isdhc", Some(&path)).unwrap();
        handle.write(0x1000, b"saved", &mut NoProgress).unwrap();
        handle.save_image().unwrap();
        drop(handle);

        let mut handle = open_device("r4isdhc", Some(&path)).unwrap();
        let mut buf = [0u8; 5];
        handle.read(0x1000, &mut buf, &mut NoProgress).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(&buf, b"saved");
    }
}
