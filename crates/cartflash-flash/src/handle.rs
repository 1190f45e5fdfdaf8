//! CartHandle - one initialized cart plus its backing image
//!
//! The handle hides which family sits behind it. The CLI works only with
//! this type and never needs to know about a `CartBus`.

use std::path::{Path, PathBuf};

use cartflash_core::cart::{CartVariant, Flashcart, NorProfile, R4SdhcDualCore, R4iSdhc};
use cartflash_core::inject::InjectionLayout;
use cartflash_core::progress::Progress;
use cartflash_dummy::{image, EmulatedDualCore, EmulatedR4iSdhc};

use crate::error::RegistryError;

/// A cart whose flash contents can be inspected
pub(crate) trait CartDevice: Flashcart {
    /// The whole flash as currently stored
    fn image(&self) -> &[u8];
}

impl CartDevice for R4iSdhc<EmulatedR4iSdhc> {
    fn image(&self) -> &[u8] {
        self.bus().data()
    }
}

impl CartDevice for R4SdhcDualCore<EmulatedDualCore> {
    fn image(&self) -> &[u8] {
        self.bus().data()
    }
}

/// Unified cart handle
///
/// The cart is initialized before the handle is created and shut down when
/// it is dropped.
pub struct CartHandle {
    /// The underlying cart (type-erased, owned)
    device: Box<dyn CartDevice>,
    /// Where [`CartHandle::save_image`] writes the flash
    image_path: Option<PathBuf>,
}

impl CartHandle {
    pub(crate) fn new(device: Box<dyn CartDevice>, image_path: Option<&Path>) -> Self {
        Self {
            device,
            image_path: image_path.map(Path::to_path_buf),
        }
    }

    /// Family name
    pub fn name(&self) -> &'static str {
        self.device.name()
    }

    /// Flash description
    pub fn profile(&self) -> &NorProfile {
        self.device.profile()
    }

    /// Get flash size in bytes
    pub fn size(&self) -> u32 {
        self.device.profile().total_size
    }

    /// Variant detected during initialization
    pub fn variant(&self) -> CartVariant {
        self.device.variant()
    }

    /// Read `buf.len()` bytes at `addr`
    pub fn read(
        &mut self,
        addr: u32,
        buf: &mut [u8],
        progress: &mut dyn Progress,
    ) -> Result<(), RegistryError> {
        Ok(self.device.read_flash(addr, buf, progress)?)
    }

    /// Write `data` at `addr`
    ///
    /// The rest of every touched erase unit is preserved.
    pub fn write(
        &mut self,
        addr: u32,
        data: &[u8],
        progress: &mut dyn Progress,
    ) -> Result<(), RegistryError> {
        Ok(self.device.write_flash(addr, data, progress)?)
    }

    /// Inject the Blowfish `key` and the `firm` boot image
    pub fn inject(
        &mut self,
        key: &[u8],
        firm: &[u8],
        progress: &mut dyn Progress,
    ) -> Result<(), RegistryError> {
        log::info!(
            "Injecting {} byte FIRM into {} ({:?})",
            firm.len(),
            self.name(),
            self.variant()
        );
        Ok(self.device.inject_boot(key, firm, progress)?)
    }

    /// Where an injection of a `firm_len`-byte FIRM would write
    pub fn layout(&self, firm_len: usize) -> Result<InjectionLayout, RegistryError> {
        Ok(self.device.injection_layout(firm_len)?)
    }

    /// The whole flash as currently stored
    pub fn image(&self) -> &[u8] {
        self.device.image()
    }

    /// Copy out the whole flash
    pub fn into_image(self) -> Vec<u8> {
        self.device.image().to_vec()
    }

    /// Path of the backing image, if any
    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    /// Write the flash back to the backing image
    ///
    /// Does nothing when the handle was opened without an image.
    pub fn save_image(&self) -> Result<(), RegistryError> {
        match &self.image_path {
            Some(path) => {
                log::debug!("Saving flash image to {}", path.display());
                Ok(image::save(path, self.device.image())?)
            }
            None => Ok(()),
        }
    }
}

impl Drop for CartHandle {
    fn drop(&mut self) {
        if let Err(e) = self.device.shutdown() {
            log::warn!("Failed to shut down {}: {}", self.device.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::open_device;
    use cartflash_core::inject::{KEY_LEN, Payload};
    use cartflash_core::progress::NoProgress;

    #[test]
    fn test_write_then_read() {
        let mut handle = open_device("dualcore", None).unwrap();
        handle.write(0x12345, b"hello", &mut NoProgress).unwrap();

        let mut buf = [0u8; 5];
        handle.read(0x12345, &mut buf, &mut NoProgress).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_out_of_bounds() {
        let mut handle = open_device("r4isdhc", None).unwrap();
        let mut buf = [0u8; 8];
        assert!(handle.read(0x1FFFFC, &mut buf, &mut NoProgress).is_err());
    }

    #[test]
    fn test_inject_writes_key_region() {
        let mut handle = open_device("r4isdhc", None).unwrap();
        let key: Vec<u8> = (0..KEY_LEN).map(|i| i as u8).collect();
        let firm = vec![0x5Au8; 0x400];
        handle.inject(&key, &firm, &mut NoProgress).unwrap();

        let layout = handle.layout(firm.len()).unwrap();
        let region = layout
            .regions()
            .iter()
            .find(|r| matches!(r.payload, Payload::Key { .. }))
            .unwrap();
        let start = region.offset as usize;
        assert_eq!(
            &handle.image()[start..start + region.len()],
            region.bytes(&key, &firm)
        );
    }

    #[test]
    fn test_into_image() {
        let handle = open_device("r4isdhc", None).unwrap();
        let image = handle.into_image();
        assert_eq!(image.len(), 0x200000);
    }
}
