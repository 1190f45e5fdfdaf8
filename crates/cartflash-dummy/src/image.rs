//! Backing files for emulated carts

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{ImageError, Result};

/// Load a flash image, or create a blank one if `path` does not exist
///
/// A blank image is all 0xFF, like an erased NOR. Existing files must be
/// exactly `size` bytes.
pub fn load_or_blank(path: &Path, size: usize) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(data) if data.len() == size => {
            log::debug!("Loaded {} byte image from {}", data.len(), path.display());
            Ok(data)
        }
        Ok(data) => Err(ImageError::SizeMismatch {
            path: path.to_path_buf(),
            expected: size,
            actual: data.len(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("{} does not exist, starting from a blank image", path.display());
            Ok(vec![0xFF; size])
        }
        Err(source) => Err(ImageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write a flash image back to `path`
pub fn save(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Saved {} byte image to {}", data.len(), path.display());
    Ok(())
}
