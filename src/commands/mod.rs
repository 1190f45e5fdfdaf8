//! CLI command implementations
//!
//! Every command works on a [`CartHandle`](cartflash_flash::CartHandle)
//! opened from the `--device` string. Mutating commands write the backing
//! image back once the cart operation succeeded.

mod error;
mod inject;
mod layout;
mod list;
mod probe;
mod progress;
mod read;
mod write;

pub use error::CommandError;
pub use inject::run_inject;
pub use layout::run_layout;
pub use list::list_devices;
pub use probe::run_probe;
pub use read::run_read;
pub use write::run_write;

use std::fs;
use std::path::Path;

/// Read a whole input file
fn read_input(path: &Path) -> Result<Vec<u8>, CommandError> {
    fs::read(path).map_err(|source| CommandError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
