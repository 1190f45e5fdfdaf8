//! Write command implementation

use std::path::Path;

use cartflash_flash::CartHandle;

use super::progress::IndicatifProgress;
use super::{read_input, CommandError};

/// Run the write command
///
/// Erase units touched by the write keep the bytes outside the written
/// range.
pub fn run_write(
    handle: &mut CartHandle,
    input: &Path,
    offset: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_input(input)?;
    let size = handle.size();
    if !handle.profile().is_valid_range(offset, data.len()) {
        return Err(CommandError::OutOfRange {
            offset,
            len: data.len(),
            size,
        }
        .into());
    }

    log::info!("Writing {} bytes at 0x{:06X}", data.len(), offset);
    let mut progress = IndicatifProgress::new();
    handle.write(offset, &data, &mut progress)?;
    progress.finish();
    handle.save_image()?;

    println!("Write complete: {} bytes at 0x{:06X}", data.len(), offset);
    Ok(())
}
