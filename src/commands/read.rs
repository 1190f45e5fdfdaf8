//! Read command implementation

use std::fs::File;
use std::io::Write;
use std::path::Path;

use cartflash_flash::CartHandle;

use super::progress::IndicatifProgress;
use super::CommandError;

/// Run the read command
pub fn run_read(
    handle: &mut CartHandle,
    output: &Path,
    offset: u32,
    length: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = handle.size();
    let len = match length {
        Some(len) => len,
        None => size.saturating_sub(offset),
    };
    if !handle.profile().is_valid_range(offset, len as usize) {
        return Err(CommandError::OutOfRange {
            offset,
            len: len as usize,
            size,
        }
        .into());
    }

    let mut data = vec![0u8; len as usize];
    let mut progress = IndicatifProgress::new();
    handle.read(offset, &mut data, &mut progress)?;
    progress.finish();

    let mut file = File::create(output).map_err(|source| CommandError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    file.write_all(&data).map_err(|source| CommandError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}
