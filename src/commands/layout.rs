//! Layout command implementation

use std::fs;
use std::path::Path;

use cartflash_flash::{CartHandle, InjectionLayout};

use super::{read_input, CommandError};

/// Show the injection layout for a FIRM, optionally saving it as TOML
pub fn run_layout(
    handle: &CartHandle,
    firm: Option<&Path>,
    firm_len: Option<u32>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let firm_len = match (firm, firm_len) {
        (Some(path), _) => read_input(path)?.len(),
        (None, Some(len)) => len as usize,
        (None, None) => return Err(CommandError::MissingFirm.into()),
    };

    let layout = handle.layout(firm_len)?;
    print_layout(&layout);

    if let Some(path) = output {
        let toml = layout.to_toml_string()?;
        fs::write(path, toml).map_err(|source| CommandError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        println!("Layout written to {:?}", path);
    }
    Ok(())
}

fn print_layout(layout: &InjectionLayout) {
    println!(
        "{}{}: FIRM {} bytes (max {})",
        layout.device,
        if layout.legacy { " (legacy)" } else { "" },
        layout.firm_len,
        layout.firm_max
    );
    println!();
    println!("{:<28} {:>10} {:>10} {:>8}", "Step", "Start", "End", "Encoded");
    println!("{}", "-".repeat(60));
    for region in layout.regions() {
        let end = region.offset as usize + region.len();
        println!(
            "{:<28} {:>#10X} {:>#10X} {:>8}",
            region.name,
            region.offset,
            end.saturating_sub(1),
            if region.encoded { "yes" } else { "no" }
        );
    }
}
