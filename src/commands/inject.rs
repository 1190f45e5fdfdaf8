//! Inject command implementation

use std::path::Path;

use cartflash_flash::CartHandle;

use super::progress::IndicatifProgress;
use super::read_input;

/// Run the inject command
pub fn run_inject(
    handle: &mut CartHandle,
    key: &Path,
    firm: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = read_input(key)?;
    let firm = read_input(firm)?;

    // Fails before touching the cart when the FIRM does not fit
    let layout = handle.layout(firm.len())?;
    log::debug!("Injection layout has {} regions", layout.regions().len());

    let mut progress = IndicatifProgress::new();
    handle.inject(&key, &firm, &mut progress)?;
    progress.finish();
    handle.save_image()?;

    println!(
        "Injected {} byte FIRM into {} ({:?} cart)",
        firm.len(),
        handle.name(),
        handle.variant()
    );
    Ok(())
}
