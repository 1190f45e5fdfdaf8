//! Probe command implementation

use cartflash_core::cart::CartFeatures;
use cartflash_flash::CartHandle;

use super::format_size;

/// Show what was detected on open
pub fn run_probe(handle: &CartHandle) -> Result<(), Box<dyn std::error::Error>> {
    let profile = handle.profile();

    println!("Found: {} ({:?} cart)", handle.name(), handle.variant());
    println!("  Size:        {} ({} bytes)", format_size(profile.total_size), profile.total_size);
    println!("  Page size:   {} bytes", profile.page_size);
    println!("  Erase size:  {} bytes", profile.erase_size);

    let mut features = Vec::new();
    if profile.features.contains(CartFeatures::PAGE_PROGRAM) {
        features.push("page program");
    }
    if profile.features.contains(CartFeatures::BYTE_PROGRAM) {
        features.push("byte program");
    }
    if profile.features.contains(CartFeatures::OBFUSCATED) {
        features.push("obfuscated");
    }
    if profile.features.contains(CartFeatures::DETECTION_PROBE) {
        features.push("detection probe");
    }
    println!("  Features:    {}", features.join(", "));

    Ok(())
}
