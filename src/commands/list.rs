//! List commands implementation

use cartflash_flash::available_devices;

/// List all supported carts
pub fn list_devices() {
    println!("Supported devices:");
    println!();
    for info in available_devices() {
        println!("  {:<16} - {}", info.name, info.description);
        if !info.aliases.is_empty() {
            println!("  {:<16}   aliases: {}", "", info.aliases.join(", "));
        }
    }
}
