//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the device argument
fn device_help() -> String {
    format!(
        "Cart to use, as name[:key=value,...] [available: {}]",
        cartflash_flash::device_names_short()
    )
}

#[derive(Parser)]
#[command(name = "cartflash")]
#[command(author, version, about = "Flashcart NOR programmer and ntrboot injector", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Cart selection shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Cart to use
    #[arg(short, long, help = device_help())]
    pub device: String,

    /// Flash image backing the emulated cart (created blank if missing)
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List supported carts
    ListDevices,

    /// Detect the cart and show its details
    Probe {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Read flash contents to file
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        offset: u32,

        /// Number of bytes to read (default: to the end of flash)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Write file to flash
    Write {
        #[command(flatten)]
        device: DeviceArgs,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Start address
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        offset: u32,
    },

    /// Inject a Blowfish key and a FIRM boot image
    Inject {
        #[command(flatten)]
        device: DeviceArgs,

        /// Blowfish key (0x1048 bytes)
        #[arg(short, long)]
        key: PathBuf,

        /// FIRM boot image
        #[arg(short, long)]
        firm: PathBuf,
    },

    /// Show where an injection would write
    Layout {
        #[command(flatten)]
        device: DeviceArgs,

        /// FIRM boot image to size the layout for
        #[arg(short, long, conflicts_with = "firm_len")]
        firm: Option<PathBuf>,

        /// FIRM length instead of a file
        #[arg(long, value_parser = parse_hex_u32)]
        firm_len: Option<u32>,

        /// Write the layout as TOML to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x1000"), Ok(0x1000));
        assert_eq!(parse_hex_u32("0X1f"), Ok(0x1F));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
    }

    #[test]
    fn test_parse_inject() {
        let cli = Cli::try_parse_from([
            "cartflash", "-v", "inject", "-d", "r4isdhc:legacy=1", "--image", "cart.bin", "-k",
            "key.bin", "-f", "firm.bin",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Inject { device, key, .. } => {
                assert_eq!(device.device, "r4isdhc:legacy=1");
                assert_eq!(device.image, Some(PathBuf::from("cart.bin")));
                assert_eq!(key, PathBuf::from("key.bin"));
            }
            _ => panic!("expected inject"),
        }
    }

    #[test]
    fn test_layout_firm_conflict() {
        assert!(Cli::try_parse_from([
            "cartflash", "layout", "-d", "r4isdhc", "-f", "firm.bin", "--firm-len", "0x400",
        ])
        .is_err());
    }
}
