//! cartflash - Flashcart NOR programmer and ntrboot injector
//!
//! Reads, writes and injects ntrboot (a Blowfish key plus a FIRM boot image)
//! into the NOR flash of DS flashcarts.
//!
//! # Architecture
//!
//! Every cart family implements the `Flashcart` trait from `cartflash-core`
//! on top of a `CartBus`. The CLI opens carts by name through
//! `cartflash-flash` and only ever sees a `CartHandle`, so the same commands
//! work for page-programmed and byte-programmed carts.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, DeviceArgs};
use cartflash_flash::{open_device, CartHandle};

fn open(args: &DeviceArgs) -> Result<CartHandle, Box<dyn std::error::Error>> {
    Ok(open_device(&args.device, args.image.as_deref())?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = match cli.command {
        Commands::ListDevices => {
            commands::list_devices();
            Ok(())
        }
        Commands::Probe { device } => {
            let handle = open(&device)?;
            commands::run_probe(&handle)
        }
        Commands::Read {
            device,
            output,
            offset,
            length,
        } => {
            let mut handle = open(&device)?;
            commands::run_read(&mut handle, &output, offset, length)
        }
        Commands::Write {
            device,
            input,
            offset,
        } => {
            let mut handle = open(&device)?;
            commands::run_write(&mut handle, &input, offset)
        }
        Commands::Inject { device, key, firm } => {
            let mut handle = open(&device)?;
            commands::run_inject(&mut handle, &key, &firm)
        }
        Commands::Layout {
            device,
            firm,
            firm_len,
            output,
        } => {
            let handle = open(&device)?;
            commands::run_layout(&handle, firm.as_deref(), firm_len, output.as_deref())
        }
    };

    result
}
