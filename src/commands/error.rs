//! Command errors

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the CLI commands themselves
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Range 0x{offset:X}+0x{len:X} does not fit in the 0x{size:X}-byte flash")]
    OutOfRange { offset: u32, len: usize, size: u32 },

    #[error("Either --firm or --firm-len is required")]
    MissingFirm,
}
