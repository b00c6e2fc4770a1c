//! Error taxonomy for the launch pipeline.

use std::io;

use thiserror::Error;

/// Errors surfaced to the launch sequence.
///
/// Storage and database errors abort the launch. Configuration problems never
/// reach this type; they fall back to defaults.
#[derive(Debug, Error)]
pub enum Error {
    /// Open/read/write/seek failure.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// Missing file, directory or database entry.
    #[error("not found: {0}")]
    NotFound(String),

    /// A scratch buffer or the ROM window could not be allocated.
    #[error("out of memory")]
    OutOfMemory,

    /// The ROM image does not fit the cartridge window.
    #[error("ROM too big: {size} bytes (max {max})")]
    RomTooBig { size: u64, max: u64 },

    /// The operator backed out of file selection.
    #[error("no path selected")]
    NoPathSelected,

    /// A calibrator write targeted a record outside the database.
    #[error("database record {index} out of range ({count} records)")]
    RecordOutOfRange { index: u64, count: u64 },
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(e.to_string()),
            io::ErrorKind::OutOfMemory => Error::OutOfMemory,
            _ => Error::Io(e),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
