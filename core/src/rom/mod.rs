//! Cartridge ROM window and loading.
//!
//! The legacy core sees cartridge space as one fixed 32 MiB window. A
//! [`RomWindow`] owns that buffer; a [`RomImage`] is a window that has been
//! filled and padded for one title. The image is handed to the legacy driver
//! by value at mode handoff, so nothing else can write to it afterwards.

mod loader;
mod padding;

pub use loader::{LOAD_CHUNK_SIZE, load_rom, load_rom_from_reader};
pub use padding::{ERASED_BYTE, fix_rom_padding, open_bus_seed};

use agbmode_shared::{MAX_ROM_SIZE, ROM_WINDOW_BASE, TitleCode};

use crate::error::{Error, Result};

/// Fixed-size cartridge address window.
pub struct RomWindow {
    bytes: Box<[u8]>,
    base: u32,
}

impl RomWindow {
    /// Allocate a zeroed window mapped at [`ROM_WINDOW_BASE`].
    pub fn allocate() -> Result<Self> {
        Self::allocate_at(ROM_WINDOW_BASE)
    }

    /// Allocate a zeroed window mapped at `base`.
    pub fn allocate_at(base: u32) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(MAX_ROM_SIZE)
            .map_err(|_| Error::OutOfMemory)?;
        bytes.resize(MAX_ROM_SIZE, 0);
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
            base,
        })
    }

    /// Bus address of the first byte.
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl std::fmt::Debug for RomWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RomWindow")
            .field("base", &format_args!("{:#010x}", self.base))
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A loaded and padded cartridge image.
#[derive(Debug)]
pub struct RomImage {
    window: RomWindow,
    raw_size: usize,
    padded_size: usize,
}

impl RomImage {
    /// Pad `window` after `raw_size` bytes have been written into it.
    pub fn from_window(mut window: RomWindow, raw_size: usize) -> Self {
        let base = window.base();
        let padded_size = fix_rom_padding(window.as_mut_slice(), raw_size, base);
        Self {
            window,
            raw_size,
            padded_size,
        }
    }

    /// Copy `data` into a fresh window and pad it.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() > MAX_ROM_SIZE {
            return Err(Error::RomTooBig {
                size: data.len() as u64,
                max: MAX_ROM_SIZE as u64,
            });
        }
        let mut window = RomWindow::allocate()?;
        window.as_mut_slice()[..data.len()].copy_from_slice(data);
        Ok(Self::from_window(window, data.len()))
    }

    /// Bytes actually read from the file.
    pub fn raw_size(&self) -> usize {
        self.raw_size
    }

    /// Emulated cartridge size (power of two, at least 1 MiB).
    pub fn padded_size(&self) -> usize {
        self.padded_size
    }

    /// The emulated cartridge: `[0, padded_size)`.
    pub fn cartridge(&self) -> &[u8] {
        &self.window.as_slice()[..self.padded_size]
    }

    /// The whole 32 MiB window including open-bus or mirror fill.
    pub fn window(&self) -> &[u8] {
        self.window.as_slice()
    }

    pub fn title_code(&self) -> TitleCode {
        TitleCode::from_rom(self.window.as_slice()).unwrap_or_default()
    }

    /// Give the window back for reuse by the next launch.
    pub fn into_window(self) -> RomWindow {
        self.window
    }
}
