//! Cartridge ROM layout constants.
//!
//! Single source of truth for the ROM window geometry and the cartridge
//! header fields the launcher reads.
//!
//! # Example
//!
//! ```
//! use agbmode_shared::rom_format::{MAX_ROM_SIZE, MIN_ROM_SIZE, padded_rom_size};
//!
//! assert_eq!(padded_rom_size(0x18_0000), 0x20_0000);
//! assert_eq!(padded_rom_size(1), MIN_ROM_SIZE);
//! assert_eq!(padded_rom_size(MAX_ROM_SIZE), MAX_ROM_SIZE);
//! ```

/// Physical address the ROM window is mapped at.
///
/// The open-bus pattern is derived from this address, so it must match the
/// address the legacy core sees.
pub const ROM_WINDOW_BASE: u32 = 0x2000_0000;

/// Size of the ROM window (largest retail cartridge, 256 Mbit).
pub const MAX_ROM_SIZE: usize = 0x200_0000;

/// Smallest retail ROM chip (8 Mbit).
pub const MIN_ROM_SIZE: usize = 0x10_0000;

/// Cartridges above this size address EEPROM differently.
pub const EEPROM_LARGE_ROM_THRESHOLD: usize = 0x100_0000;

/// Offset of the 4-byte title code in the cartridge header.
pub const TITLE_CODE_OFFSET: usize = 0xAC;

/// Size of the cartridge header area skipped by the save signature scan.
pub const HEADER_SIZE: usize = 0xE4;

/// Emulated cartridge size for `raw_size` bytes of image data.
///
/// Next power of two, never below [`MIN_ROM_SIZE`].
pub const fn padded_rom_size(raw_size: usize) -> usize {
    let size = raw_size.next_power_of_two();
    if size < MIN_ROM_SIZE { MIN_ROM_SIZE } else { size }
}

/// 4-byte game identifier from the cartridge header.
///
/// The last byte is the region; the first byte identifies the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TitleCode(pub [u8; 4]);

impl TitleCode {
    /// Read the title code out of a cartridge image.
    ///
    /// Returns `None` if the image is too short to contain a header.
    pub fn from_rom(rom: &[u8]) -> Option<Self> {
        let bytes = rom.get(TITLE_CODE_OFFSET..TITLE_CODE_OFFSET + 4)?;
        Some(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Title code without the region byte.
    pub fn without_region(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// First character of the code (series marker).
    pub fn series(&self) -> u8 {
        self.0[0]
    }
}

impl std::fmt::Display for TitleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02X}")?;
            }
        }
        Ok(())
    }
}
