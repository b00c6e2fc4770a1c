//! Heuristic save-type detection.
//!
//! Commercial titles link one of the official save libraries, which embed a
//! version string such as `FLASH1M_V103`. Finding that string identifies the
//! save chip the cartridge was built for.

use agbmode_shared::{HEADER_SIZE, SaveType};
use tracing::debug;

/// Markers that start every library version string.
const MARKERS: [&[u8; 4]; 3] = [b"EEPR", b"FLAS", b"SRAM"];

/// Known library version strings, checked in order.
pub const SDK_SAVE_STRINGS: [(&str, SaveType); 25] = [
    // EEPROM
    ("EEPROM_V111", SaveType::Eeprom8k), // 4k parts, same protocol.
    ("EEPROM_V120", SaveType::Eeprom8k),
    ("EEPROM_V121", SaveType::Eeprom64k),
    ("EEPROM_V122", SaveType::Eeprom8k),
    ("EEPROM_V124", SaveType::Eeprom64k),
    ("EEPROM_V125", SaveType::Eeprom8k),
    ("EEPROM_V126", SaveType::Eeprom8k),
    // Flash. RTC is assumed for all of them.
    ("FLASH_V120", SaveType::Flash512kPscRtc),
    ("FLASH_V121", SaveType::Flash512kPscRtc),
    ("FLASH_V123", SaveType::Flash512kPscRtc),
    ("FLASH_V124", SaveType::Flash512kPscRtc),
    ("FLASH_V125", SaveType::Flash512kPscRtc),
    ("FLASH_V126", SaveType::Flash512kPscRtc),
    ("FLASH512_V130", SaveType::Flash512kPscRtc),
    ("FLASH512_V131", SaveType::Flash512kPscRtc),
    ("FLASH512_V133", SaveType::Flash512kPscRtc),
    ("FLASH1M_V102", SaveType::Flash1mMrxRtc),
    ("FLASH1M_V103", SaveType::Flash1mMrxRtc),
    // FRAM & SRAM
    ("SRAM_F_V100", SaveType::Sram256k),
    ("SRAM_F_V102", SaveType::Sram256k),
    ("SRAM_F_V103", SaveType::Sram256k),
    ("SRAM_V110", SaveType::Sram256k),
    ("SRAM_V111", SaveType::Sram256k),
    ("SRAM_V112", SaveType::Sram256k),
    ("SRAM_V113", SaveType::Sram256k),
];

/// Scan the cartridge for a save library version string.
///
/// `rom` is the cartridge image; only the first `padded_size` bytes after the
/// header are scanned, word-aligned. The first hit wins. EEPROM results are
/// adjusted for cartridges above 16 MiB. Returns [`SaveType::None`] when no
/// library string is present.
pub fn detect_sdk_save_type(rom: &[u8], padded_size: usize) -> SaveType {
    let end = padded_size.min(rom.len());
    let mut offset = HEADER_SIZE;

    while offset + 4 <= end {
        let word = &rom[offset..offset + 4];
        if MARKERS.iter().any(|m| word == m.as_slice()) {
            let tail = &rom[offset..end];
            if let Some(&(name, save_type)) = SDK_SAVE_STRINGS
                .iter()
                .find(|(name, _)| tail.starts_with(name.as_bytes()))
            {
                debug!("Detected SDK save type '{}' at {:#x}", name, offset);
                return save_type.for_rom_size(padded_size);
            }
        }
        offset += 4;
    }

    SaveType::None
}
