//! Save-type enumeration shared between the resolver, the database and the
//! legacy-mode driver.

use crate::rom_format::EEPROM_LARGE_ROM_THRESHOLD;

/// Persistent-storage chip the legacy core must emulate.
///
/// The discriminants are the on-disk values stored in the low 4 bits of a
/// database record's attribute word, so the order is fixed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveType {
    /// EEPROM 4k/8k.
    Eeprom8k = 0,
    /// EEPROM 4k/8k on a cartridge larger than 16 MiB.
    Eeprom8kLarge = 1,
    Eeprom64k = 2,
    Eeprom64kLarge = 3,
    Flash512kAmlRtc = 4,
    Flash512kAml = 5,
    Flash512kSstRtc = 6,
    Flash512kSst = 7,
    Flash512kPscRtc = 8,
    Flash512kPsc = 9,
    Flash1mMrxRtc = 10,
    Flash1mMrx = 11,
    Flash1mSnoRtc = 12,
    Flash1mSno = 13,
    Sram256k = 14,
    None = 15,
}

/// Error returned when a raw value is not a known save type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid save type {0} (must be 0-15)")]
pub struct InvalidSaveType(pub u8);

impl SaveType {
    /// All save types in discriminant order.
    pub const ALL: [SaveType; 16] = [
        SaveType::Eeprom8k,
        SaveType::Eeprom8kLarge,
        SaveType::Eeprom64k,
        SaveType::Eeprom64kLarge,
        SaveType::Flash512kAmlRtc,
        SaveType::Flash512kAml,
        SaveType::Flash512kSstRtc,
        SaveType::Flash512kSst,
        SaveType::Flash512kPscRtc,
        SaveType::Flash512kPsc,
        SaveType::Flash1mMrxRtc,
        SaveType::Flash1mMrx,
        SaveType::Flash1mSnoRtc,
        SaveType::Flash1mSno,
        SaveType::Sram256k,
        SaveType::None,
    ];

    /// Raw 4-bit value.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode the low 4 bits of a database attribute word.
    pub const fn from_attr(attr: u32) -> Self {
        Self::ALL[(attr & 0xF) as usize]
    }

    /// Apply the large-cartridge EEPROM adjustment.
    ///
    /// EEPROM addressing changes once the cartridge exceeds 16 MiB, so the two
    /// base EEPROM variants become their large counterparts. Every other type
    /// is returned unchanged.
    pub const fn for_rom_size(self, padded_size: usize) -> Self {
        if padded_size <= EEPROM_LARGE_ROM_THRESHOLD {
            return self;
        }
        match self {
            SaveType::Eeprom8k => SaveType::Eeprom8kLarge,
            SaveType::Eeprom64k => SaveType::Eeprom64kLarge,
            other => other,
        }
    }

    /// Short human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            SaveType::Eeprom8k => "EEPROM 4k/8k",
            SaveType::Eeprom8kLarge => "EEPROM 4k/8k (>16 MiB ROM)",
            SaveType::Eeprom64k => "EEPROM 64k",
            SaveType::Eeprom64kLarge => "EEPROM 64k (>16 MiB ROM)",
            SaveType::Flash512kAmlRtc => "Flash 512k Atmel + RTC",
            SaveType::Flash512kAml => "Flash 512k Atmel",
            SaveType::Flash512kSstRtc => "Flash 512k SST + RTC",
            SaveType::Flash512kSst => "Flash 512k SST",
            SaveType::Flash512kPscRtc => "Flash 512k Panasonic + RTC",
            SaveType::Flash512kPsc => "Flash 512k Panasonic",
            SaveType::Flash1mMrxRtc => "Flash 1m Macronix + RTC",
            SaveType::Flash1mMrx => "Flash 1m Macronix",
            SaveType::Flash1mSnoRtc => "Flash 1m Sanyo + RTC",
            SaveType::Flash1mSno => "Flash 1m Sanyo",
            SaveType::Sram256k => "SRAM 256k",
            SaveType::None => "none",
        }
    }
}

impl TryFrom<u8> for SaveType {
    type Error = InvalidSaveType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(InvalidSaveType(value))
    }
}

impl std::fmt::Display for SaveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}
