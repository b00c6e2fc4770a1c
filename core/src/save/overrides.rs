//! Titles whose save type the signature scan gets wrong.

use agbmode_shared::{SaveType, TitleCode};

/// Series marker of the Classic NES Series re-releases.
const CLASSIC_NES_SERIES: u8 = b'F';

/// Title codes (region stripped) with a known save type.
pub const SAVE_OVERRIDES: [([u8; 3], SaveType); 5] = [
    (*b"\0\0\0", SaveType::Sram256k),  // Homebrew.
    (*b"GMB", SaveType::Sram256k),     // Goomba Color (homebrew).
    (*b"AA2", SaveType::Eeprom64k),    // Super Mario Advance 2.
    (*b"A3A", SaveType::Eeprom64k),    // Super Mario Advance 3.
    (*b"AZL", SaveType::Eeprom64k),    // Zelda: A Link to the Past & Four Swords.
];

/// Look up a fixed save type for `code`.
///
/// Classic NES Series carts always use the small EEPROM. Other titles match on
/// the code without its region byte.
pub fn save_override(code: TitleCode) -> Option<SaveType> {
    if code.series() == CLASSIC_NES_SERIES {
        return Some(SaveType::Eeprom8k);
    }

    let key = code.without_region();
    SAVE_OVERRIDES
        .iter()
        .find(|(prefix, _)| *prefix == key)
        .map(|&(_, save_type)| save_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_byte_is_ignored() {
        for region in [b'E', b'J', b'P'] {
            let code = TitleCode([b'A', b'A', b'2', region]);
            assert_eq!(save_override(code), Some(SaveType::Eeprom64k));
        }
    }

    #[test]
    fn classic_nes_series_uses_small_eeprom() {
        assert_eq!(
            save_override(TitleCode(*b"FSMJ")),
            Some(SaveType::Eeprom8k)
        );
        assert_eq!(
            save_override(TitleCode(*b"FZLE")),
            Some(SaveType::Eeprom8k)
        );
    }

    #[test]
    fn homebrew_without_code_gets_sram() {
        assert_eq!(save_override(TitleCode([0; 4])), Some(SaveType::Sram256k));
        assert_eq!(
            save_override(TitleCode(*b"GMB\0")),
            Some(SaveType::Sram256k)
        );
    }

    #[test]
    fn unknown_titles_have_no_override() {
        assert_eq!(save_override(TitleCode(*b"BPEE")), None);
        assert_eq!(save_override(TitleCode(*b"AA3E")), None);
    }
}
