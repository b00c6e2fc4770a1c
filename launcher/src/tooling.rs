//! Operator tooling: offline detection and database checks.

use std::fs;
use std::path::Path;

use agbmode_core::rom::{RomWindow, load_rom};
use agbmode_core::save::{SaveTypeDecision, resolve_automatic};
use agbmode_core::{GameDb, TitleCode};
use agbmode_shared::{GAME_DB_RECORD_SIZE, content_hash, hash_key};
use anyhow::{Context, Result, bail};

/// What the automatic path decides for one ROM file.
#[derive(Debug)]
pub struct Detection {
    pub title: TitleCode,
    pub raw_size: usize,
    pub padded_size: usize,
    pub decision: SaveTypeDecision,
    /// Database key of the padded image.
    pub key: u64,
}

pub fn detect(rom_path: &Path) -> Result<Detection> {
    let rom = load_rom(rom_path, RomWindow::allocate()?)
        .with_context(|| format!("Failed to load {}", rom_path.display()))?;
    Ok(Detection {
        title: rom.title_code(),
        raw_size: rom.raw_size(),
        padded_size: rom.padded_size(),
        decision: resolve_automatic(&rom),
        key: hash_key(&content_hash(rom.cartridge())),
    })
}

#[derive(Debug, PartialEq, Eq)]
pub struct DbReport {
    pub records: u64,
    /// First record out of ascending key order.
    pub first_unsorted: Option<u64>,
}

/// Check record alignment and sort order of a database file.
pub fn db_check(db_path: &Path) -> Result<DbReport> {
    let len = fs::metadata(db_path)
        .with_context(|| format!("Failed to read {}", db_path.display()))?
        .len();
    if len % GAME_DB_RECORD_SIZE as u64 != 0 {
        bail!(
            "{} is {} bytes, not a multiple of the {}-byte record size",
            db_path.display(),
            len,
            GAME_DB_RECORD_SIZE
        );
    }

    let mut db = GameDb::open(db_path)?;
    let first_unsorted = db.first_unsorted()?;
    Ok(DbReport {
        records: db.record_count(),
        first_unsorted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agbmode_core::{DecisionOrigin, SaveType};
    use agbmode_shared::GameDbRecord;

    fn write_db(path: &Path, keys: &[u8]) {
        let records: Vec<GameDbRecord> = keys
            .iter()
            .map(|&k| {
                let mut sha1 = [0u8; 20];
                sha1[0] = k;
                GameDbRecord::new("Game", *b"AAAE", sha1, SaveType::Sram256k.as_u8() as u32)
            })
            .collect();
        fs::write(path, bytemuck::cast_slice::<GameDbRecord, u8>(&records)).unwrap();
    }

    #[test]
    fn sorted_db_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gba_db.bin");
        write_db(&path, &[1, 2, 2, 9]);
        assert_eq!(
            db_check(&path).unwrap(),
            DbReport {
                records: 4,
                first_unsorted: None
            }
        );
    }

    #[test]
    fn unsorted_record_is_located() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gba_db.bin");
        write_db(&path, &[1, 5, 3, 9]);
        assert_eq!(db_check(&path).unwrap().first_unsorted, Some(2));
    }

    #[test]
    fn truncated_db_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gba_db.bin");
        fs::write(&path, vec![0u8; GAME_DB_RECORD_SIZE + 1]).unwrap();
        assert!(db_check(&path).is_err());
    }

    #[test]
    fn detect_reports_heuristic_decision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.gba");
        let mut rom = vec![0u8; 0x800];
        rom[0xAC..0xB0].copy_from_slice(b"BXYE");
        rom[0x300..0x30B].copy_from_slice(b"EEPROM_V122");
        fs::write(&path, &rom).unwrap();

        let detection = detect(&path).unwrap();
        assert_eq!(detection.title, TitleCode(*b"BXYE"));
        assert_eq!(detection.raw_size, 0x800);
        assert_eq!(detection.padded_size, 0x10_0000);
        assert_eq!(detection.decision.save_type, SaveType::Eeprom8k);
        assert_eq!(detection.decision.origin, DecisionOrigin::Heuristic);
    }
}
