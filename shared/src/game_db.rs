//! Save database record layout (`gba_db.bin`).
//!
//! The database is a flat array of [`GameDbRecord`]s with no header, sorted
//! ascending by [`GameDbRecord::key`]. Records are plain bytes so they can be
//! read and written with `bytemuck` without any parsing step.

use bytemuck::{Pod, Zeroable};

use crate::SaveType;
use crate::hash::{Sha1Digest, hash_key};

/// Database file name inside the work directory.
pub const GAME_DB_FILE: &str = "gba_db.bin";

/// Size of one record on disk.
pub const GAME_DB_RECORD_SIZE: usize = std::mem::size_of::<GameDbRecord>();

/// Offset of the attribute word inside a record.
pub const GAME_DB_ATTR_OFFSET: usize = std::mem::offset_of!(GameDbRecord, attr);

/// Bit position of the log2 ROM size inside the attribute word.
pub const ATTR_ROM_SIZE_SHIFT: u32 = 27;

/// One database entry.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct GameDbRecord {
    /// NUL-padded display name.
    pub name: [u8; 200],
    pub title_code: [u8; 4],
    /// SHA-1 of the padded ROM image.
    pub sha1: Sha1Digest,
    /// Little-endian attribute word: save type in bits 0..4,
    /// log2 of the ROM size from bit 27.
    pub attr: [u8; 4],
}

// Layout is part of the file format.
const _: () = assert!(GAME_DB_RECORD_SIZE == 228);
const _: () = assert!(GAME_DB_ATTR_OFFSET == 224);

impl GameDbRecord {
    /// Build a record. Mostly useful for tooling and tests.
    pub fn new(name: &str, title_code: [u8; 4], sha1: Sha1Digest, attr: u32) -> Self {
        let mut record = Self::zeroed();
        let len = name.len().min(record.name.len());
        record.name[..len].copy_from_slice(&name.as_bytes()[..len]);
        record.title_code = title_code;
        record.sha1 = sha1;
        record.attr = attr.to_le_bytes();
        record
    }

    /// Sort/search key: first 64 bits of the hash.
    pub fn key(&self) -> u64 {
        hash_key(&self.sha1)
    }

    pub fn attr(&self) -> u32 {
        u32::from_le_bytes(self.attr)
    }

    pub fn save_type(&self) -> SaveType {
        SaveType::from_attr(self.attr())
    }

    /// Display name up to the first NUL.
    pub fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

impl std::fmt::Debug for GameDbRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameDbRecord")
            .field("name", &self.name())
            .field("title_code", &crate::TitleCode(self.title_code))
            .field("sha1", &hex::encode(self.sha1))
            .field("attr", &format_args!("{:#010x}", self.attr()))
            .finish()
    }
}

/// Attribute word written back by the calibrator.
pub fn make_attr(save_type: SaveType, padded_size: usize) -> u32 {
    (padded_size.max(1).ilog2() << ATTR_ROM_SIZE_SHIFT) | save_type.as_u8() as u32
}
