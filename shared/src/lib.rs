//! Shared types for the GBA compatibility-mode launcher.
//!
//! Everything here is plain data with no hardware access, so it can be used
//! by the pipeline core, the launcher binary and offline database tooling.

pub mod game_db;
pub mod hash;
pub mod rom_format;
pub mod save_type;

pub use game_db::{
    GAME_DB_ATTR_OFFSET, GAME_DB_FILE, GAME_DB_RECORD_SIZE, GameDbRecord, make_attr,
};
pub use hash::{Sha1Digest, content_hash, hash_key};
pub use rom_format::{
    EEPROM_LARGE_ROM_THRESHOLD, HEADER_SIZE, MAX_ROM_SIZE, MIN_ROM_SIZE, ROM_WINDOW_BASE,
    TITLE_CODE_OFFSET, TitleCode, padded_rom_size,
};
pub use save_type::{InvalidSaveType, SaveType};
