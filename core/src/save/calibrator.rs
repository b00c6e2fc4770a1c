//! Interactive save-type calibration.
//!
//! Operator tool for curating the save database: shows the database entry
//! and the automatic guess for the loaded title, lets the operator pick one
//! of eight coarse save types and writes the choice back to the matching
//! database record.
//!
//! The coarse buttons and the precise save types are mapped by two separate
//! tables. [`BUTTON_FOR_SAVE_TYPE`] collapses several precise types onto one
//! button, so going type -> button -> type is lossy.

use std::fs;
use std::path::Path;

use agbmode_shared::{SaveType, content_hash, hash_key, make_attr};
use tracing::{info, warn};

use super::database::{DbMatch, GameDb};
use super::resolver::{DecisionOrigin, SaveTypeDecision, resolve_automatic};
use crate::error::{Error, Result};
use crate::hal::{Console, Input, Keys, Lcd};
use crate::rom::RomImage;

/// Number of coarse choices.
pub const BUTTON_COUNT: usize = 8;

/// Screen row of the first button.
const FIRST_BUTTON_ROW: u16 = 4;

/// Save type each button selects (before the large-cartridge adjustment).
pub const SAVE_TYPE_FOR_BUTTON: [SaveType; BUTTON_COUNT] = [
    SaveType::Eeprom8k,
    SaveType::Eeprom64k,
    SaveType::Flash512kPscRtc,
    SaveType::Flash512kPsc,
    SaveType::Flash1mMrxRtc,
    SaveType::Flash1mMrx,
    SaveType::Sram256k,
    SaveType::None,
];

/// Initial cursor position for each precise save type.
pub const BUTTON_FOR_SAVE_TYPE: [u8; 16] = [0, 0, 1, 1, 2, 3, 2, 3, 2, 3, 4, 5, 4, 5, 6, 7];

const BUTTON_LABELS: [&str; BUTTON_COUNT] = [
    " EEPROM 4k/8k (0, 1)",
    " EEPROM 64k (2, 3)",
    " Flash 512k RTC (4, 6, 8)",
    " Flash 512k (5, 7, 9)",
    " Flash 1m RTC (10, 12)",
    " Flash 1m (11, 13)",
    " SRAM 256k (14)",
    " None (15)",
];

const HINTS: &str = "Please note:\n\
- Auto detection is broken for EEPROM save types.\n\
- Choose the lowest size save type first and work your way up until the game fully works.\n\
- If the game works with a Flash save type try without RTC first.\n\
- Delete the save before you try a new save type.\n\
- Make sure all your dumps are verified good dumps (no-intro.org)!\n";

/// Result of feeding one key press to the calibrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibratorAction {
    /// Cursor moved between buttons.
    Moved { from: usize, to: usize },
    /// Delete the existing save file.
    DeleteSave,
    /// Accept the button under the cursor.
    Confirm,
    /// Leave without changes.
    Abort,
    Ignored,
}

/// Cursor state of the calibrator screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibrator {
    cursor: usize,
}

impl Calibrator {
    /// Start with the cursor on the button covering `initial`.
    pub fn new(initial: SaveType) -> Self {
        Self {
            cursor: BUTTON_FOR_SAVE_TYPE[initial.as_u8() as usize] as usize,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply newly pressed keys. Power wins over everything else, then the
    /// first applicable of up, down, delete and confirm.
    pub fn handle(&mut self, keys: Keys) -> CalibratorAction {
        let from = self.cursor;
        if keys.intersects(Keys::POWER | Keys::POWER_HELD) {
            CalibratorAction::Abort
        } else if keys.contains(Keys::DUP) && from > 0 {
            self.cursor -= 1;
            CalibratorAction::Moved {
                from,
                to: self.cursor,
            }
        } else if keys.contains(Keys::DDOWN) && from < BUTTON_COUNT - 1 {
            self.cursor += 1;
            CalibratorAction::Moved {
                from,
                to: self.cursor,
            }
        } else if keys.contains(Keys::X) {
            CalibratorAction::DeleteSave
        } else if keys.contains(Keys::A) {
            CalibratorAction::Confirm
        } else {
            CalibratorAction::Ignored
        }
    }

    /// Save type for the current button, adjusted for the cartridge size.
    pub fn selection(&self, padded_size: usize) -> SaveType {
        SAVE_TYPE_FOR_BUTTON[self.cursor].for_rom_size(padded_size)
    }
}

/// Devices the calibrator screen runs on.
pub struct CalibrationIo<'a> {
    pub console: &'a mut dyn Console,
    pub input: &'a mut dyn Input,
    pub lcd: &'a mut dyn Lcd,
}

impl CalibrationIo<'_> {
    fn draw_cursor(&mut self, old: usize, new: usize) {
        self.console.set_cursor(FIRST_BUTTON_ROW + old as u16, 0);
        self.console.print(" ");
        self.console.set_cursor(FIRST_BUTTON_ROW + new as u16, 0);
        self.console.print(">");
    }

    /// Block until some key is pressed, one poll per vblank.
    fn wait_for_keys(&mut self) -> Keys {
        loop {
            self.lcd.wait_for_vblank();
            self.input.scan();
            let keys = self.input.keys_down();
            if !keys.is_empty() {
                return keys;
            }
        }
    }
}

/// Run the calibration flow for `rom`.
///
/// Never fails: database problems are shown on the console and resolve to
/// [`SaveType::None`] with [`DecisionOrigin::Fallback`].
pub fn run_calibrator(
    rom: &RomImage,
    db_path: &Path,
    save_path: &Path,
    mut io: CalibrationIo<'_>,
) -> SaveTypeDecision {
    let save_exists = fs::metadata(save_path).is_ok();
    let auto = resolve_automatic(rom).save_type;

    let key = hash_key(&content_hash(rom.cartridge()));
    let hit = match GameDb::open(db_path).and_then(|mut db| db.search(key)) {
        Ok(hit) => hit,
        Err(e) => {
            warn!("Game db lookup failed: {}", e);
            io.console
                .print("Could not access the game db! Press the power button twice.\n");
            io.console.report_error(&e);
            return SaveTypeDecision::new(SaveType::None, DecisionOrigin::Fallback);
        }
    };
    let db_type = hit.record.save_type();
    info!("Game db entry {}: {:?}", hit.index, hit.record);

    draw_screen(io.console, save_exists, db_type, auto);

    let mut calibrator = Calibrator::new(db_type);
    io.draw_cursor(0, calibrator.cursor());
    loop {
        let keys = io.wait_for_keys();
        match calibrator.handle(keys) {
            CalibratorAction::Moved { from, to } => io.draw_cursor(from, to),
            CalibratorAction::DeleteSave => {
                if let Err(e) = fs::remove_file(save_path) {
                    warn!("Could not delete {}: {}", save_path.display(), e);
                }
                io.console.set_cursor(0, 33);
                io.console.print("deleted  ");
            }
            CalibratorAction::Confirm => break,
            CalibratorAction::Abort => {
                return SaveTypeDecision::new(db_type, DecisionOrigin::Database);
            }
            CalibratorAction::Ignored => {}
        }
    }

    let chosen = calibrator.selection(rom.padded_size());
    if chosen != db_type {
        if let Err(e) = store_correction(db_path, &hit, chosen, rom.padded_size()) {
            warn!("Could not update game db: {}", e);
            let message = match e {
                Error::RecordOutOfRange { .. } => "Db position out of range!\n",
                _ => "Could not open db for write!\n",
            };
            io.console.print(message);
            return SaveTypeDecision::new(SaveType::None, DecisionOrigin::Fallback);
        }
        info!("Game db entry {} corrected to {}", hit.index, chosen);
    }

    SaveTypeDecision::new(chosen, DecisionOrigin::Manual)
}

fn store_correction(db_path: &Path, hit: &DbMatch, chosen: SaveType, padded_size: usize) -> Result<()> {
    let mut db = GameDb::open_writable(db_path)?;
    db.write_attr(hit.index, make_attr(chosen, padded_size))
}

fn draw_screen(console: &mut dyn Console, save_exists: bool, db_type: SaveType, auto: SaveType) {
    console.clear();
    let mut text = format!(
        "Save file (Press (X) to delete): {}\n\
         Save type (from db): {}\n\
         Save type (auto detect): {}\n\n",
        if save_exists { "found" } else { "not found" },
        db_type.as_u8(),
        auto.as_u8()
    );
    for label in BUTTON_LABELS {
        text.push_str(label);
        text.push('\n');
    }
    text.push_str("\n\n");
    text.push_str(HINTS);
    console.print(&text);
}
