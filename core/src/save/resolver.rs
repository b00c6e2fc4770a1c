//! Save-type resolution policy.
//!
//! Normal launches use the override table and then the signature scan. The
//! save database and its calibrator are operator tooling for curating the
//! database and only run when [`ResolveMode::Calibration`] is selected.

use std::path::Path;

use agbmode_shared::{SaveType, TitleCode};
use tracing::{debug, info};

use super::calibrator::{CalibrationIo, run_calibrator};
use super::overrides::save_override;
use super::scanner::detect_sdk_save_type;
use crate::rom::RomImage;

/// Which resolution strategy a launch uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Override table, then signature scan.
    #[default]
    Automatic,
    /// Automatic guess, database lookup and interactive correction.
    Calibration,
}

/// Where a save type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOrigin {
    Override,
    Heuristic,
    Database,
    Manual,
    /// Calibration failed; the safe default was used.
    Fallback,
}

/// Save type chosen for one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTypeDecision {
    pub save_type: SaveType,
    pub origin: DecisionOrigin,
}

impl SaveTypeDecision {
    pub const fn new(save_type: SaveType, origin: DecisionOrigin) -> Self {
        Self { save_type, origin }
    }
}

/// Override table, then signature scan, over a raw cartridge image.
pub fn resolve_image(rom: &[u8], padded_size: usize) -> SaveTypeDecision {
    let code = TitleCode::from_rom(rom).unwrap_or_default();
    if let Some(save_type) = save_override(code) {
        debug!(
            "Game code {} in override list. Using save type {}.",
            code, save_type
        );
        return SaveTypeDecision::new(save_type, DecisionOrigin::Override);
    }

    SaveTypeDecision::new(
        detect_sdk_save_type(rom, padded_size),
        DecisionOrigin::Heuristic,
    )
}

/// Default resolution for a loaded image.
pub fn resolve_automatic(rom: &RomImage) -> SaveTypeDecision {
    resolve_image(rom.window(), rom.padded_size())
}

/// Resolve the save type for `rom` using `mode`.
///
/// `db_path` and `io` are only used in calibration mode.
pub fn resolve(
    mode: ResolveMode,
    rom: &RomImage,
    db_path: &Path,
    save_path: &Path,
    io: CalibrationIo<'_>,
) -> SaveTypeDecision {
    let decision = match mode {
        ResolveMode::Automatic => resolve_automatic(rom),
        ResolveMode::Calibration => run_calibrator(rom, db_path, save_path, io),
    };
    info!(
        "Save type: {} (from {:?})",
        decision.save_type, decision.origin
    );
    decision
}
