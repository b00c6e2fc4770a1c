//! Save-type resolution.
//!
//! The legacy core needs to know which save chip a cartridge carried. The
//! answer comes from a small override table, a scan for SDK library strings,
//! or, in calibration mode, from the curated save database.

mod calibrator;
mod database;
mod overrides;
mod resolver;
mod scanner;

pub use calibrator::{
    BUTTON_COUNT, BUTTON_FOR_SAVE_TYPE, CalibrationIo, Calibrator, CalibratorAction,
    SAVE_TYPE_FOR_BUTTON, run_calibrator,
};
pub use database::{DbMatch, GameDb};
pub use overrides::{SAVE_OVERRIDES, save_override};
pub use resolver::{
    DecisionOrigin, ResolveMode, SaveTypeDecision, resolve, resolve_automatic, resolve_image,
};
pub use scanner::{SDK_SAVE_STRINGS, detect_sdk_save_type};
