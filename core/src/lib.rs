//! agbmode core - GBA compatibility-mode launch pipeline
//!
//! Loads a cartridge ROM into the fixed legacy window, emulates the unmapped
//! cartridge address space, works out which save chip the title expects and
//! then keeps captured legacy frames flowing to the top screen.
//!
//! # Architecture
//!
//! - [`rom`] - ROM window, loader and open-bus padding
//! - [`save`] - Override table, SDK signature scan, save database, calibrator
//! - [`video`] - Gamma table, frame-ready event and the frame pipeline task
//! - [`session`] - Launch sequence and main-loop session
//! - [`hal`] - Traits for every hardware collaborator

pub mod config;
pub mod error;
pub mod hal;
pub mod rom;
pub mod save;
pub mod session;
#[cfg(test)]
pub mod test_utils;
pub mod video;

pub use config::{CONFIG_FILE, Config, GeneralConfig, VideoConfig};
pub use error::{Error, Result};
pub use rom::{RomImage, RomWindow, load_rom};
pub use save::{DecisionOrigin, GameDb, ResolveMode, SaveTypeDecision};
pub use session::{LaunchOptions, Platform, RunningSession, Session};
pub use video::{FrameLists, FrameReadyEvent, GammaTable, PipelineDevices};

// Re-export shared types for convenience
pub use agbmode_shared::{SaveType, TitleCode};
