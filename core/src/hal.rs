//! Hardware collaborator traits
//!
//! The pipeline never touches registers directly. Everything it needs from the
//! platform (file browser, legacy-mode driver, graphics accelerator, LCD,
//! capture frontend, input, text console) comes through these traits so the
//! same orchestration runs on hardware, on the headless host and under test.

use std::path::{Path, PathBuf};

use agbmode_shared::SaveType;
use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::rom::RomImage;
use crate::video::{FrameSignal, GammaTable};

bitflags! {
    /// Button state as reported by the input driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Keys: u32 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const DRIGHT = 1 << 4;
        const DLEFT = 1 << 5;
        const DUP = 1 << 6;
        const DDOWN = 1 << 7;
        const R = 1 << 8;
        const L = 1 << 9;
        const X = 1 << 10;
        const Y = 1 << 11;
        /// Power button pressed.
        const POWER = 1 << 30;
        /// Power button held.
        const POWER_HELD = 1 << 31;
    }
}

/// Physical screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Top,
    Bottom,
}

/// Host hardware revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemModel {
    Old3ds,
    Old3dsXl,
    New3ds,
    /// Single backlight shared by both halves of the panel.
    TwoDs,
    New3dsXl,
    New2dsXl,
}

/// Transfer rectangle packed the way the display engine expects it
/// (`height << 16 | width`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferDims {
    pub width: u16,
    pub height: u16,
}

impl TransferDims {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub const fn packed(self) -> u32 {
        (self.height as u32) << 16 | self.width as u32
    }

    /// Bytes covered at 24 bits per pixel.
    pub const fn rgb8_len(self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Display-engine copy from one VRAM surface to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayTransfer {
    pub src: u32,
    pub src_dims: TransferDims,
    pub dst: u32,
    pub dst_dims: TransferDims,
    pub flags: u32,
}

/// Interactive ROM picker.
pub trait FileBrowser {
    /// Let the operator pick a ROM starting in `start_dir`.
    ///
    /// Returns [`Error::NotFound`] if `start_dir` no longer exists and
    /// [`Error::NoPathSelected`] if the operator backed out.
    fn browse(&mut self, start_dir: &Path) -> Result<PathBuf>;
}

/// Settings handed to the legacy-mode driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareParams {
    pub bios_intro: bool,
    pub save_type: SaveType,
    pub save_path: PathBuf,
}

/// Legacy-mode hardware core driver.
pub trait LegacyDriver {
    /// Prepare legacy execution. Takes ownership of the loaded ROM window.
    fn prepare_gba_mode(&mut self, params: &PrepareParams, rom: RomImage) -> Result<()>;

    /// Switch the hardware into legacy mode.
    fn switch_mode(&mut self);

    /// Poll for button overrides; called once per main-loop iteration.
    fn handle_overrides(&mut self);

    fn deinit(&mut self);
}

/// Graphics accelerator (3D engine + display transfer engine).
pub trait Accelerator: Send {
    /// Execute an opaque command list.
    fn process_command_list(&mut self, list: &[u32]);

    /// Block until the 3D engine is idle.
    fn wait_for_3d(&mut self);

    fn display_transfer(&mut self, transfer: &DisplayTransfer);

    /// Block until the transfer engine is idle.
    fn wait_for_transfer(&mut self);

    /// Copy `len` bytes of VRAM starting at `addr`.
    fn read_vram(&self, addr: u32, len: usize) -> Vec<u8>;
}

/// Double-buffered framebuffer pair plus the LCD gamma table.
pub trait Display: Send {
    /// VRAM address of the buffer currently being written for `screen`.
    fn back_framebuffer(&self, screen: Screen) -> u32;

    /// Present the back buffers atomically.
    fn swap_framebuffers(&mut self);

    /// Push all 256 entries of `table` into the gamma FIFO.
    fn write_gamma_table(&mut self, table: &GammaTable);
}

/// LCD power, brightness and timing.
pub trait Lcd {
    fn set_brightness(&mut self, top: u8, bottom: u8);

    fn set_force_black(&mut self, top: bool, bottom: bool);

    fn power_off_backlight(&mut self, screen: Screen);

    fn wait_for_vblank(&mut self);

    fn system_model(&self) -> SystemModel;
}

/// Hardware frame capture frontend (legacy framebuffer).
pub trait CaptureFrontend {
    /// Start capturing; `signal` is raised once per emulated frame.
    fn init(&mut self, signal: FrameSignal);

    fn deinit(&mut self);
}

/// Button input.
pub trait Input: Send {
    /// Latch the current button state.
    fn scan(&mut self);

    /// Buttons newly pressed at the last scan.
    fn keys_down(&self) -> Keys;
}

/// Text console used for messages and the calibrator screen.
pub trait Console {
    fn clear(&mut self);

    fn print(&mut self, text: &str);

    /// Move the cursor (0-based row and column).
    fn set_cursor(&mut self, row: u16, col: u16);

    /// Block until the operator acknowledges the message on screen.
    fn wait_for_acknowledge(&mut self);

    /// Show `error` and wait for acknowledgment.
    fn report_error(&mut self, error: &Error) {
        self.print(&format!("Error: {error}\n"));
        self.wait_for_acknowledge();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_dims_pack_height_high() {
        let dims = TransferDims::new(240, 368);
        assert_eq!(dims.packed(), 368 << 16 | 240);
        assert_eq!(dims.rgb8_len(), 240 * 368 * 3);
    }
}
