//! Shared test doubles for the hardware collaborator traits
//!
//! Every fake can record into a [`DeviceLog`], so tests can check the order
//! in which the launch sequence and the pipeline task touch the hardware.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::hal::{
    Accelerator, CaptureFrontend, Console, Display, DisplayTransfer, FileBrowser, Input, Keys,
    Lcd, LegacyDriver, PrepareParams, Screen, SystemModel,
};
use crate::rom::RomImage;
use crate::video::{FrameSignal, GammaTable};

// ============================================================================
// Shared log
// ============================================================================

#[derive(Default)]
struct LogInner {
    ops: Vec<&'static str>,
    command_lists: Vec<Vec<u32>>,
    transfers: Vec<DisplayTransfer>,
    swaps: usize,
    browsed: Vec<PathBuf>,
    prepared: Option<PrepareParams>,
    frame_signal: Option<FrameSignal>,
}

/// Cloneable record of device calls, shared across threads.
#[derive(Clone, Default)]
pub struct DeviceLog(Arc<Mutex<LogInner>>);

impl DeviceLog {
    fn inner(&self) -> MutexGuard<'_, LogInner> {
        self.0.lock().unwrap()
    }

    fn push(&self, op: &'static str) {
        self.inner().ops.push(op);
    }

    pub fn ops(&self) -> Vec<&'static str> {
        self.inner().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.inner().ops.clear();
    }

    pub fn command_lists(&self) -> Vec<Vec<u32>> {
        self.inner().command_lists.clone()
    }

    pub fn transfers(&self) -> Vec<DisplayTransfer> {
        self.inner().transfers.clone()
    }

    pub fn swaps(&self) -> usize {
        self.inner().swaps
    }

    /// Start directories passed to the file browser.
    pub fn browsed(&self) -> Vec<PathBuf> {
        self.inner().browsed.clone()
    }

    /// Parameters of the last legacy-mode handoff.
    pub fn prepared(&self) -> Option<PrepareParams> {
        self.inner().prepared.clone()
    }

    /// Signal handed to the capture frontend.
    pub fn frame_signal(&self) -> Option<FrameSignal> {
        self.inner().frame_signal.clone()
    }
}

// ============================================================================
// Graphics
// ============================================================================

#[derive(Default)]
pub struct TestAccelerator {
    log: DeviceLog,
}

impl TestAccelerator {
    pub fn logging(log: DeviceLog) -> Self {
        Self { log }
    }
}

impl Accelerator for TestAccelerator {
    fn process_command_list(&mut self, list: &[u32]) {
        let mut inner = self.log.inner();
        inner.ops.push("commands");
        inner.command_lists.push(list.to_vec());
    }

    fn wait_for_3d(&mut self) {
        self.log.push("wait_3d");
    }

    fn display_transfer(&mut self, transfer: &DisplayTransfer) {
        let mut inner = self.log.inner();
        inner.ops.push("transfer");
        inner.transfers.push(*transfer);
    }

    fn wait_for_transfer(&mut self) {
        self.log.push("wait_transfer");
    }

    fn read_vram(&self, _addr: u32, len: usize) -> Vec<u8> {
        vec![0x5A; len]
    }
}

#[derive(Default)]
pub struct TestDisplay {
    log: DeviceLog,
}

impl TestDisplay {
    pub const TOP_BACK: u32 = 0x1830_0000;
    pub const BOTTOM_BACK: u32 = 0x1848_0000;

    pub fn logging(log: DeviceLog) -> Self {
        Self { log }
    }
}

impl Display for TestDisplay {
    fn back_framebuffer(&self, screen: Screen) -> u32 {
        match screen {
            Screen::Top => Self::TOP_BACK,
            Screen::Bottom => Self::BOTTOM_BACK,
        }
    }

    fn swap_framebuffers(&mut self) {
        let mut inner = self.log.inner();
        inner.ops.push("swap");
        inner.swaps += 1;
    }

    fn write_gamma_table(&mut self, _table: &GammaTable) {
        self.log.push("gamma");
    }
}

// ============================================================================
// LCD, capture, legacy driver
// ============================================================================

pub struct TestLcd {
    log: DeviceLog,
    model: SystemModel,
}

impl TestLcd {
    pub fn logging(log: DeviceLog, model: SystemModel) -> Self {
        Self { log, model }
    }
}

impl Default for TestLcd {
    fn default() -> Self {
        Self::logging(DeviceLog::default(), SystemModel::New3ds)
    }
}

impl Lcd for TestLcd {
    fn set_brightness(&mut self, _top: u8, _bottom: u8) {
        self.log.push("brightness");
    }

    fn set_force_black(&mut self, _top: bool, _bottom: bool) {
        self.log.push("force_black");
    }

    fn power_off_backlight(&mut self, _screen: Screen) {
        self.log.push("backlight_off");
    }

    fn wait_for_vblank(&mut self) {
        self.log.push("vblank");
    }

    fn system_model(&self) -> SystemModel {
        self.model
    }
}

pub struct TestCapture {
    log: DeviceLog,
}

impl TestCapture {
    pub fn new(log: DeviceLog) -> Self {
        Self { log }
    }
}

impl CaptureFrontend for TestCapture {
    fn init(&mut self, signal: FrameSignal) {
        let mut inner = self.log.inner();
        inner.ops.push("capture_init");
        inner.frame_signal = Some(signal);
    }

    fn deinit(&mut self) {
        self.log.push("capture_deinit");
    }
}

pub struct TestLegacy {
    log: DeviceLog,
}

impl TestLegacy {
    pub fn new(log: DeviceLog) -> Self {
        Self { log }
    }
}

impl LegacyDriver for TestLegacy {
    fn prepare_gba_mode(&mut self, params: &PrepareParams, _rom: RomImage) -> Result<()> {
        let mut inner = self.log.inner();
        inner.ops.push("prepare");
        inner.prepared = Some(params.clone());
        Ok(())
    }

    fn switch_mode(&mut self) {
        self.log.push("switch_mode");
    }

    fn handle_overrides(&mut self) {
        self.log.push("overrides");
    }

    fn deinit(&mut self) {
        self.log.push("legacy_deinit");
    }
}

// ============================================================================
// Operator I/O
// ============================================================================

/// Console that keeps everything printed.
#[derive(Default)]
pub struct TestConsole {
    log: DeviceLog,
    pub output: String,
    pub acknowledged: usize,
}

impl TestConsole {
    pub fn logging(log: DeviceLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }
}

impl Console for TestConsole {
    fn clear(&mut self) {
        self.output.clear();
    }

    fn print(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn set_cursor(&mut self, _row: u16, _col: u16) {}

    fn wait_for_acknowledge(&mut self) {
        self.acknowledged += 1;
        self.log.push("acknowledge");
    }
}

/// Input that reports one scripted key set per scan, then nothing.
pub struct ScriptedInput {
    script: VecDeque<Keys>,
    current: Keys,
}

impl ScriptedInput {
    pub fn new(keys: &[Keys]) -> Self {
        Self {
            script: keys.iter().copied().collect(),
            current: Keys::empty(),
        }
    }
}

impl Input for ScriptedInput {
    fn scan(&mut self) {
        self.current = self.script.pop_front().unwrap_or_default();
    }

    fn keys_down(&self) -> Keys {
        self.current
    }
}

/// Browser returning scripted results in order.
pub struct ScriptedBrowser {
    log: DeviceLog,
    results: VecDeque<Result<PathBuf>>,
}

impl ScriptedBrowser {
    pub fn new(log: DeviceLog, results: Vec<Result<PathBuf>>) -> Self {
        Self {
            log,
            results: results.into(),
        }
    }
}

impl FileBrowser for ScriptedBrowser {
    fn browse(&mut self, start_dir: &Path) -> Result<PathBuf> {
        {
            let mut inner = self.log.inner();
            inner.ops.push("browse");
            inner.browsed.push(start_dir.to_path_buf());
        }
        self.results.pop_front().unwrap_or(Err(Error::NoPathSelected))
    }
}
