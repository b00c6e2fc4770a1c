//! Headless host
//!
//! Software stand-ins for the handheld's hardware so the launch pipeline can
//! run on a PC: a timer plays the role of the frame capture hardware, VRAM is
//! a shared byte buffer, and operator input comes from stdin lines.

use std::io::{self, BufRead, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use agbmode_core::hal::{
    Accelerator, CaptureFrontend, Console, Display, DisplayTransfer, FileBrowser, Input, Keys, Lcd,
    LegacyDriver, PrepareParams, Screen, SystemModel,
};
use agbmode_core::video::{FrameSignal, GammaTable};
use agbmode_core::{Error, FrameLists, PipelineDevices, Platform, RomImage};
use tracing::{debug, info, trace, warn};

/// Legacy frame rate (16.78 MHz / 280896 cycles per frame).
pub const CAPTURE_RATE_HZ: f64 = 59.7275;

/// Host LCD refresh rate.
pub const LCD_REFRESH_HZ: f64 = 59.83;

pub const VRAM_BASE: u32 = 0x1800_0000;
pub const VRAM_SIZE: usize = 0x60_0000;

const TOP_FRAMEBUFFERS: [u32; 2] = [0x1830_0000, 0x1835_0000];
const BOTTOM_FRAMEBUFFERS: [u32; 2] = [0x1854_0000, 0x1858_0000];

// ============================================================================
// VRAM
// ============================================================================

/// Shared video memory.
#[derive(Clone)]
pub struct Vram(Arc<Mutex<Vec<u8>>>);

impl Vram {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(vec![0; VRAM_SIZE])))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.0.lock().unwrap_or_else(|e| {
            warn!("VRAM mutex poisoned; continuing");
            e.into_inner()
        })
    }

    /// Byte range for `len` bytes at `addr`, clipped to VRAM.
    fn range(addr: u32, len: usize) -> Range<usize> {
        let start = (addr.saturating_sub(VRAM_BASE) as usize).min(VRAM_SIZE);
        let end = start.saturating_add(len).min(VRAM_SIZE);
        if addr < VRAM_BASE { 0..0 } else { start..end }
    }

    /// Read `len` bytes; anything outside VRAM reads as zero.
    pub fn read(&self, addr: u32, len: usize) -> Vec<u8> {
        let mut out = vec![0; len];
        let range = Self::range(addr, len);
        let count = range.len();
        out[..count].copy_from_slice(&self.lock()[range]);
        out
    }

    pub fn write(&self, addr: u32, data: &[u8]) {
        let range = Self::range(addr, data.len());
        let count = range.len();
        self.lock()[range].copy_from_slice(&data[..count]);
    }

    fn copy(&self, src: u32, dst: u32, len: usize) {
        let src = Self::range(src, len);
        let dst = Self::range(dst, len);
        let count = src.len().min(dst.len());
        self.lock()
            .copy_within(src.start..src.start + count, dst.start);
    }
}

impl Default for Vram {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Graphics
// ============================================================================

/// Accelerator that executes display transfers as plain copies.
///
/// Command lists are counted but not interpreted.
pub struct SoftAccelerator {
    vram: Vram,
    lists: u64,
}

impl SoftAccelerator {
    pub fn new(vram: Vram) -> Self {
        Self { vram, lists: 0 }
    }
}

impl Accelerator for SoftAccelerator {
    fn process_command_list(&mut self, list: &[u32]) {
        self.lists += 1;
        trace!("Command list {} ({} words)", self.lists, list.len());
    }

    fn wait_for_3d(&mut self) {}

    fn display_transfer(&mut self, transfer: &DisplayTransfer) {
        let len = transfer
            .src_dims
            .rgb8_len()
            .min(transfer.dst_dims.rgb8_len());
        self.vram.copy(transfer.src, transfer.dst, len);
    }

    fn wait_for_transfer(&mut self) {}

    fn read_vram(&self, addr: u32, len: usize) -> Vec<u8> {
        self.vram.read(addr, len)
    }
}

/// Double-buffered framebuffers in shared VRAM.
pub struct HostDisplay {
    front: usize,
    swaps: u64,
    gamma: Vec<u32>,
}

impl HostDisplay {
    pub fn new() -> Self {
        Self {
            front: 0,
            swaps: 0,
            gamma: Vec::new(),
        }
    }

    pub fn front_framebuffer(&self, screen: Screen) -> u32 {
        framebuffers(screen)[self.front]
    }
}

impl Default for HostDisplay {
    fn default() -> Self {
        Self::new()
    }
}

fn framebuffers(screen: Screen) -> [u32; 2] {
    match screen {
        Screen::Top => TOP_FRAMEBUFFERS,
        Screen::Bottom => BOTTOM_FRAMEBUFFERS,
    }
}

impl Display for HostDisplay {
    fn back_framebuffer(&self, screen: Screen) -> u32 {
        framebuffers(screen)[self.front ^ 1]
    }

    fn swap_framebuffers(&mut self) {
        self.front ^= 1;
        self.swaps += 1;
        if self.swaps % 600 == 0 {
            debug!("{} frames presented", self.swaps);
        }
    }

    fn write_gamma_table(&mut self, table: &GammaTable) {
        self.gamma = table.entries().collect();
        debug!("Gamma table written ({} entries)", self.gamma.len());
    }
}

// ============================================================================
// LCD, capture, legacy driver
// ============================================================================

pub struct HostLcd {
    model: SystemModel,
}

impl HostLcd {
    pub fn new(model: SystemModel) -> Self {
        Self { model }
    }
}

impl Lcd for HostLcd {
    fn set_brightness(&mut self, top: u8, bottom: u8) {
        info!("Backlight: top {}, bottom {}", top, bottom);
    }

    fn set_force_black(&mut self, top: bool, bottom: bool) {
        debug!("Force black: top {}, bottom {}", top, bottom);
    }

    fn power_off_backlight(&mut self, screen: Screen) {
        debug!("Backlight off: {:?}", screen);
    }

    fn wait_for_vblank(&mut self) {
        thread::sleep(Duration::from_secs_f64(1.0 / LCD_REFRESH_HZ));
    }

    fn system_model(&self) -> SystemModel {
        self.model
    }
}

/// Raises the frame signal at the legacy frame rate.
pub struct TimerCapture {
    period: Duration,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TimerCapture {
    pub fn new(rate_hz: f64) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / rate_hz),
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl CaptureFrontend for TimerCapture {
    fn init(&mut self, signal: FrameSignal) {
        self.stop.store(false, Ordering::Relaxed);
        let stop = self.stop.clone();
        let period = self.period;
        let spawned = thread::Builder::new()
            .name("capture-timer".into())
            .spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    thread::sleep(period);
                    if !signal.raise() {
                        break;
                    }
                }
            });
        match spawned {
            Ok(handle) => self.thread = Some(handle),
            Err(e) => warn!("Could not start capture timer: {}", e),
        }
    }

    fn deinit(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TimerCapture {
    fn drop(&mut self) {
        self.deinit();
    }
}

/// Accepts the handoff and logs mode changes.
#[derive(Default)]
pub struct HostLegacy {
    rom: Option<RomImage>,
}

impl LegacyDriver for HostLegacy {
    fn prepare_gba_mode(&mut self, params: &PrepareParams, rom: RomImage) -> agbmode_core::Result<()> {
        info!(
            "Legacy mode prepared: save type {}, save file {}, BIOS intro {}",
            params.save_type,
            params.save_path.display(),
            params.bios_intro
        );
        self.rom = Some(rom);
        Ok(())
    }

    fn switch_mode(&mut self) {
        if let Some(rom) = &self.rom {
            info!("Running {} ({:#x} byte cartridge)", rom.title_code(), rom.padded_size());
        }
    }

    fn handle_overrides(&mut self) {}

    fn deinit(&mut self) {
        self.rom = None;
        debug!("Legacy driver shut down");
    }
}

// ============================================================================
// Operator I/O
// ============================================================================

/// Fans stdin lines out to every subscriber.
#[derive(Clone, Default)]
pub struct LineHub {
    subscribers: Arc<Mutex<Vec<Sender<String>>>>,
}

impl LineHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub fed from stdin by a reader thread. End of input counts as power.
    pub fn stdin() -> io::Result<Self> {
        let hub = Self::new();
        let feeder = hub.clone();
        thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    match line {
                        Ok(line) => feeder.broadcast(&line),
                        Err(_) => break,
                    }
                }
                feeder.broadcast("power");
            })?;
        Ok(hub)
    }

    pub fn subscribe(&self) -> Receiver<String> {
        let (tx, rx) = mpsc::channel();
        self.lock().push(tx);
        rx
    }

    pub fn broadcast(&self, line: &str) {
        self.lock().retain(|tx| tx.send(line.to_string()).is_ok());
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sender<String>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Map a line of button names to keys. Unknown words are ignored.
pub fn parse_keys(line: &str) -> Keys {
    line.split_whitespace()
        .map(|word| match word.to_ascii_lowercase().as_str() {
            "a" => Keys::A,
            "b" => Keys::B,
            "x" => Keys::X,
            "y" => Keys::Y,
            "l" => Keys::L,
            "r" => Keys::R,
            "start" => Keys::START,
            "select" => Keys::SELECT,
            "u" | "up" => Keys::DUP,
            "d" | "down" => Keys::DDOWN,
            "left" => Keys::DLEFT,
            "right" => Keys::DRIGHT,
            "p" | "q" | "power" => Keys::POWER,
            _ => Keys::empty(),
        })
        .fold(Keys::empty(), |acc, k| acc | k)
}

/// Keys from stdin lines; each scan collects the lines since the last one.
pub struct LineInput {
    rx: Receiver<String>,
    current: Keys,
}

impl LineInput {
    pub fn new(rx: Receiver<String>) -> Self {
        Self {
            rx,
            current: Keys::empty(),
        }
    }
}

impl Input for LineInput {
    fn scan(&mut self) {
        self.current = self.rx.try_iter().map(|l| parse_keys(&l)).fold(Keys::empty(), |a, k| a | k);
    }

    fn keys_down(&self) -> Keys {
        self.current
    }
}

/// Console on stdout; acknowledgment is any stdin line.
pub struct StdoutConsole {
    rx: Receiver<String>,
}

impl StdoutConsole {
    pub fn new(rx: Receiver<String>) -> Self {
        Self { rx }
    }

    /// Next line typed after this call. Lines queued earlier were meant for
    /// the browser or the input scanner.
    fn fresh_line(&mut self) -> Option<String> {
        let stale = self.rx.try_iter().count();
        if stale > 0 {
            trace!("Dropped {} queued lines before acknowledge", stale);
        }
        self.rx.recv().ok()
    }
}

impl Console for StdoutConsole {
    fn clear(&mut self) {
        println!();
    }

    fn print(&mut self, text: &str) {
        print!("{text}");
        let _ = io::stdout().flush();
    }

    fn set_cursor(&mut self, row: u16, col: u16) {
        trace!("Cursor at {},{}", row, col);
    }

    fn wait_for_acknowledge(&mut self) {
        self.print("(press enter)\n");
        let _ = self.fresh_line();
    }
}

/// Numbered directory listing on stdout, selection from stdin.
pub struct LineBrowser {
    rx: Receiver<String>,
}

impl LineBrowser {
    pub fn new(rx: Receiver<String>) -> Self {
        Self { rx }
    }
}

/// Subdirectories first, then `.gba` files, each sorted by name.
pub fn list_dir(dir: &Path) -> agbmode_core::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut roms = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        } else if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("gba"))
        {
            roms.push(path);
        }
    }
    dirs.sort();
    roms.sort();
    dirs.extend(roms);
    Ok(dirs)
}

impl FileBrowser for LineBrowser {
    fn browse(&mut self, start_dir: &Path) -> agbmode_core::Result<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let entries = list_dir(&dir)?;
            println!("{}:", dir.display());
            for (i, path) in entries.iter().enumerate() {
                let name = path.file_name().unwrap_or_default().to_string_lossy();
                let suffix = if path.is_dir() { "/" } else { "" };
                println!("{:3}  {}{}", i + 1, name, suffix);
            }
            println!("Pick a number, '..' to go up, empty to cancel:");

            let Ok(line) = self.rx.recv() else {
                return Err(Error::NoPathSelected);
            };
            let line = line.trim();
            if line.is_empty() || line == "power" {
                return Err(Error::NoPathSelected);
            }
            if line == ".." {
                if let Some(parent) = dir.parent() {
                    dir = parent.to_path_buf();
                }
                continue;
            }
            let Some(path) = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| entries.get(i))
            else {
                println!("No such entry: {line}");
                continue;
            };
            if path.is_dir() {
                dir = path.clone();
            } else {
                return Ok(path.clone());
            }
        }
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Where the host keeps its files.
#[derive(Debug, Clone)]
pub struct HostPaths {
    pub storage_root: PathBuf,
    pub work_dir: PathBuf,
}

/// Wire every collaborator to the software host.
pub fn platform(paths: HostPaths, model: SystemModel, hub: &LineHub) -> Platform {
    let vram = Vram::new();
    Platform {
        storage_root: paths.storage_root,
        work_dir: paths.work_dir,
        browser: Box::new(LineBrowser::new(hub.subscribe())),
        legacy: Box::new(HostLegacy::default()),
        capture: Box::new(TimerCapture::new(CAPTURE_RATE_HZ)),
        lcd: Box::new(HostLcd::new(model)),
        console: Box::new(StdoutConsole::new(hub.subscribe())),
        input: Box::new(LineInput::new(hub.subscribe())),
        pipeline: PipelineDevices {
            accelerator: Box::new(SoftAccelerator::new(vram)),
            display: Box::new(HostDisplay::new()),
            input: Box::new(LineInput::new(hub.subscribe())),
        },
    }
}

/// Command lists for the software accelerator. It does not interpret them,
/// so they only mark which phase a frame is in.
pub fn frame_lists() -> FrameLists {
    FrameLists {
        init: vec![0x0001_0000, 0x0000_0000],
        steady: vec![0x0002_0000],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agbmode_core::video::{FRAME_DIMS, FrameReadyEvent};
    use std::time::Instant;

    #[test]
    fn parse_keys_combines_words() {
        assert_eq!(parse_keys("a"), Keys::A);
        assert_eq!(parse_keys("UP x"), Keys::DUP | Keys::X);
        assert_eq!(parse_keys("q"), Keys::POWER);
        assert_eq!(parse_keys("what"), Keys::empty());
    }

    #[test]
    fn line_input_collects_lines_since_last_scan() {
        let hub = LineHub::new();
        let mut input = LineInput::new(hub.subscribe());
        hub.broadcast("down");
        hub.broadcast("a");
        input.scan();
        assert_eq!(input.keys_down(), Keys::DDOWN | Keys::A);
        input.scan();
        assert_eq!(input.keys_down(), Keys::empty());
    }

    #[test]
    fn hub_drops_closed_subscribers() {
        let hub = LineHub::new();
        let kept = hub.subscribe();
        drop(hub.subscribe());
        hub.broadcast("x");
        assert_eq!(hub.lock().len(), 1);
        assert_eq!(kept.recv().unwrap(), "x");
    }

    #[test]
    fn vram_clips_out_of_range_access() {
        let vram = Vram::new();
        vram.write(VRAM_BASE + VRAM_SIZE as u32 - 2, &[1, 2, 3, 4]);
        assert_eq!(vram.read(VRAM_BASE + VRAM_SIZE as u32 - 2, 4), vec![1, 2, 0, 0]);
        assert_eq!(vram.read(0x1000, 3), vec![0, 0, 0]);
    }

    #[test]
    fn transfer_copies_frame_into_back_buffer() {
        let vram = Vram::new();
        let mut accel = SoftAccelerator::new(vram.clone());
        let mut display = HostDisplay::new();
        vram.write(0x1818_0000, &[7; 16]);

        let back = display.back_framebuffer(Screen::Top);
        accel.display_transfer(&DisplayTransfer {
            src: 0x1818_0000,
            src_dims: FRAME_DIMS,
            dst: back,
            dst_dims: FRAME_DIMS,
            flags: 0,
        });
        display.swap_framebuffers();

        assert_eq!(display.front_framebuffer(Screen::Top), back);
        assert_eq!(accel.read_vram(back, 16), vec![7; 16]);
    }

    #[test]
    fn timer_capture_raises_until_deinit() {
        let event = FrameReadyEvent::new();
        let consumer = event.consumer();
        let mut capture = TimerCapture::new(500.0);
        capture.init(event.signal());

        let start = Instant::now();
        while !event.is_signaled() {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(1));
        }
        consumer.clear();
        capture.deinit();
        event.destroy();
    }

    #[test]
    fn list_dir_puts_directories_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.gba"), b"").unwrap();
        std::fs::write(dir.path().join("a.GBA"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let names: Vec<_> = list_dir(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["sub", "a.GBA", "b.gba"]);
    }

    #[test]
    fn browser_reports_missing_directory() {
        let hub = LineHub::new();
        let mut browser = LineBrowser::new(hub.subscribe());
        let err = browser.browse(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn browser_picks_numbered_rom() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("game.gba"), b"").unwrap();
        let hub = LineHub::new();
        let mut browser = LineBrowser::new(hub.subscribe());
        hub.broadcast("7");
        hub.broadcast("1");
        assert_eq!(browser.browse(dir.path()).unwrap(), dir.path().join("game.gba"));
    }

    #[test]
    fn acknowledge_ignores_lines_typed_for_the_browser() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("game.gba"), b"").unwrap();
        let hub = LineHub::new();
        let mut browser = LineBrowser::new(hub.subscribe());
        let mut console = StdoutConsole::new(hub.subscribe());
        hub.broadcast("1");
        browser.browse(dir.path()).unwrap();

        let feeder = hub.clone();
        let typist = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            feeder.broadcast("ok");
        });
        assert_eq!(console.fresh_line().as_deref(), Some("ok"));
        typist.join().unwrap();
    }
}
