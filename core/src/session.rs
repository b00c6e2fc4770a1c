//! Launch sequence and main-loop session.
//!
//! [`Session::launch`] runs everything from work-directory setup to the switch
//! into legacy mode: config, ROM selection, loading, save-type resolution,
//! driver handoff, gamma table and the frame pipeline task. The returned
//! [`RunningSession`] is polled once per main-loop iteration and tears the
//! pipeline down in a fixed order when it is finished or dropped.

use std::fs;
use std::path::{Path, PathBuf};

use agbmode_shared::GAME_DB_FILE;
use tracing::{debug, info, warn};

use crate::config::{CONFIG_FILE, Config};
use crate::error::{Error, Result};
use crate::hal::{
    CaptureFrontend, Console, FileBrowser, Input, Keys, Lcd, LegacyDriver, PrepareParams, Screen,
    SystemModel,
};
use crate::rom::{RomWindow, load_rom};
use crate::save::{CalibrationIo, ResolveMode, resolve};
use crate::video::{
    FrameLists, FramePacer, FramePipeline, FramePipelineHandle, FrameReadyEvent, GammaTable,
    PipelineDevices,
};

/// Remembers the directory the last ROM was picked from.
pub const LAST_DIR_FILE: &str = "lastdir.bin";

/// Platform collaborators for one launch.
pub struct Platform {
    /// Root of the ROM storage; the browser falls back to it.
    pub storage_root: PathBuf,
    /// Holds `config.ini`, `lastdir.bin`, the save database and dumps.
    pub work_dir: PathBuf,
    pub browser: Box<dyn FileBrowser>,
    pub legacy: Box<dyn LegacyDriver>,
    pub capture: Box<dyn CaptureFrontend>,
    pub lcd: Box<dyn Lcd>,
    pub console: Box<dyn Console>,
    /// Main-thread input (calibrator, power button).
    pub input: Box<dyn Input>,
    /// Moved into the frame pipeline task.
    pub pipeline: PipelineDevices,
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub mode: ResolveMode,
    /// Skip the browser and launch this ROM.
    pub rom_path: Option<PathBuf>,
    /// Black out the bottom screen and switch its backlight off.
    pub blank_bottom_screen: bool,
    pub frame_lists: FrameLists,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            mode: ResolveMode::Automatic,
            rom_path: None,
            blank_bottom_screen: true,
            frame_lists: FrameLists::default(),
        }
    }
}

pub struct Session {
    platform: Platform,
    options: LaunchOptions,
}

impl Session {
    pub fn new(platform: Platform, options: LaunchOptions) -> Self {
        Self { platform, options }
    }

    /// Run the launch sequence up to and including the switch into legacy
    /// mode.
    ///
    /// Errors are shown on the console (except a cancelled file selection)
    /// and the legacy driver is shut down before returning.
    pub fn launch(mut self) -> Result<RunningSession> {
        let config = match self.prepare() {
            Ok(config) => config,
            Err(e) => {
                warn!("Launch failed: {}", e);
                if !matches!(e, Error::NoPathSelected) {
                    self.platform.console.report_error(&e);
                }
                self.platform.legacy.deinit();
                return Err(e);
            }
        };
        self.start(&config)
    }

    /// Everything up to the legacy driver handoff.
    fn prepare(&mut self) -> Result<Config> {
        let platform = &mut self.platform;

        fs::create_dir_all(&platform.work_dir)?;
        let config = Config::load_or_create(&platform.work_dir.join(CONFIG_FILE));
        let backlight = config.general.backlight;
        platform.lcd.set_brightness(backlight, backlight);

        let rom_path = match self.options.rom_path.clone() {
            Some(path) => path,
            None => select_rom(
                platform.browser.as_mut(),
                &platform.work_dir,
                &platform.storage_root,
            )?,
        };
        remember_last_dir(&platform.work_dir, &platform.storage_root, &rom_path)?;

        platform.console.print("Loading...\n");
        let rom = load_rom(&rom_path, RomWindow::allocate()?)?;
        info!(
            "Loaded {} ({} bytes, title {})",
            rom_path.display(),
            rom.raw_size(),
            rom.title_code()
        );

        let save_path = rom_path.with_extension("sav");
        let decision = resolve(
            self.options.mode,
            &rom,
            &platform.work_dir.join(GAME_DB_FILE),
            &save_path,
            CalibrationIo {
                console: platform.console.as_mut(),
                input: platform.input.as_mut(),
                lcd: platform.lcd.as_mut(),
            },
        );

        let params = PrepareParams {
            bios_intro: config.general.bios_intro,
            save_type: decision.save_type,
            save_path,
        };
        platform.legacy.prepare_gba_mode(&params, rom)?;
        Ok(config)
    }

    /// Screens, capture, pipeline task and the mode switch.
    fn start(self, config: &Config) -> Result<RunningSession> {
        let Self { platform, options } = self;
        let Platform {
            work_dir,
            legacy,
            mut capture,
            mut lcd,
            mut console,
            input,
            mut pipeline,
            ..
        } = platform;

        if options.blank_bottom_screen {
            lcd.set_force_black(false, true);
            if lcd.system_model() != SystemModel::TwoDs {
                lcd.power_off_backlight(Screen::Bottom);
            }
        }

        let gamma = GammaTable::from_config(&config.video);
        debug!("Gamma table: {:?}", gamma);
        pipeline.display.write_gamma_table(&gamma);

        let event = FrameReadyEvent::new();
        capture.init(event.signal());
        let pacer = event.pacer();
        let consumer = event.consumer();

        let mut running = RunningSession {
            legacy,
            capture,
            input,
            event,
            pacer,
            pipeline: None,
            finished: false,
        };

        match FramePipeline::new(consumer, pipeline, options.frame_lists, work_dir).spawn() {
            Ok(handle) => running.pipeline = Some(handle),
            Err(e) => {
                warn!("Could not start the frame pipeline: {}", e);
                console.report_error(&e);
                return Err(e);
            }
        }

        lcd.wait_for_vblank();
        running.legacy.switch_mode();
        info!("Switched to legacy mode");
        Ok(running)
    }
}

/// A launched title. Poll [`update`](Self::update) from the main loop.
pub struct RunningSession {
    legacy: Box<dyn LegacyDriver>,
    capture: Box<dyn CaptureFrontend>,
    input: Box<dyn Input>,
    event: FrameReadyEvent,
    pacer: FramePacer,
    pipeline: Option<FramePipelineHandle>,
    finished: bool,
}

impl RunningSession {
    /// One main-loop iteration: poll the power button, let the driver handle
    /// overrides, then wait for the next frame.
    ///
    /// Returns `false` when the loop should stop.
    pub fn update(&mut self) -> bool {
        self.input.scan();
        if self
            .input
            .keys_down()
            .intersects(Keys::POWER | Keys::POWER_HELD)
        {
            info!("Power button pressed");
            return false;
        }
        self.legacy.handle_overrides();
        self.pacer.wait().is_ok()
    }

    pub fn is_pipeline_alive(&self) -> bool {
        self.pipeline.as_ref().is_some_and(|p| p.is_alive())
    }

    /// Tear down and return the number of frames the pipeline presented.
    pub fn finish(mut self) -> u64 {
        self.teardown()
    }

    fn teardown(&mut self) -> u64 {
        if self.finished {
            return 0;
        }
        self.finished = true;

        self.capture.deinit();
        self.event.destroy();
        let frames = self.pipeline.take().map(|p| p.join()).unwrap_or(0);
        self.legacy.deinit();
        debug!("Session finished ({} frames)", frames);
        frames
    }
}

impl Drop for RunningSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Let the operator pick a ROM, starting where the last one was picked.
fn select_rom(
    browser: &mut dyn FileBrowser,
    work_dir: &Path,
    storage_root: &Path,
) -> Result<PathBuf> {
    let start = read_last_dir(work_dir, storage_root)?;
    match browser.browse(&start) {
        Err(Error::NotFound(what)) => {
            debug!("Last dir {} is gone ({}), retrying from root", start.display(), what);
            browser.browse(storage_root)
        }
        other => other,
    }
}

/// Directory stored in `lastdir.bin`, or `storage_root` if there is none.
pub fn read_last_dir(work_dir: &Path, storage_root: &Path) -> Result<PathBuf> {
    let bytes = match fs::read(work_dir.join(LAST_DIR_FILE)) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(storage_root.to_path_buf());
        }
        Err(e) => return Err(e.into()),
    };
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    if end == 0 {
        return Ok(storage_root.to_path_buf());
    }
    Ok(PathBuf::from(String::from_utf8_lossy(&bytes[..end]).into_owned()))
}

/// Store the parent directory of `rom_path` if it differs from the last one.
fn remember_last_dir(work_dir: &Path, storage_root: &Path, rom_path: &Path) -> Result<()> {
    let Some(dir) = rom_path.parent() else {
        return Ok(());
    };
    if read_last_dir(work_dir, storage_root)? == dir {
        return Ok(());
    }
    let mut bytes = dir.to_string_lossy().into_owned().into_bytes();
    bytes.push(0);
    fs::write(work_dir.join(LAST_DIR_FILE), bytes)?;
    Ok(())
}
