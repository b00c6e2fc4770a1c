//! agbmode - GBA compatibility-mode launcher
//!
//! Runs the launch pipeline on a headless host and carries the operator
//! tools for the save database.
//!
//! # Usage
//!
//! ```bash
//! agbmode run path/to/game.gba
//! agbmode run --calibrate          # pick a ROM and correct its db entry
//! agbmode detect path/to/game.gba
//! agbmode db-check
//! agbmode config
//! ```
//!
//! While running, type button names on stdin (`a`, `x`, `y`, `up`, `down`,
//! `power`) and press enter.

mod host;
mod tooling;

use std::path::PathBuf;

use agbmode_core::hal::SystemModel;
use agbmode_core::{CONFIG_FILE, Config, Error, LaunchOptions, ResolveMode, Session};
use agbmode_shared::GAME_DB_FILE;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use host::{HostPaths, LineHub};

#[derive(Parser)]
#[command(name = "agbmode")]
#[command(author, version, about = "GBA compatibility-mode launcher")]
struct Cli {
    /// Work directory (config, last dir, save database, dumps)
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a ROM on the headless host
    Run {
        /// ROM to launch (default: pick one interactively)
        rom: Option<PathBuf>,

        /// Resolve the save type with the interactive database calibrator
        #[arg(long)]
        calibrate: bool,

        /// Root the file browser falls back to (default: current directory)
        #[arg(long)]
        storage_root: Option<PathBuf>,

        /// Stop after this many main-loop iterations (0: until power)
        #[arg(long, default_value = "0")]
        frames: u64,

        /// Emulate a 2DS (single backlight)
        #[arg(long)]
        two_ds: bool,
    },

    /// Show the automatic save-type decision and database key for a ROM
    Detect { rom: PathBuf },

    /// Check record size and sort order of a save database
    DbCheck {
        /// Database file (default: gba_db.bin in the work directory)
        db: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn default_work_dir() -> PathBuf {
    directories::ProjectDirs::from("io", "agbmode", "agbmode")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("agbmode"))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let work_dir = cli.work_dir.unwrap_or_else(default_work_dir);

    match cli.command {
        Commands::Run {
            rom,
            calibrate,
            storage_root,
            frames,
            two_ds,
        } => {
            let storage_root = match storage_root {
                Some(root) => root,
                None => std::env::current_dir().context("No current directory")?,
            };
            let model = if two_ds {
                SystemModel::TwoDs
            } else {
                SystemModel::New3ds
            };
            let mode = if calibrate {
                ResolveMode::Calibration
            } else {
                ResolveMode::Automatic
            };
            run(
                HostPaths {
                    storage_root,
                    work_dir,
                },
                model,
                LaunchOptions {
                    mode,
                    rom_path: rom,
                    blank_bottom_screen: true,
                    frame_lists: host::frame_lists(),
                },
                frames,
            )
        }
        Commands::Detect { rom } => {
            let detection = tooling::detect(&rom)?;
            println!("Title code:  {}", detection.title);
            println!(
                "Size:        {:#x} bytes (padded {:#x})",
                detection.raw_size, detection.padded_size
            );
            println!(
                "Save type:   {} (from {:?})",
                detection.decision.save_type, detection.decision.origin
            );
            println!("Db key:      {:016X}", detection.key);
            Ok(())
        }
        Commands::DbCheck { db } => {
            let db = db.unwrap_or_else(|| work_dir.join(GAME_DB_FILE));
            let report = tooling::db_check(&db)?;
            println!("{}: {} records", db.display(), report.records);
            match report.first_unsorted {
                None => println!("Sorted."),
                Some(index) => {
                    anyhow::bail!("Record {} is out of order; lookups will miss entries", index)
                }
            }
            Ok(())
        }
        Commands::Config => {
            std::fs::create_dir_all(&work_dir)
                .with_context(|| format!("Failed to create {}", work_dir.display()))?;
            let config = Config::load_or_create(&work_dir.join(CONFIG_FILE));
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run(paths: HostPaths, model: SystemModel, options: LaunchOptions, frames: u64) -> Result<()> {
    let hub = LineHub::stdin().context("Failed to start stdin reader")?;
    let platform = host::platform(paths, model, &hub);

    let mut running = match Session::new(platform, options).launch() {
        Ok(running) => running,
        Err(Error::NoPathSelected) => {
            tracing::info!("No ROM selected");
            return Ok(());
        }
        Err(e) => return Err(e).context("Launch failed"),
    };

    let mut iterations = 0u64;
    while running.update() {
        iterations += 1;
        if frames != 0 && iterations >= frames {
            break;
        }
    }

    let presented = running.finish();
    tracing::info!("Stopped after {} frames", presented);
    Ok(())
}
