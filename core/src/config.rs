//! Launcher configuration (`config.ini` in the work directory).
//!
//! A small INI file with a `[general]` and a `[video]` section. Each value is
//! parsed as a TOML value so numbers and booleans follow the usual literal
//! rules. A bad value only affects its own key; unknown sections and keys are
//! ignored. Configuration problems never abort a launch.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// File name inside the work directory.
pub const CONFIG_FILE: &str = "config.ini";

/// Written when no configuration file can be read.
pub const DEFAULT_CONFIG: &str = "[general]\n\
backlight=40\n\
biosIntro=true\n\
\n\
[video]\n\
inGamma=2.2\n\
outGamma=1.54\n\
contrast=1.0\n\
brightness=0.0\n";

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Config {
    pub general: GeneralConfig,
    pub video: VideoConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralConfig {
    /// LCD backlight level for both screens.
    pub backlight: u8,
    /// Show the boot logo of the legacy BIOS.
    pub bios_intro: bool,
}

/// Gamma curve parameters, see [`crate::video::GammaTable::build`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
    pub in_gamma: f32,
    pub out_gamma: f32,
    pub contrast: f32,
    pub brightness: f32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            backlight: 40,
            bios_intro: true,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            in_gamma: 2.2,
            out_gamma: 1.54,
            contrast: 1.0,
            brightness: 0.0,
        }
    }
}

impl Config {
    /// Parse INI text on top of the defaults.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        let mut section = String::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.trim().to_string();
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!("{}:{}: expected key=value", CONFIG_FILE, number + 1);
                continue;
            };
            config.set(&section, key.trim(), value.trim());
        }

        config
    }

    /// Read `path`, or write [`DEFAULT_CONFIG`] there and use the defaults.
    pub fn load_or_create(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                debug!("No config at {} ({}), writing defaults", path.display(), e);
                if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
                    warn!("Could not write {}: {}", path.display(), e);
                }
                Self::default()
            }
        }
    }

    fn set(&mut self, section: &str, key: &str, raw: &str) {
        let applied = match (section, key) {
            ("general", "backlight") => assign(&mut self.general.backlight, raw),
            ("general", "biosIntro") => assign(&mut self.general.bios_intro, raw),
            ("video", "inGamma") => assign(&mut self.video.in_gamma, raw),
            ("video", "outGamma") => assign(&mut self.video.out_gamma, raw),
            ("video", "contrast") => assign(&mut self.video.contrast, raw),
            ("video", "brightness") => assign(&mut self.video.brightness, raw),
            _ => return,
        };
        if !applied {
            warn!("Ignoring invalid value {:?} for {}.{}", raw, section, key);
        }
    }
}

/// Parse `raw` as a TOML literal into `slot`. Leaves `slot` alone on failure.
fn assign<T: for<'de> Deserialize<'de>>(slot: &mut T, raw: &str) -> bool {
    let literal = normalize_number(raw.trim());
    let parsed = toml::from_str::<toml::Table>(&format!("value = {literal}"))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .and_then(|value| value.try_into::<T>().ok());
    match parsed {
        Some(value) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Rewrite plain decimals TOML rejects (`.5`, `5.`, `040`) into their TOML
/// spelling. Anything else is returned unchanged.
fn normalize_number(raw: &str) -> String {
    let (sign, body) = match raw.strip_prefix(['+', '-']) {
        Some(rest) => (&raw[..1], rest),
        None => ("", raw),
    };
    let (int, frac) = body.split_once('.').unwrap_or((body, ""));
    let plain = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int.is_empty() && frac.is_empty()) || !plain(int) || !plain(frac) {
        return raw.to_string();
    }

    let int = int.trim_start_matches('0');
    let int = if int.is_empty() { "0" } else { int };
    if body.contains('.') {
        let frac = if frac.is_empty() { "0" } else { frac };
        format!("{sign}{int}.{frac}")
    } else {
        format!("{sign}{int}")
    }
}
