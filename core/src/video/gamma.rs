//! LCD gamma lookup table.

use crate::config::VideoConfig;

/// Number of gamma FIFO entries.
pub const GAMMA_TABLE_LEN: usize = 256;

/// Tone-mapping curve for the top LCD, one intensity per input level.
#[derive(Clone, PartialEq, Eq)]
pub struct GammaTable([u8; GAMMA_TABLE_LEN]);

impl GammaTable {
    /// Build the curve
    /// `(contrast^in * (i/255 + brightness/contrast)^in)^(1/out) * 255`,
    /// clamped to `0..=255` and truncated. Non-finite results map to 0.
    pub fn build(in_gamma: f32, out_gamma: f32, contrast: f32, brightness: f32) -> Self {
        let mut values = [0u8; GAMMA_TABLE_LEN];
        for (i, value) in values.iter_mut().enumerate() {
            let level = i as f32 / 255.0;
            let linear =
                contrast.powf(in_gamma) * (level + brightness / contrast).powf(in_gamma);
            let out = (linear.powf(1.0 / out_gamma) * 255.0).clamp(0.0, 255.0);
            // NaN survives clamp; `as` saturates it to 0.
            *value = out as u8;
        }
        Self(values)
    }

    pub fn from_config(video: &VideoConfig) -> Self {
        Self::build(
            video.in_gamma,
            video.out_gamma,
            video.contrast,
            video.brightness,
        )
    }

    pub fn values(&self) -> &[u8; GAMMA_TABLE_LEN] {
        &self.0
    }

    /// FIFO words in write order: the same value on all three channels.
    pub fn entries(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().map(|&v| {
            let v = v as u32;
            v << 16 | v << 8 | v
        })
    }
}

impl std::fmt::Debug for GammaTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GammaTable")
            .field("first", &self.0[0])
            .field("mid", &self.0[128])
            .field("last", &self.0[255])
            .finish()
    }
}
