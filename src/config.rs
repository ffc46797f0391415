use crate::assets::{
    BASE_CAPTURE_HEIGHT, BASE_CAPTURE_WIDTH, DISPLAY_REFRESH_RATE, MAX_VIDEO_CAPTURE_MULTIPLIER,
    PREVIEW_RESYNC_INTERVAL_MS,
};
use crate::capture::CaptureOptions;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime configuration shared by the capturer and the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Options used by `enable_capture` and by `enable_capture_and_send(_, None)`.
    pub default_capture: CaptureOptions,
    /// Scales the 1920x1080 capture ceiling (and so the frame buffer size).
    pub capture_multiplier: f64,
    pub preview_resync_interval_ms: u64,
    pub refresh_rate_hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_capture: CaptureOptions::default(),
            capture_multiplier: MAX_VIDEO_CAPTURE_MULTIPLIER,
            preview_resync_interval_ms: PREVIEW_RESYNC_INTERVAL_MS,
            refresh_rate_hz: DISPLAY_REFRESH_RATE,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON configuration file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let conf: Config = serde_json::from_str(raw)?;
        conf.validate()?;
        Ok(conf)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.capture_multiplier.is_finite() && self.capture_multiplier > 0.0) {
            return Err(anyhow!(
                "capture_multiplier must be positive, got {}",
                self.capture_multiplier
            ));
        }
        if self.refresh_rate_hz == 0 {
            return Err(anyhow!("refresh_rate_hz must be at least 1"));
        }
        if self.preview_resync_interval_ms == 0 {
            return Err(anyhow!("preview_resync_interval_ms must be at least 1"));
        }
        let opts = &self.default_capture;
        if opts.max_width == 0 || opts.max_height == 0 || opts.max_framerate == 0 {
            return Err(anyhow!("default capture options must be non zero: {:?}", opts));
        }
        Ok(())
    }

    pub fn max_capture_width(&self) -> u32 {
        (BASE_CAPTURE_WIDTH as f64 * self.capture_multiplier) as u32
    }

    pub fn max_capture_height(&self) -> u32 {
        (BASE_CAPTURE_HEIGHT as f64 * self.capture_multiplier) as u32
    }

    /// Bytes needed to hold the largest supported frame as RGBA.
    pub fn max_buffer_size(&self) -> usize {
        self.max_capture_width() as usize * self.max_capture_height() as usize * 4
    }

    pub fn preview_resync_interval(&self) -> Duration {
        // a zero period would panic in tokio::time::interval
        Duration::from_millis(self.preview_resync_interval_ms.max(1))
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(1) / self.refresh_rate_hz.max(1)
    }
}

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
