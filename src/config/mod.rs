//! Engine configuration
//!
//! [`EngineConfig`] is the explicit context object handed to every render
//! graph and camera adapter at construction. It holds the engine-wide
//! settings (color format, frame rate, default resolution, logging) for the
//! lifetime of a host session; nothing here is process-global.
//!
//! # Config Location
//!
//! The host binary looks for `engine.toml` in the platform config directory:
//! - **Linux**: `~/.config/pixgraph/`
//! - **macOS**: `~/Library/Application Support/pixgraph/`
//! - **Windows**: `%APPDATA%\pixgraph\`
//!
//! # Example
//!
//! ```ignore
//! use pixgraph::config::EngineConfig;
//!
//! let mut config = EngineConfig::load_or_default();
//! config.fps_max = 30;
//! config.save(EngineConfig::default_path().unwrap())?;
//! ```

use crate::error::{PixError, Result};
use crate::types::{PixelFormat, Resolution};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for the config directory
pub const APP_ID: &str = "pixgraph";

/// Config filename
pub const CONFIG_FILE: &str = "engine.toml";

/// Default maximum frame rate in Hz
pub const DEFAULT_FPS_MAX: u32 = 60;

/// Default edge length of nodes created without an explicit resolution
pub const DEFAULT_RESOLUTION: u32 = 128;

/// How long to keep polling for an orientation change after a rotation notification
pub const DEFAULT_ORIENTATION_WATCH_TIMEOUT_MS: u64 = 2000;

/// Default capacity of the capture → graph event queue
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;

/// Engine-wide settings shared by every component of one host session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Channel depth of rendered textures
    pub pixel_format: PixelFormat,

    /// Frame clock rate; also bounds the orientation polling rate
    pub fps_max: u32,

    /// Resolution used by nodes that are decoded or built without one
    pub default_resolution: Resolution,

    /// Orientation polling window after a rotation notification
    pub orientation_watch_timeout_ms: u64,

    /// Bounded capacity of the event hand-off queue
    pub event_queue_capacity: usize,

    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::default(),
            fps_max: DEFAULT_FPS_MAX,
            default_resolution: Resolution::square(DEFAULT_RESOLUTION),
            orientation_watch_timeout_ms: DEFAULT_ORIENTATION_WATCH_TIMEOUT_MS,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            log_filter: "info,pixgraph=debug".to_string(),
        }
    }
}

impl EngineConfig {
    /// Interval between frames at `fps_max`.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.fps_max.max(1) as u64)
    }

    /// Orientation polling interval (one poll per frame).
    pub fn orientation_poll_interval(&self) -> Duration {
        self.frame_interval()
    }

    /// Maximum number of orientation polls per rotation notification.
    pub fn orientation_poll_budget(&self) -> u32 {
        let polls = self.fps_max.max(1) as u64 * self.orientation_watch_timeout_ms / 1000;
        polls.max(1) as u32
    }

    /// Orientation polling window.
    pub fn orientation_watch_timeout(&self) -> Duration {
        Duration::from_millis(self.orientation_watch_timeout_ms)
    }

    /// Check the settings for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fps_max == 0 {
            return Err(PixError::Config("fps_max must be at least 1".to_string()));
        }
        if self.default_resolution.is_empty() {
            return Err(PixError::Config(format!(
                "default_resolution {} has a zero dimension",
                self.default_resolution
            )));
        }
        if self.event_queue_capacity == 0 {
            return Err(PixError::Config(
                "event_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Default config file path in the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
    }

    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PixError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| PixError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults.
    pub fn load_or_default() -> Self {
        match Self::default_path() {
            Some(path) if path.exists() => match Self::load(&path) {
                Ok(config) => {
                    tracing::info!("Loaded engine config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load engine config, using defaults: {}", e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    /// Save the config as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| PixError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
