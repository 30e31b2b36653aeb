/// Kiosk settings
///
/// Every option the slideshow recognises, with defaults matching the
/// stock deployment (AIA 193, 512px, 200 cached stills, 480x480 panel).
/// Settings are read once at startup from JSON and never written back.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Local override, checked before the per-user config directory
const LOCAL_SETTINGS_FILE: &str = "sdo-frame.json";

/// Upper bound of every interval and timeout (one week)
const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
/// Upper bound of the age and backfill windows (one year)
const MAX_HOURS: i64 = 365 * 24;
const MAX_FRAME_RATE: u32 = 240;
const MAX_DISPLAY_SIZE: u32 = 8192;
const MAX_FADE_SECS: f64 = 60.0;

fn seconds(secs: u64) -> TimeDelta {
    TimeDelta::try_seconds(secs.min(MAX_INTERVAL_SECS) as i64).unwrap_or(TimeDelta::zero())
}

fn hours(hours: i64) -> TimeDelta {
    TimeDelta::try_hours(hours.clamp(0, MAX_HOURS)).unwrap_or(TimeDelta::zero())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    // ========== Feed ==========
    /// SDO channel: '0094', '0131', '0171', '0193', '0211', '0304', '0335',
    /// '1600', '1700', 'HMIB', 'HMII', 'HMID', 'HMIBC', 'HMIIF', 'HMIIC'
    pub channel: String,

    /// Image size in pixels: '4096', '2048', '1024', '512'
    pub resolution: String,

    /// Root of the archive, without trailing slash
    pub archive_url: String,

    // ========== Cache ==========
    /// Directory holding the cached stills
    pub cache_dir: PathBuf,

    /// How many stills to keep; the oldest are deleted past this count
    pub image_count: usize,

    /// Age past which a still counts as old (hours)
    pub age_threshold_hours: i64,

    /// Delete stills older than the age threshold, on top of the count cap
    pub evict_by_age: bool,

    /// How far back to fill the cache at startup (hours)
    pub startup_backfill_hours: i64,

    /// Inpaint the burned-in timestamp of every downloaded still
    pub remove_watermark: bool,

    /// Batch mode: inpaint every still already in the cache at startup
    pub scrub_cache_on_startup: bool,

    /// Where to keep the rolling movie of the feed; fetched after each new still when set
    pub movie_dir: Option<PathBuf>,

    // ========== Polling ==========
    /// Delay between archive polls (seconds)
    pub check_interval_secs: u64,

    /// Delay between polls while the cache is empty (seconds)
    pub offline_check_interval_secs: u64,

    /// Fetch the latest still once the archive's newest capture is older than this (seconds)
    pub stale_after_secs: u64,

    /// Per-request HTTP timeout (seconds)
    pub request_timeout_secs: u64,

    /// File recording when the archive was last polled
    pub marker_file: PathBuf,

    // ========== Display ==========
    /// Side of the square display surface in pixels
    pub display_size: u32,

    /// Delay between slides (seconds)
    pub rotate_secs: f64,

    /// Display ticks per second
    pub frame_rate: u32,

    /// Length of one cross-fade (seconds)
    pub fade_secs: f64,

    /// Cross-fade between slides
    pub fading: bool,

    /// Crop the empty space around the solar disc
    pub cropping: bool,

    /// Extra pixels kept around the disc when cropping
    pub crop_extra_edge: u32,

    /// Holding the pointer down this long quits (seconds)
    pub mouse_exit_delay_secs: u32,

    /// If this file exists the slideshow runs in a window instead of fullscreen
    pub windowed_sentinel: PathBuf,

    /// Shown while the cache is empty; a dark frame is used if unset or unreadable
    pub placeholder_image: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel: "0193".to_string(),
            resolution: "512".to_string(),
            archive_url: "https://sdo.gsfc.nasa.gov".to_string(),
            cache_dir: PathBuf::from("data"),
            image_count: 200,
            age_threshold_hours: 48,
            evict_by_age: false,
            startup_backfill_hours: 24,
            remove_watermark: true,
            scrub_cache_on_startup: false,
            movie_dir: None,
            check_interval_secs: 9 * 60,
            offline_check_interval_secs: 5 * 60,
            stale_after_secs: 15 * 60,
            request_timeout_secs: 30,
            marker_file: PathBuf::from("lastCheck"),
            display_size: 480,
            rotate_secs: 0.6,
            frame_rate: 15,
            fade_secs: 0.5,
            fading: true,
            cropping: true,
            crop_extra_edge: 3,
            mouse_exit_delay_secs: 5,
            windowed_sentinel: PathBuf::from("debug"),
            placeholder_image: None,
        }
    }
}

impl Settings {
    /// Load settings from the first settings file found, or use defaults
    ///
    /// Search order:
    /// - `./sdo-frame.json`
    /// - Linux: ~/.config/sdo-frame/settings.json
    /// - macOS: ~/Library/Application Support/sdo-frame/settings.json
    /// - Windows: %APPDATA%\sdo-frame\settings.json
    ///
    /// A malformed file is reported and ignored.
    pub fn load() -> Self {
        let candidates = std::iter::once(PathBuf::from(LOCAL_SETTINGS_FILE))
            .chain(Self::user_settings_path());

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(settings) => {
                    tracing::info!(path = %path.display(), "loaded settings");
                    return settings;
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "ignoring settings file");
                }
            }
        }

        tracing::info!("no settings file found, using defaults");
        Self::default()
    }

    /// Parse a settings file; missing keys take their default value
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| crate::error::Error::io(path, e))?;
        Ok(Self::from_json(&json)?.sanitized())
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Convert to a JSON string
    #[cfg(test)]
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn user_settings_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("sdo-frame");
        path.push("settings.json");
        Some(path)
    }

    /// Clamp values that would stall the display loop or overflow a duration
    ///
    /// Non-finite or out-of-range values fall back to their default.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        self.frame_rate = self.frame_rate.clamp(1, MAX_FRAME_RATE);
        self.display_size = self.display_size.clamp(1, MAX_DISPLAY_SIZE);
        if !(self.fade_secs > 0.0 && self.fade_secs <= MAX_FADE_SECS) {
            self.fade_secs = defaults.fade_secs;
        }
        if !(self.rotate_secs >= 0.0 && self.rotate_secs <= MAX_INTERVAL_SECS as f64) {
            self.rotate_secs = defaults.rotate_secs;
        }

        self.check_interval_secs = self.check_interval_secs.min(MAX_INTERVAL_SECS);
        self.offline_check_interval_secs = self.offline_check_interval_secs.min(MAX_INTERVAL_SECS);
        self.stale_after_secs = self.stale_after_secs.min(MAX_INTERVAL_SECS);
        self.request_timeout_secs = self.request_timeout_secs.clamp(1, MAX_INTERVAL_SECS);
        self.mouse_exit_delay_secs = self.mouse_exit_delay_secs.min(MAX_INTERVAL_SECS as u32);

        self.age_threshold_hours = self.age_threshold_hours.clamp(0, MAX_HOURS);
        self.startup_backfill_hours = self.startup_backfill_hours.clamp(0, MAX_HOURS);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }

    pub fn rotate_every(&self) -> Duration {
        Duration::try_from_secs_f64(self.rotate_secs).unwrap_or(Duration::from_millis(600))
    }

    /// Opacity change per display tick while cross-fading
    pub fn fade_step(&self) -> f32 {
        (255.0 / self.frame_rate.max(1) as f64 / self.fade_secs) as f32
    }

    /// Number of ticks the pointer must be held before quitting
    pub fn exit_hold_ticks(&self) -> u32 {
        self.mouse_exit_delay_secs.saturating_mul(self.frame_rate)
    }

    pub fn check_interval(&self) -> TimeDelta {
        seconds(self.check_interval_secs)
    }

    pub fn offline_check_interval(&self) -> TimeDelta {
        seconds(self.offline_check_interval_secs)
    }

    pub fn stale_threshold(&self) -> TimeDelta {
        seconds(self.stale_after_secs)
    }

    pub fn age_threshold(&self) -> TimeDelta {
        hours(self.age_threshold_hours)
    }

    pub fn startup_backfill(&self) -> TimeDelta {
        hours(self.startup_backfill_hours)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Windowed mode is selected by the presence of the sentinel file
    pub fn windowed(&self) -> bool {
        self.windowed_sentinel.is_file()
    }
}
