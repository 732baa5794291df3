//! Capture parameters chosen by the user and the client's static configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Frame rates offered by the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FrameRate {
    Fps24,
    #[default]
    Fps30,
    Fps60,
}

impl FrameRate {
    pub const ALL: [FrameRate; 3] = [FrameRate::Fps24, FrameRate::Fps30, FrameRate::Fps60];

    pub fn fps(&self) -> u32 {
        match self {
            FrameRate::Fps24 => 24,
            FrameRate::Fps30 => 30,
            FrameRate::Fps60 => 60,
        }
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = ConfigError;

    fn try_from(fps: u32) -> Result<Self, Self::Error> {
        match fps {
            24 => Ok(FrameRate::Fps24),
            30 => Ok(FrameRate::Fps30),
            60 => Ok(FrameRate::Fps60),
            other => Err(ConfigError::FrameRate(other.to_string())),
        }
    }
}

impl From<FrameRate> for u32 {
    fn from(rate: FrameRate) -> u32 {
        rate.fps()
    }
}

impl FromStr for FrameRate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fps = s
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::FrameRate(s.to_string()))?;
        FrameRate::try_from(fps)
    }
}

/// Capture resolutions offered by the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    Hd720,
    #[default]
    Hd1080,
    Qhd1440,
    Uhd4k,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::Hd720,
        Resolution::Hd1080,
        Resolution::Qhd1440,
        Resolution::Uhd4k,
    ];

    /// Pixel dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Hd720 => (1280, 720),
            Resolution::Hd1080 => (1920, 1080),
            Resolution::Qhd1440 => (2560, 1440),
            Resolution::Uhd4k => (3840, 2160),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Hd720 => "720p",
            Resolution::Hd1080 => "1080p",
            Resolution::Qhd1440 => "1440p",
            Resolution::Uhd4k => "4K",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        write!(f, "{}x{}", width, height)
    }
}

/// Accepts both the `WIDTHxHEIGHT` option values and the human labels
impl FromStr for Resolution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Resolution::ALL
            .into_iter()
            .find(|r| r.to_string() == trimmed || r.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ConfigError::Resolution(s.to_string()))
    }
}

impl TryFrom<String> for Resolution {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Resolution> for String {
    fn from(resolution: Resolution) -> String {
        resolution.to_string()
    }
}

/// Target video bitrate in bits per second
///
/// The settings panel works in kbps; only multiples of the step inside the
/// bounds are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Bitrate(u32);

impl Bitrate {
    pub const MIN_KBPS: u32 = 1000;
    pub const MAX_KBPS: u32 = 8000;
    pub const STEP_KBPS: u32 = 500;

    pub fn from_kbps(kbps: u32) -> Result<Self, ConfigError> {
        if !(Self::MIN_KBPS..=Self::MAX_KBPS).contains(&kbps) || kbps % Self::STEP_KBPS != 0 {
            return Err(ConfigError::Bitrate(kbps));
        }
        Ok(Bitrate(kbps * 1000))
    }

    /// Parse the numeric input field, which holds kbps
    pub fn parse_kbps(input: &str) -> Result<Self, ConfigError> {
        let kbps = input
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::BitrateInput(input.to_string()))?;
        Self::from_kbps(kbps)
    }

    pub fn bits_per_second(&self) -> u32 {
        self.0
    }

    pub fn kbps(&self) -> u32 {
        self.0 / 1000
    }
}

impl Default for Bitrate {
    fn default() -> Self {
        Bitrate(6_000_000)
    }
}

impl TryFrom<u32> for Bitrate {
    type Error = ConfigError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        if bps % 1000 != 0 {
            return Err(ConfigError::Bitrate(bps / 1000));
        }
        Bitrate::from_kbps(bps / 1000)
    }
}

impl From<Bitrate> for u32 {
    fn from(bitrate: Bitrate) -> u32 {
        bitrate.0
    }
}

/// What gets stopped when a capture session is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownPolicy {
    /// Stop live video tracks only; audio tracks are left running
    #[default]
    VideoOnly,
    /// Stop every live track
    AllTracks,
}

/// Parameters for one recording, as chosen in the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingConfiguration {
    #[serde(default)]
    pub audio_enabled: bool,
    #[serde(default)]
    pub frame_rate: FrameRate,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub bitrate: Bitrate,
}

/// Top-level client configuration handed to the wasm entry point
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub edit: EditServiceConfig,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where and how recordings are sent for editing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditServiceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request deadline in seconds (0 = no deadline)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Multipart field carrying the video
    #[serde(default = "default_field_name")]
    pub field_name: String,

    #[serde(default = "default_file_name")]
    pub file_name: String,

    #[serde(default = "default_content_type")]
    pub content_type: String,
}

/// Recorder and teardown behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    #[serde(default)]
    pub teardown: TeardownPolicy,

    /// Stop recording when the user ends sharing from the browser UI
    #[serde(default = "default_stop_on_source_ended")]
    pub stop_on_source_ended: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:5000/edit_video".to_string()
}

fn default_timeout_secs() -> u64 {
    300 // encoding a long 4K capture can take minutes
}

fn default_field_name() -> String {
    "video".to_string()
}

fn default_file_name() -> String {
    "screen_recording.webm".to_string()
}

fn default_content_type() -> String {
    "video/webm".to_string()
}

fn default_mime_type() -> String {
    "video/webm;codecs=vp9,opus".to_string()
}

fn default_stop_on_source_ended() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EditServiceConfig {
    /// Longest deadline a browser timer can hold (`setTimeout` takes an i32)
    pub const MAX_TIMEOUT_SECS: u64 = i32::MAX as u64 / 1000;

    /// Request deadline, saturated to `MAX_TIMEOUT_SECS`; `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs.min(Self::MAX_TIMEOUT_SECS))),
        }
    }
}

impl Default for EditServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            field_name: default_field_name(),
            file_name: default_file_name(),
            content_type: default_content_type(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            mime_type: default_mime_type(),
            teardown: TeardownPolicy::default(),
            stop_on_source_ended: default_stop_on_source_ended(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn from_json_or_default(json: &str) -> Self {
        Self::from_json(json).unwrap_or_else(|e| {
            log::warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }
}
