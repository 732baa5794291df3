//! Request shapes handed to the platform capture and recording APIs.
//!
//! These serialize to exactly the dictionaries `getDisplayMedia` and the
//! `MediaRecorder` constructor expect, so the browser glue can pass them
//! through `serde-wasm-bindgen` without building objects by hand.

use crate::config::RecordingConfiguration;
use serde::{Deserialize, Serialize};

/// `{ ideal: value }` hint; the platform may substitute another value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ideal<T> {
    pub ideal: T,
}

impl<T> Ideal<T> {
    pub fn new(ideal: T) -> Self {
        Self { ideal }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConstraints {
    pub width: Ideal<u32>,
    pub height: Ideal<u32>,
    pub frame_rate: Ideal<u32>,
}

/// Display capture request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub audio: bool,
    pub video: VideoConstraints,
}

impl CaptureConstraints {
    pub fn from_config(config: &RecordingConfiguration) -> Self {
        let (width, height) = config.resolution.dimensions();
        Self {
            audio: config.audio_enabled,
            video: VideoConstraints {
                width: Ideal::new(width),
                height: Ideal::new(height),
                frame_rate: Ideal::new(config.frame_rate.fps()),
            },
        }
    }
}

/// Options for constructing the recording sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderOptions {
    pub mime_type: String,
    /// Target rate only; the encoder decides what it actually achieves
    pub video_bits_per_second: u32,
}

impl RecorderOptions {
    pub fn from_config(config: &RecordingConfiguration, mime_type: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            video_bits_per_second: config.bitrate.bits_per_second(),
        }
    }

    /// Container type without codec parameters, e.g. `video/webm`
    pub fn container_type(&self) -> &str {
        self.mime_type
            .split(';')
            .next()
            .map(str::trim)
            .unwrap_or(&self.mime_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Bitrate, FrameRate, Resolution};

    #[test]
    fn test_capture_constraints_shape() {
        let config = RecordingConfiguration {
            audio_enabled: false,
            frame_rate: FrameRate::Fps30,
            resolution: Resolution::Hd1080,
            bitrate: Bitrate::default(),
        };

        let constraints = CaptureConstraints::from_config(&config);
        let json = serde_json::to_value(constraints).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "audio": false,
                "video": {
                    "width": { "ideal": 1920 },
                    "height": { "ideal": 1080 },
                    "frameRate": { "ideal": 30 }
                }
            })
        );
    }

    #[test]
    fn test_capture_constraints_follow_audio_toggle() {
        let config = RecordingConfiguration {
            audio_enabled: true,
            resolution: Resolution::Uhd4k,
            frame_rate: FrameRate::Fps60,
            ..Default::default()
        };
        let constraints = CaptureConstraints::from_config(&config);
        assert!(constraints.audio);
        assert_eq!(constraints.video.width.ideal, 3840);
        assert_eq!(constraints.video.height.ideal, 2160);
        assert_eq!(constraints.video.frame_rate.ideal, 60);
    }

    #[test]
    fn test_recorder_options() {
        let config = RecordingConfiguration {
            bitrate: Bitrate::from_kbps(2500).unwrap(),
            ..Default::default()
        };
        let options = RecorderOptions::from_config(&config, "video/webm;codecs=vp9,opus");
        assert_eq!(options.video_bits_per_second, 2_500_000);
        assert_eq!(options.container_type(), "video/webm");

        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"mimeType\""));
        assert!(json.contains("\"videoBitsPerSecond\":2500000"));
    }
}
