use crate::assets::{FRAME_HEIGHT, FRAME_RATE, FRAME_WIDTH};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Options for a single capture attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub max_framerate: u32,
    /// Overrides the capturer-wide preferred device for this attempt.
    pub preferred_device_id: Option<String>,
    /// When set, the attempt opens a screen share instead of a camera.
    pub screen_share_source_id: Option<String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        CaptureOptions {
            max_width: FRAME_WIDTH,
            max_height: FRAME_HEIGHT,
            max_framerate: FRAME_RATE,
            preferred_device_id: None,
            screen_share_source_id: None,
        }
    }
}

impl CaptureOptions {
    pub fn new(max_width: u32, max_height: u32, max_framerate: u32) -> Self {
        Self {
            max_width,
            max_height,
            max_framerate,
            ..Default::default()
        }
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.preferred_device_id = Some(device_id.into());
        self
    }

    pub fn with_screen_share(mut self, source_id: impl Into<String>) -> Self {
        self.screen_share_source_id = Some(source_id.into());
        self
    }

    pub fn is_screen_share(&self) -> bool {
        self.screen_share_source_id.is_some()
    }
}

/// What to ask the device provider for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamConstraints {
    Camera {
        device_id: Option<String>,
        max_width: u32,
        max_height: u32,
        max_framerate: u32,
    },
    ScreenShare {
        source_id: String,
        max_width: u32,
        max_height: u32,
        max_framerate: u32,
    },
}

impl StreamConstraints {
    /// Screen share wins over camera selection; the per-attempt device id wins
    /// over the capturer-wide preference.
    pub fn for_capture(options: &CaptureOptions, preferred_device_id: Option<&str>) -> Self {
        if let Some(source_id) = &options.screen_share_source_id {
            return StreamConstraints::ScreenShare {
                source_id: source_id.clone(),
                max_width: options.max_width,
                max_height: options.max_height,
                max_framerate: options.max_framerate,
            };
        }

        StreamConstraints::Camera {
            device_id: options
                .preferred_device_id
                .clone()
                .or_else(|| preferred_device_id.map(str::to_owned)),
            max_width: options.max_width,
            max_height: options.max_height,
            max_framerate: options.max_framerate,
        }
    }

    pub fn max_dimensions(&self) -> (u32, u32) {
        match self {
            StreamConstraints::Camera {
                max_width,
                max_height,
                ..
            }
            | StreamConstraints::ScreenShare {
                max_width,
                max_height,
                ..
            } => (*max_width, *max_height),
        }
    }

    /// Camera selected by these constraints, `None` for screen share or any camera.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            StreamConstraints::Camera { device_id, .. } => device_id.as_deref(),
            StreamConstraints::ScreenShare { .. } => None,
        }
    }

    pub fn max_framerate(&self) -> u32 {
        match self {
            StreamConstraints::Camera { max_framerate, .. }
            | StreamConstraints::ScreenShare { max_framerate, .. } => *max_framerate,
        }
    }

    /// Media constraints object as understood by `getUserMedia`-style providers.
    pub fn to_media_constraints(&self) -> Value {
        match self {
            StreamConstraints::Camera {
                device_id,
                max_width,
                max_height,
                max_framerate,
            } => json!({
                "audio": false,
                "video": {
                    "deviceId": device_id,
                    "width": { "max": max_width },
                    "height": { "max": max_height },
                    "frameRate": { "max": max_framerate },
                },
            }),
            StreamConstraints::ScreenShare {
                source_id,
                max_width,
                max_height,
                max_framerate,
            } => json!({
                "audio": false,
                "video": {
                    "mandatory": {
                        "chromeMediaSource": "desktop",
                        "chromeMediaSourceId": source_id,
                        "maxWidth": max_width,
                        "maxHeight": max_height,
                        "maxFrameRate": max_framerate,
                    },
                },
            }),
        }
    }
}
