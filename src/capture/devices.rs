use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// A device as reported by the host listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub kind: MediaDeviceKind,
    pub label: String,
    pub group_id: String,
}

impl MediaDeviceInfo {
    pub fn new(device_id: impl Into<String>, kind: MediaDeviceKind, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            kind,
            label: label.into(),
            group_id: String::new(),
        }
    }

    pub fn is_camera(&self) -> bool {
        self.kind == MediaDeviceKind::VideoInput
    }
}

impl fmt::Display for MediaDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "{}", self.device_id)
        } else {
            write!(f, "{} ({})", self.label, self.device_id)
        }
    }
}

/// Keep only the video inputs of a host listing.
pub fn cameras(devices: Vec<MediaDeviceInfo>) -> Vec<MediaDeviceInfo> {
    devices.into_iter().filter(MediaDeviceInfo::is_camera).collect()
}
