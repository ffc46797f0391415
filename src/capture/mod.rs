//! Video capture module
//!
//! Opens camera or screen-share streams through a host-provided device layer,
//! binds them to a local preview and pumps raw frames to a sender.

pub mod capturer;
pub mod devices;
pub mod options;
pub mod pixel_format;
pub mod preview;
pub mod synthetic;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use capturer::VideoCapturer;
pub use devices::{MediaDeviceInfo, MediaDeviceKind};
pub use options::{CaptureOptions, StreamConstraints};
pub use pixel_format::VideoPixelFormat;
pub use preview::{PreviewRef, PreviewSurface, VideoElement};
pub use synthetic::SyntheticDevices;
pub use traits::{
    FrameGuard, FrameReader, MediaDevices, MediaStream, ReaderGuard, TrackRead, VideoFrame,
    VideoTrack,
};
