//! Traits for the capture collaborators
//!
//! Device access, streams, tracks and frames are provided by the host. The
//! capturer only talks to them through these traits.

use super::devices::MediaDeviceInfo;
use super::options::StreamConstraints;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Device listing and stream opening
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Every device known to the host, of any kind.
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>>;

    /// Open a stream. May take arbitrarily long (permission prompts).
    async fn get_user_media(&self, constraints: &StreamConstraints) -> Result<Arc<dyn MediaStream>>;
}

/// A live stream handle holding one or more video tracks
pub trait MediaStream: Send + Sync {
    /// Identity of the stream, used to tell whether a preview already shows it.
    fn id(&self) -> &str;

    fn video_tracks(&self) -> Vec<Arc<dyn VideoTrack>>;

    /// Stop every video track. Turns the camera hardware off.
    fn stop_video_tracks(&self) {
        for track in self.video_tracks() {
            track.stop();
        }
    }
}

pub trait VideoTrack: Send + Sync {
    fn stop(&self);

    /// Take the exclusive read handle on this track.
    fn reader(&self) -> Result<Box<dyn FrameReader>>;
}

/// Result of a single read on a track
pub enum TrackRead {
    Frame(Box<dyn VideoFrame>),
    /// The producer woke us up without a frame.
    Empty,
    /// End of stream, no more frames will come.
    Done,
}

/// Exclusive read handle on a track
#[async_trait]
pub trait FrameReader: Send {
    async fn read(&mut self) -> Result<TrackRead>;

    fn release_lock(&mut self);
}

/// A frame owned by the producer. It must be closed once consumed or the
/// producer stops delivering.
pub trait VideoFrame: Send {
    /// Pixel format tag such as `"I420"`, if the producer reports one.
    fn format(&self) -> Option<&str>;

    fn coded_width(&self) -> u32;

    fn coded_height(&self) -> u32;

    /// Copy pixel data into `buffer`, returning the number of bytes written.
    fn copy_to(&self, buffer: &mut [u8]) -> Result<usize>;

    fn close(&mut self);
}

/// Closes the wrapped frame when dropped, whatever path the caller took.
pub struct FrameGuard(Box<dyn VideoFrame>);

impl FrameGuard {
    pub fn new(frame: Box<dyn VideoFrame>) -> Self {
        Self(frame)
    }
}

impl std::ops::Deref for FrameGuard {
    type Target = dyn VideoFrame;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Releases the wrapped reader's lock when dropped.
pub struct ReaderGuard(Box<dyn FrameReader>);

impl ReaderGuard {
    pub fn new(reader: Box<dyn FrameReader>) -> Self {
        Self(reader)
    }

    pub async fn read(&mut self) -> Result<TrackRead> {
        self.0.read().await
    }
}

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        self.0.release_lock();
    }
}
