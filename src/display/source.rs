//! Render sources

use crate::capture::VideoPixelFormat;
use crate::pipeline::VideoFrameSender;
use bytes::BytesMut;
use log::debug;
use std::sync::{Mutex, PoisonError};

/// Where the renderer pulls decoded frames from.
pub trait VideoFrameSource: Send + Sync {
    /// Copy the newest RGBA frame into `buffer` and return its size, or `None`
    /// when there is nothing new to draw.
    fn receive_video_frame(&self, buffer: &mut [u8]) -> Option<(u32, u32)>;
}

#[derive(Default)]
struct Latest {
    width: u32,
    height: u32,
    data: BytesMut,
    fresh: bool,
}

/// Sender that keeps the latest RGBA frame and serves it back as a render
/// source. Connects the capture side to the renderer without a network.
#[derive(Default)]
pub struct LoopbackSink {
    latest: Mutex<Latest>,
}

impl LoopbackSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame is waiting to be received.
    pub fn has_frame(&self) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fresh
    }
}

impl VideoFrameSender for LoopbackSink {
    fn send_video_frame(&self, width: u32, height: u32, format: VideoPixelFormat, buffer: &[u8]) {
        if format != VideoPixelFormat::Rgba {
            debug!("Loopback drops {} frame, only RGBA is rendered", format);
            return;
        }

        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        latest.width = width;
        latest.height = height;
        latest.data.clear();
        latest.data.extend_from_slice(buffer);
        latest.fresh = true;
    }
}

impl VideoFrameSource for LoopbackSink {
    fn receive_video_frame(&self, buffer: &mut [u8]) -> Option<(u32, u32)> {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if !latest.fresh {
            return None;
        }
        latest.fresh = false;

        let len = latest.data.len();
        let Some(dst) = buffer.get_mut(..len) else {
            debug!("Loopback frame of {} bytes does not fit the render buffer", len);
            return None;
        };
        dst.copy_from_slice(&latest.data);
        Some((latest.width, latest.height))
    }
}
