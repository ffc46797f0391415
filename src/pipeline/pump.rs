//! Frame pump
//!
//! Reads raw frames from a capture track and hands them to a sender, one at a
//! time, through a single reusable buffer.

use crate::capture::{FrameGuard, ReaderGuard, TrackRead, VideoPixelFormat, VideoTrack};
use crate::pipeline::PipelineStage;
use crate::pipeline::buffer::FrameBuffer;
use crate::pipeline::health::PipelineHealth;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Outbound consumer of raw frames (the network sender).
///
/// `buffer` is only valid for the duration of the call.
pub trait VideoFrameSender: Send + Sync {
    fn send_video_frame(&self, width: u32, height: u32, format: VideoPixelFormat, buffer: &[u8]);
}

/// Identity of the stream/sender pairing a pump was spawned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpToken {
    pub stream_generation: u64,
    pub sender_generation: u64,
}

/// Whoever spawned the pump. Consulted on every iteration.
pub trait PumpOwner: Send + Sync {
    /// The pump keeps running only while this returns true.
    fn is_current(&self, token: PumpToken) -> bool;

    /// Called exactly once when the pump loop has exited.
    fn pump_finished(&self, token: PumpToken);
}

/// Reports the end of a pump to its owner when dropped, including on unwind.
struct FinishGuard {
    owner: Arc<dyn PumpOwner>,
    token: PumpToken,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.owner.pump_finished(self.token);
    }
}

pub struct FramePump {
    token: PumpToken,
    track: Arc<dyn VideoTrack>,
    sender: Arc<dyn VideoFrameSender>,
    owner: Arc<dyn PumpOwner>,
    buffer: FrameBuffer,
    health: Arc<PipelineHealth>,
}

impl FramePump {
    pub fn new(
        token: PumpToken,
        track: Arc<dyn VideoTrack>,
        sender: Arc<dyn VideoFrameSender>,
        owner: Arc<dyn PumpOwner>,
        buffer: FrameBuffer,
        health: Arc<PipelineHealth>,
    ) -> Self {
        Self {
            token,
            track,
            sender,
            owner,
            buffer,
            health,
        }
    }

    pub fn token(&self) -> PumpToken {
        self.token
    }

    /// Run the pump on the current runtime. The owner is notified when the
    /// loop exits, whatever the reason, a panicking sender included.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let _finished = FinishGuard {
                owner: Arc::clone(&self.owner),
                token: self.token,
            };
            if let Err(e) = self.run().await {
                error!("{}: {:#}", self.name(), e);
            }
        })
    }

    /// Send one frame. The frame is closed when `frame` drops, on every path.
    fn forward(&mut self, frame: FrameGuard) -> Result<bool> {
        let tag = frame.format().unwrap_or(VideoPixelFormat::DEFAULT_TAG);
        let Some(format) = VideoPixelFormat::from_tag(tag) else {
            warn!("Unsupported video frame format: {}", tag);
            self.health.record_format_rejection();
            return Ok(false);
        };

        let written = frame.copy_to(self.buffer.as_mut_slice())?;
        let pixels = self.buffer.filled(written).ok_or_else(|| {
            anyhow!(
                "frame wrote {} bytes into a {} byte buffer",
                written,
                self.buffer.capacity()
            )
        })?;

        self.sender
            .send_video_frame(frame.coded_width(), frame.coded_height(), format, pixels);
        self.health.record_frame_sent(written);
        Ok(true)
    }
}

#[async_trait]
impl PipelineStage for FramePump {
    async fn run(&mut self) -> Result<()> {
        // lock released when `reader` drops, including on early return
        let mut reader = ReaderGuard::new(self.track.reader()?);
        let mut sent = 0u64;
        info!("{}: started {:?}", self.name(), self.token);

        while self.owner.is_current(self.token) {
            let frame = match reader.read().await? {
                TrackRead::Done => {
                    debug!("{}: end of stream", self.name());
                    break;
                }
                TrackRead::Empty => {
                    self.health.record_empty_read();
                    continue;
                }
                TrackRead::Frame(frame) => FrameGuard::new(frame),
            };

            // stream or sender may have changed while we were waiting
            if !self.owner.is_current(self.token) {
                break;
            }

            if !self.forward(frame)? {
                break;
            }
            sent += 1;
        }

        info!("{}: finished, {} frames sent", self.name(), sent);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "FramePump"
    }
}
