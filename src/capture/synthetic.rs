//! Synthetic capture devices
//!
//! Device provider producing a moving RGBA test pattern. Used by the demo
//! binary and wherever a real camera is not available.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::devices::{MediaDeviceInfo, MediaDeviceKind};
use super::options::StreamConstraints;
use super::pixel_format::VideoPixelFormat;
use super::traits::{FrameReader, MediaDevices, MediaStream, TrackRead, VideoFrame, VideoTrack};

/// Native resolution of every synthetic source.
pub const SYNTHETIC_WIDTH: u32 = 1280;
pub const SYNTHETIC_HEIGHT: u32 = 720;

pub struct SyntheticDevices {
    devices: Vec<MediaDeviceInfo>,
    native: (u32, u32),
    opened: AtomicU64,
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self::new(vec![
            MediaDeviceInfo::new("synthetic-front", MediaDeviceKind::VideoInput, "Synthetic front camera"),
            MediaDeviceInfo::new("synthetic-rear", MediaDeviceKind::VideoInput, "Synthetic rear camera"),
            MediaDeviceInfo::new("synthetic-mic", MediaDeviceKind::AudioInput, "Synthetic microphone"),
        ])
    }
}

impl SyntheticDevices {
    pub fn new(devices: Vec<MediaDeviceInfo>) -> Self {
        Self {
            devices,
            native: (SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT),
            opened: AtomicU64::new(0),
        }
    }

    pub fn with_native_size(mut self, width: u32, height: u32) -> Self {
        self.native = (width, height);
        self
    }

    /// Seed for the pattern so different sources look different.
    fn resolve_source(&self, constraints: &StreamConstraints) -> Result<(String, u8)> {
        match constraints {
            StreamConstraints::ScreenShare { source_id, .. } => Ok((format!("screen:{source_id}"), 0x40)),
            StreamConstraints::Camera { device_id, .. } => {
                let mut cameras = self.devices.iter().enumerate().filter(|(_, d)| d.is_camera());
                let found = match device_id {
                    Some(id) => cameras.find(|(_, d)| &d.device_id == id),
                    None => cameras.next(),
                };
                let (index, device) =
                    found.ok_or_else(|| anyhow!("no camera matches {:?}", device_id))?;
                Ok((device.device_id.clone(), 0x80u8.wrapping_add((index as u8).wrapping_mul(0x20))))
            }
        }
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>> {
        Ok(self.devices.clone())
    }

    async fn get_user_media(&self, constraints: &StreamConstraints) -> Result<Arc<dyn MediaStream>> {
        let (source, seed) = self.resolve_source(constraints)?;
        let (max_width, max_height) = constraints.max_dimensions();
        let width = self.native.0.min(max_width);
        let height = self.native.1.min(max_height);
        if width == 0 || height == 0 {
            bail!("{} cannot satisfy {}x{}", source, max_width, max_height);
        }

        let n = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("{source}#{n}");
        debug!("Opened synthetic stream {} at {}x{}", id, width, height);

        Ok(Arc::new(SyntheticStream {
            id,
            track: Arc::new(SyntheticTrack {
                width,
                height,
                period: Duration::from_secs(1) / constraints.max_framerate().max(1),
                seed,
                stop: CancellationToken::new(),
                locked: Arc::new(AtomicBool::new(false)),
            }),
        }))
    }
}

pub struct SyntheticStream {
    id: String,
    track: Arc<SyntheticTrack>,
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn video_tracks(&self) -> Vec<Arc<dyn VideoTrack>> {
        vec![self.track.clone() as Arc<dyn VideoTrack>]
    }
}

pub struct SyntheticTrack {
    width: u32,
    height: u32,
    period: Duration,
    seed: u8,
    stop: CancellationToken,
    locked: Arc<AtomicBool>,
}

impl VideoTrack for SyntheticTrack {
    fn stop(&self) {
        self.stop.cancel();
    }

    fn reader(&self) -> Result<Box<dyn FrameReader>> {
        if self.locked.swap(true, Ordering::AcqRel) {
            bail!("track is already locked to a reader");
        }
        Ok(Box::new(SyntheticReader {
            width: self.width,
            height: self.height,
            period: self.period,
            seed: self.seed,
            stop: self.stop.clone(),
            locked: Arc::clone(&self.locked),
            interval: None,
            frame_no: 0,
        }))
    }
}

struct SyntheticReader {
    width: u32,
    height: u32,
    period: Duration,
    seed: u8,
    stop: CancellationToken,
    locked: Arc<AtomicBool>,
    interval: Option<Interval>,
    frame_no: u32,
}

impl SyntheticReader {
    /// Diagonal gradient scrolling one pixel per frame.
    fn render(&self) -> Bytes {
        let mut data = BytesMut::with_capacity(VideoPixelFormat::Rgba.frame_size(self.width, self.height));
        for y in 0..self.height {
            for x in 0..self.width {
                data.put_slice(&[
                    x.wrapping_add(self.frame_no) as u8,
                    y.wrapping_add(self.frame_no) as u8,
                    self.seed,
                    0xff,
                ]);
            }
        }
        data.freeze()
    }
}

#[async_trait]
impl FrameReader for SyntheticReader {
    async fn read(&mut self) -> Result<TrackRead> {
        if self.stop.is_cancelled() {
            return Ok(TrackRead::Done);
        }

        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        tokio::select! {
            biased;
            _ = self.stop.cancelled() => return Ok(TrackRead::Done),
            _ = interval.tick() => {}
        }

        self.frame_no = self.frame_no.wrapping_add(1);
        Ok(TrackRead::Frame(Box::new(SyntheticFrame {
            width: self.width,
            height: self.height,
            data: self.render(),
        })))
    }

    fn release_lock(&mut self) {
        self.locked.store(false, Ordering::Release);
    }
}

struct SyntheticFrame {
    width: u32,
    height: u32,
    data: Bytes,
}

impl VideoFrame for SyntheticFrame {
    fn format(&self) -> Option<&str> {
        Some(VideoPixelFormat::Rgba.as_tag())
    }

    fn coded_width(&self) -> u32 {
        self.width
    }

    fn coded_height(&self) -> u32 {
        self.height
    }

    fn copy_to(&self, buffer: &mut [u8]) -> Result<usize> {
        let (len, available) = (self.data.len(), buffer.len());
        let dst = buffer
            .get_mut(..len)
            .ok_or_else(|| anyhow!("destination holds {} bytes, frame needs {}", available, len))?;
        dst.copy_from_slice(&self.data);
        Ok(len)
    }

    fn close(&mut self) {
        self.data.clear();
    }
}
