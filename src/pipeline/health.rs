//! Health monitoring and metrics for the video pipeline

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}

/// Health metrics shared by the capturer, its pumps and the renderer.
///
/// All fields use atomic operations for thread-safe access.
pub struct PipelineHealth {
    /// Frames handed to a sender
    pub frames_sent: AtomicU64,

    /// Bytes handed to a sender
    pub bytes_sent: AtomicU64,

    /// Reads that woke up without a frame
    pub empty_reads: AtomicU64,

    /// Frames whose pixel format was not supported
    pub format_rejections: AtomicU64,

    /// Device open requests that failed
    pub open_failures: AtomicU64,

    /// Device open requests that completed after being superseded
    pub superseded_opens: AtomicU64,

    /// Frames painted on a canvas
    pub frames_rendered: AtomicU64,

    /// Timestamp (as Unix microseconds) of the last frame sent
    pub last_frame_time: AtomicU64,
}

impl PipelineHealth {
    pub fn new() -> Self {
        Self {
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            empty_reads: AtomicU64::new(0),
            format_rejections: AtomicU64::new(0),
            open_failures: AtomicU64::new(0),
            superseded_opens: AtomicU64::new(0),
            frames_rendered: AtomicU64::new(0),
            last_frame_time: AtomicU64::new(now_micros()),
        }
    }

    pub fn record_frame_sent(&self, size: usize) {
        self.last_frame_time.store(now_micros(), Ordering::Relaxed);
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_empty_read(&self) {
        self.empty_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_format_rejection(&self) {
        self.format_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_open_failure(&self) {
        self.open_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded_open(&self) {
        self.superseded_opens.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_rendered(&self) {
        self.frames_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    /// Check if the sender side has stalled (no frames for given duration)
    pub fn is_stalled(&self, threshold: Duration) -> bool {
        let last_frame = self.last_frame_time.load(Ordering::Relaxed);
        now_micros().saturating_sub(last_frame) > threshold.as_micros() as u64
    }

    pub fn summary(&self) -> HealthSummary {
        HealthSummary {
            frames_sent: self.frames_sent(),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            empty_reads: self.empty_reads.load(Ordering::Relaxed),
            format_rejections: self.format_rejections.load(Ordering::Relaxed),
            open_failures: self.open_failures.load(Ordering::Relaxed),
            superseded_opens: self.superseded_opens.load(Ordering::Relaxed),
            frames_rendered: self.frames_rendered(),
        }
    }
}

impl Default for PipelineHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of health metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthSummary {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub empty_reads: u64,
    pub format_rejections: u64,
    pub open_failures: u64,
    pub superseded_opens: u64,
    pub frames_rendered: u64,
}

impl fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent={} ({} KiB), rendered={}, empty={}, rejected={}, open_failures={}, superseded={}",
            self.frames_sent,
            self.bytes_sent / 1024,
            self.frames_rendered,
            self.empty_reads,
            self.format_rejections,
            self.open_failures,
            self.superseded_opens
        )
    }
}
