//! In-memory collaborators for unit tests

use super::devices::{MediaDeviceInfo, MediaDeviceKind};
use super::options::StreamConstraints;
use super::pixel_format::VideoPixelFormat;
use super::traits::{FrameReader, MediaDevices, MediaStream, TrackRead, VideoFrame, VideoTrack};
use crate::pipeline::VideoFrameSender;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc, oneshot};

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

// ── Frames ──────────────────────────────────────────────────────

pub struct FakeFrame {
    format: Option<&'static str>,
    width: u32,
    height: u32,
    fill: u8,
    closes: Arc<AtomicUsize>,
}

impl FakeFrame {
    pub fn new(format: Option<&'static str>, width: u32, height: u32, fill: u8) -> Self {
        Self {
            format,
            width,
            height,
            fill,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn closes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

impl VideoFrame for FakeFrame {
    fn format(&self) -> Option<&str> {
        self.format
    }

    fn coded_width(&self) -> u32 {
        self.width
    }

    fn coded_height(&self) -> u32 {
        self.height
    }

    fn copy_to(&self, buffer: &mut [u8]) -> Result<usize> {
        let size = VideoPixelFormat::from_tag(self.format.unwrap_or(VideoPixelFormat::DEFAULT_TAG))
            .map_or(self.width as usize * self.height as usize * 4, |f| {
                f.frame_size(self.width, self.height)
            });
        if size > buffer.len() {
            bail!("destination too small: {} < {}", buffer.len(), size);
        }
        buffer[..size].fill(self.fill);
        Ok(size)
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Tracks ──────────────────────────────────────────────────────

/// Counts simultaneously held readers, across tracks when shared.
#[derive(Default)]
pub struct ReaderCount {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ReaderCount {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

enum Item {
    Frame(FakeFrame),
    Empty,
    End,
}

#[derive(Default)]
struct TrackQueue {
    items: VecDeque<Item>,
    stopped: bool,
    locked: bool,
}

struct TrackShared {
    queue: Mutex<TrackQueue>,
    notify: Notify,
    stops: AtomicUsize,
    releases: AtomicUsize,
    readers: Arc<ReaderCount>,
}

/// Track fed by hand. Reads block until something is pushed or the track
/// is stopped.
pub struct FakeTrack {
    shared: Arc<TrackShared>,
}

impl FakeTrack {
    pub fn new() -> Arc<Self> {
        Self::with_counter(Arc::new(ReaderCount::default()))
    }

    pub fn with_counter(readers: Arc<ReaderCount>) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(TrackShared {
                queue: Mutex::new(TrackQueue::default()),
                notify: Notify::new(),
                stops: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
                readers,
            }),
        })
    }

    fn push(&self, item: Item) {
        self.shared.queue.lock().unwrap().items.push_back(item);
        self.shared.notify.notify_one();
    }

    pub fn push_frame(&self, frame: FakeFrame) {
        self.push(Item::Frame(frame));
    }

    pub fn push_empty(&self) {
        self.push(Item::Empty);
    }

    /// End of stream once the queued items are consumed.
    pub fn end(&self) {
        self.push(Item::End);
    }

    /// Stop as the hardware would: pending and later reads end immediately.
    pub fn stop_now(&self) {
        self.stop();
    }

    pub fn stops(&self) -> usize {
        self.shared.stops.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.shared.releases.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_readers(&self) -> usize {
        self.shared.readers.max()
    }
}

impl VideoTrack for FakeTrack {
    fn stop(&self) {
        self.shared.queue.lock().unwrap().stopped = true;
        self.shared.stops.fetch_add(1, Ordering::SeqCst);
        self.shared.notify.notify_one();
    }

    fn reader(&self) -> Result<Box<dyn FrameReader>> {
        let mut queue = self.shared.queue.lock().unwrap();
        if queue.locked {
            bail!("track is already locked to a reader");
        }
        queue.locked = true;
        self.shared.readers.enter();
        Ok(Box::new(FakeReader {
            shared: Arc::clone(&self.shared),
            released: false,
        }))
    }
}

struct FakeReader {
    shared: Arc<TrackShared>,
    released: bool,
}

#[async_trait]
impl FrameReader for FakeReader {
    async fn read(&mut self) -> Result<TrackRead> {
        loop {
            {
                let mut queue = self.shared.queue.lock().unwrap();
                if queue.stopped {
                    return Ok(TrackRead::Done);
                }
                match queue.items.pop_front() {
                    Some(Item::Frame(frame)) => return Ok(TrackRead::Frame(Box::new(frame))),
                    Some(Item::Empty) => return Ok(TrackRead::Empty),
                    Some(Item::End) => return Ok(TrackRead::Done),
                    None => {}
                }
            }
            self.shared.notify.notified().await;
        }
    }

    fn release_lock(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        self.shared.queue.lock().unwrap().locked = false;
        self.shared.releases.fetch_add(1, Ordering::SeqCst);
        self.shared.readers.leave();
    }
}

// ── Streams ─────────────────────────────────────────────────────

pub struct FakeStream {
    id: String,
    track: Arc<FakeTrack>,
}

impl FakeStream {
    pub fn new(id: &str) -> Arc<Self> {
        Self::with_counter(id, Arc::new(ReaderCount::default()))
    }

    pub fn with_counter(id: &str, readers: Arc<ReaderCount>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_owned(),
            track: FakeTrack::with_counter(readers),
        })
    }

    pub fn track(&self) -> Arc<FakeTrack> {
        Arc::clone(&self.track)
    }
}

impl MediaStream for FakeStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn video_tracks(&self) -> Vec<Arc<dyn VideoTrack>> {
        vec![self.track.clone() as Arc<dyn VideoTrack>]
    }
}

// ── Sender ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub width: u32,
    pub height: u32,
    pub format: VideoPixelFormat,
    pub len: usize,
    pub first_byte: u8,
}

#[derive(Default)]
pub struct RecordingSender {
    frames: Mutex<Vec<SentFrame>>,
}

impl RecordingSender {
    pub fn frames(&self) -> Vec<SentFrame> {
        self.frames.lock().unwrap().clone()
    }
}

impl VideoFrameSender for RecordingSender {
    fn send_video_frame(&self, width: u32, height: u32, format: VideoPixelFormat, buffer: &[u8]) {
        self.frames.lock().unwrap().push(SentFrame {
            width,
            height,
            format,
            len: buffer.len(),
            first_byte: buffer.first().copied().unwrap_or_default(),
        });
    }
}

// ── Devices ─────────────────────────────────────────────────────

type Opened = Arc<Mutex<Vec<Arc<FakeStream>>>>;

/// An open request held back until the test decides its outcome.
pub struct PendingRequest {
    pub constraints: StreamConstraints,
    reply: oneshot::Sender<Result<Arc<FakeStream>>>,
    readers: Arc<ReaderCount>,
    opened: Opened,
}

impl PendingRequest {
    pub fn resolve(self, id: &str) -> Arc<FakeStream> {
        let stream = FakeStream::with_counter(id, self.readers);
        self.opened.lock().unwrap().push(Arc::clone(&stream));
        let _ = self.reply.send(Ok(Arc::clone(&stream)));
        stream
    }

    pub fn fail(self) {
        let _ = self.reply.send(Err(anyhow!("permission denied")));
    }
}

/// Device provider. In auto mode every open succeeds right away; in manual
/// mode requests are handed to the test through a channel.
pub struct FakeDevices {
    manual: Option<mpsc::UnboundedSender<PendingRequest>>,
    fail_next: AtomicBool,
    requests: Mutex<Vec<StreamConstraints>>,
    opened: Opened,
    readers: Arc<ReaderCount>,
}

impl FakeDevices {
    fn build(manual: Option<mpsc::UnboundedSender<PendingRequest>>) -> Arc<Self> {
        Arc::new(Self {
            manual,
            fail_next: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
            opened: Arc::new(Mutex::new(Vec::new())),
            readers: Arc::new(ReaderCount::default()),
        })
    }

    pub fn auto() -> Arc<Self> {
        Self::build(None)
    }

    pub fn manual() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::build(Some(tx)), rx)
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn constraints(&self, index: usize) -> StreamConstraints {
        self.requests.lock().unwrap()[index].clone()
    }

    pub fn opened(&self, index: usize) -> Arc<FakeStream> {
        Arc::clone(&self.opened.lock().unwrap()[index])
    }

    pub fn last_opened(&self) -> Arc<FakeStream> {
        let opened = self.opened.lock().unwrap();
        Arc::clone(opened.last().unwrap())
    }

    /// Highest number of readers held at once across every opened stream.
    pub fn max_concurrent_readers(&self) -> usize {
        self.readers.max()
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>> {
        Ok(vec![
            MediaDeviceInfo::new("cam-a", MediaDeviceKind::VideoInput, "Front camera"),
            MediaDeviceInfo::new("mic", MediaDeviceKind::AudioInput, "Microphone"),
            MediaDeviceInfo::new("cam-b", MediaDeviceKind::VideoInput, "USB camera"),
            MediaDeviceInfo::new("spk", MediaDeviceKind::AudioOutput, "Speakers"),
        ])
    }

    async fn get_user_media(&self, constraints: &StreamConstraints) -> Result<Arc<dyn MediaStream>> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(constraints.clone());
            requests.len()
        };
        if self.fail_next.swap(false, Ordering::SeqCst) {
            bail!("permission denied");
        }

        let stream: Arc<dyn MediaStream> = match &self.manual {
            None => {
                let stream = FakeStream::with_counter(&format!("stream-{index}"), Arc::clone(&self.readers));
                self.opened.lock().unwrap().push(Arc::clone(&stream));
                stream
            }
            Some(requests) => {
                let (reply, response) = oneshot::channel();
                requests
                    .send(PendingRequest {
                        constraints: constraints.clone(),
                        reply,
                        readers: Arc::clone(&self.readers),
                        opened: Arc::clone(&self.opened),
                    })
                    .map_err(|_| anyhow!("test dropped the request channel"))?;
                response
                    .await
                    .map_err(|_| anyhow!("request dropped without an answer"))??
            }
        };
        Ok(stream)
    }
}
