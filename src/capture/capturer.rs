use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::capture::devices::{MediaDeviceInfo, cameras};
use crate::capture::options::{CaptureOptions, StreamConstraints};
use crate::capture::preview::{PreviewRef, apply_stream};
use crate::capture::traits::{MediaDevices, MediaStream};
use crate::config::Config;
use crate::pipeline::{
    CapturePhase, CaptureState, FrameBuffer, FramePump, PipelineHealth, PumpOwner, PumpState,
    PumpToken, VideoFrameSender,
};
use crate::utils::same_object;

// ── Internal state ──────────────────────────────────────────────

struct CapturerState {
    capture: CaptureState,
    /// Last generation handed out to a capture attempt.
    generation: u64,

    sender: Option<Arc<dyn VideoFrameSender>>,
    /// Bumped on every attach and detach.
    sender_generation: u64,

    pump: PumpState,
    preferred_device_id: Option<String>,

    preview: Option<Weak<PreviewRef>>,
    preview_resync: Option<CancellationToken>,
}

struct Shared {
    devices: Arc<dyn MediaDevices>,
    config: Config,
    health: Arc<PipelineHealth>,
    state: Mutex<CapturerState>,
}

/// An open request that has been registered and still has to be awaited.
struct PendingOpen {
    generation: u64,
    constraints: StreamConstraints,
}

// ── Capturer ────────────────────────────────────────────────────

/// Owns the capture lifecycle: device selection, the stream, the sender
/// binding, the local preview and the single frame pump.
///
/// Cheap to clone; clones drive the same capturer. The fire-and-forget
/// operations spawn on the current tokio runtime.
#[derive(Clone)]
pub struct VideoCapturer {
    shared: Arc<Shared>,
}

impl VideoCapturer {
    pub fn new(devices: Arc<dyn MediaDevices>, config: Config) -> Self {
        Self::with_health(devices, config, Arc::new(PipelineHealth::new()))
    }

    /// Share an existing health instance (e.g. with a renderer).
    pub fn with_health(
        devices: Arc<dyn MediaDevices>,
        config: Config,
        health: Arc<PipelineHealth>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                devices,
                config,
                health,
                state: Mutex::new(CapturerState {
                    capture: CaptureState::Idle,
                    generation: 0,
                    sender: None,
                    sender_generation: 0,
                    pump: PumpState::Idle,
                    preferred_device_id: None,
                    preview: None,
                    preview_resync: None,
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CapturerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capturing(&self) -> bool {
        self.lock().capture.is_capturing()
    }

    pub fn phase(&self) -> CapturePhase {
        self.lock().capture.phase()
    }

    pub fn is_pumping(&self) -> bool {
        self.lock().pump.is_running()
    }

    pub fn is_sending(&self) -> bool {
        self.lock().sender.is_some()
    }

    pub fn preferred_device(&self) -> Option<String> {
        self.lock().preferred_device_id.clone()
    }

    /// Stream of the active session, if any.
    pub fn stream(&self) -> Option<Arc<dyn MediaStream>> {
        self.lock().capture.stream().cloned()
    }

    pub fn health(&self) -> Arc<PipelineHealth> {
        Arc::clone(&self.shared.health)
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    // ── Public lifecycle ────────────────────────────────────────

    /// Start capturing with the default options and no sender.
    pub fn enable_capture(&self) {
        self.spawn_capture(self.shared.config.default_capture.clone());
    }

    /// Start capturing with `options` (or the defaults) and feed `sender`.
    pub fn enable_capture_and_send(
        &self,
        sender: Arc<dyn VideoFrameSender>,
        options: Option<CaptureOptions>,
    ) {
        self.spawn_capture(options.unwrap_or_else(|| self.shared.config.default_capture.clone()));
        self.start_sending(sender);
    }

    /// Stop capture, detach the sender and stop re-syncing the preview.
    pub fn disable(&self) {
        self.stop_capturing();
        self.stop_sending();
        if let Some(resync) = self.lock().preview_resync.take() {
            resync.cancel();
        }
    }

    /// Record the device to use. A running capture is restarted on it with
    /// the same options and sender.
    pub fn set_preferred_device(&self, device_id: impl Into<String>) {
        let device_id = device_id.into();
        let restart = {
            let mut state = self.lock();
            state.preferred_device_id = Some(device_id.clone());
            state
                .capture
                .options()
                .map(|options| (options.clone(), state.sender.clone()))
        };

        let Some((mut options, sender)) = restart else {
            debug!("Preferred device set to {}", device_id);
            return;
        };

        info!("Switching capture to device {}", device_id);
        self.stop_capturing();
        self.stop_sending();
        // the per-attempt override would shadow the new preference
        options.preferred_device_id = None;
        self.spawn_capture(options);
        if let Some(sender) = sender {
            self.start_sending(sender);
        }
    }

    /// Bind a new preview target. The previous target stops showing the
    /// stream; the new one is re-synced periodically since the host may
    /// swap the element behind the slot without telling us.
    pub fn set_local_preview(&self, preview: Option<Weak<PreviewRef>>) {
        let (old, resync) = {
            let mut state = self.lock();
            let old = std::mem::replace(&mut state.preview, preview.clone());
            (old, state.preview_resync.take())
        };
        if let Some(resync) = resync {
            resync.cancel();
        }

        if let Some(element) = old.and_then(|o| o.upgrade()).and_then(|r| r.current()) {
            element.set_src_object(None);
        }

        self.update_local_preview();

        if preview.is_some() {
            let token = self.spawn_preview_resync();
            self.lock().preview_resync = Some(token);
        }
    }

    /// Video input devices only.
    pub async fn enumerate_devices(&self) -> Vec<MediaDeviceInfo> {
        match self.shared.devices.enumerate_devices().await {
            Ok(devices) => cameras(devices),
            Err(e) => {
                warn!("Failed to enumerate devices: {:#}", e);
                Vec::new()
            }
        }
    }

    // ── Capture ─────────────────────────────────────────────────

    /// Open a stream for `options` and wait for the outcome. No-op while a
    /// session exists (opening or active).
    pub async fn start_capturing(&self, options: CaptureOptions) {
        if let Some(pending) = self.begin_capture(options) {
            self.complete_capture(pending).await;
        }
    }

    /// Like `start_capturing`, but the session is registered right away and
    /// only the open request runs in the background.
    fn spawn_capture(&self, options: CaptureOptions) {
        if let Some(pending) = self.begin_capture(options) {
            let this = self.clone();
            tokio::spawn(async move { this.complete_capture(pending).await });
        }
    }

    fn begin_capture(&self, options: CaptureOptions) -> Option<PendingOpen> {
        let mut state = self.lock();
        if state.capture.is_capturing() {
            return None;
        }

        state.generation += 1;
        let generation = state.generation;
        let constraints =
            StreamConstraints::for_capture(&options, state.preferred_device_id.as_deref());
        state.capture = CaptureState::Opening {
            generation,
            options,
        };
        debug!("Capture attempt {} opening {:?}", generation, constraints);

        Some(PendingOpen {
            generation,
            constraints,
        })
    }

    async fn complete_capture(&self, pending: PendingOpen) {
        let PendingOpen {
            generation: attempt,
            constraints,
        } = pending;

        // Several opens may be in flight after start/stop/start sequences
        // (e.g. camera to screen share). Only the current attempt may apply.
        match self.shared.devices.get_user_media(&constraints).await {
            Ok(stream) => {
                let accepted = {
                    let mut state = self.lock();
                    match std::mem::take(&mut state.capture) {
                        CaptureState::Opening {
                            generation,
                            options,
                        } if generation == attempt => {
                            state.capture = CaptureState::Active {
                                generation,
                                options,
                                stream: Arc::clone(&stream),
                            };
                            true
                        }
                        other => {
                            state.capture = other;
                            false
                        }
                    }
                };

                if !accepted {
                    debug!(
                        "Capture attempt {} superseded, releasing stream {}",
                        attempt,
                        stream.id()
                    );
                    self.shared.health.record_superseded_open();
                    stream.stop_video_tracks();
                    return;
                }

                info!("Capture attempt {} active on stream {}", attempt, stream.id());
                self.maybe_spawn_pump();
                self.update_local_preview();
            }
            Err(e) => {
                self.shared.health.record_open_failure();
                let mut state = self.lock();
                if state.capture.is_pending(attempt) {
                    state.capture = CaptureState::Idle;
                    error!("Failed to open video capture: {:#}", e);
                } else {
                    debug!("Superseded capture attempt {} failed: {:#}", attempt, e);
                }
            }
        }
    }

    /// Drop the session and turn the hardware off. No-op when idle.
    pub fn stop_capturing(&self) {
        let stream = {
            let mut state = self.lock();
            if !state.capture.is_capturing() {
                return;
            }
            match std::mem::take(&mut state.capture) {
                CaptureState::Active { stream, .. } => Some(stream),
                _ => None,
            }
        };

        if let Some(stream) = stream {
            info!("Stopping capture on stream {}", stream.id());
            stream.stop_video_tracks();
        } else {
            debug!("Capture stopped while still opening");
        }
        self.update_local_preview();
    }

    // ── Sending ─────────────────────────────────────────────────

    pub fn start_sending(&self, sender: Arc<dyn VideoFrameSender>) {
        {
            let mut state = self.lock();
            if let Some(current) = &state.sender
                && same_object(current, &sender)
            {
                return;
            }
            // replacing the sender bumps the generation, so a pump feeding
            // the old one exits on its next check
            state.sender = Some(sender);
            state.sender_generation += 1;
        }
        self.maybe_spawn_pump();
    }

    /// Detach the sender. The running pump notices on its next iteration.
    pub fn stop_sending(&self) {
        let mut state = self.lock();
        if state.sender.take().is_some() {
            state.sender_generation += 1;
        }
    }

    /// Spawn a pump for the current stream and sender unless one is running.
    fn maybe_spawn_pump(&self) {
        let pump = {
            let mut state = self.lock();
            if state.pump.is_running() {
                return;
            }
            let CaptureState::Active {
                generation, stream, ..
            } = &state.capture
            else {
                return;
            };
            let Some(sender) = state.sender.clone() else {
                return;
            };
            let Some(track) = stream.video_tracks().into_iter().next() else {
                warn!("Stream {} has no video track", stream.id());
                return;
            };

            let token = PumpToken {
                stream_generation: *generation,
                sender_generation: state.sender_generation,
            };
            let running = PumpState::Running {
                stream_generation: token.stream_generation,
                sender_generation: token.sender_generation,
            };
            debug_assert!(state.pump.can_transition_to(&running));
            state.pump = running;

            FramePump::new(
                token,
                track,
                sender,
                Arc::new(self.clone()),
                FrameBuffer::new(self.shared.config.max_buffer_size()),
                Arc::clone(&self.shared.health),
            )
        };
        pump.spawn();
    }

    // ── Preview ─────────────────────────────────────────────────

    fn update_local_preview(&self) {
        let (preview, stream, size) = {
            let state = self.lock();
            let size = state
                .capture
                .options()
                .map(|o| (o.max_width, o.max_height))
                .unwrap_or_default();
            (
                state.preview.as_ref().and_then(Weak::upgrade),
                state.capture.stream().cloned(),
                size,
            )
        };

        let Some(element) = preview.and_then(|p| p.current()) else {
            return;
        };
        if apply_stream(element.as_ref(), stream.as_ref(), size) {
            debug!(
                "Local preview now shows {}",
                stream.as_ref().map_or("nothing", |s| s.id())
            );
        }
    }

    fn spawn_preview_resync(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let period = self.shared.config.preview_resync_interval();
        let weak = Arc::downgrade(&self.shared);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                VideoCapturer { shared }.update_local_preview();
            }
        });

        token
    }
}

impl PumpOwner for VideoCapturer {
    fn is_current(&self, token: PumpToken) -> bool {
        let state = self.lock();
        state.sender.is_some()
            && state.sender_generation == token.sender_generation
            && matches!(
                state.capture,
                CaptureState::Active { generation, .. } if generation == token.stream_generation
            )
    }

    fn pump_finished(&self, token: PumpToken) {
        let superseded = {
            let mut state = self.lock();
            let finished = PumpState::Running {
                stream_generation: token.stream_generation,
                sender_generation: token.sender_generation,
            };
            if state.pump == finished {
                state.pump = PumpState::Idle;
            }
            state.sender_generation != token.sender_generation
                || state.capture.generation() != Some(token.stream_generation)
        };

        // The pairing changed while this pump was still draining; hand over
        // to a pump for the new pairing. A pump that ended on its own
        // (end of stream, bad format) is not restarted.
        if superseded {
            self.maybe_spawn_pump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::VideoPixelFormat;
    use crate::capture::preview::{PreviewSurface, VideoElement};
    use crate::capture::testing::{FakeDevices, FakeFrame, RecordingSender, settle};
    use std::sync::atomic::Ordering;

    fn capturer(devices: &Arc<FakeDevices>) -> VideoCapturer {
        VideoCapturer::new(devices.clone(), Config::default())
    }

    #[tokio::test]
    async fn test_enable_and_disable() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);

        capturer.enable_capture();
        // the session exists before the open completes
        assert!(capturer.capturing());
        assert_eq!(capturer.phase(), CapturePhase::Opening);
        settle().await;
        assert_eq!(capturer.phase(), CapturePhase::Active);
        assert!(!capturer.is_pumping());

        let stream = devices.opened(0);
        capturer.disable();
        assert!(!capturer.capturing());
        assert_eq!(stream.track().stops(), 1);

        // idempotent
        capturer.disable();
        assert_eq!(stream.track().stops(), 1);
    }

    #[tokio::test]
    async fn test_open_failure_resets_state() {
        let devices = FakeDevices::auto();
        devices.fail_next();
        let capturer = capturer(&devices);

        capturer.enable_capture();
        settle().await;
        assert!(!capturer.capturing());
        assert_eq!(capturer.health().summary().open_failures, 1);

        // a later attempt works
        capturer.enable_capture();
        settle().await;
        assert!(capturer.capturing());
    }

    #[tokio::test]
    async fn test_superseded_open_is_released() {
        let (devices, mut requests) = FakeDevices::manual();
        let capturer = capturer(&devices);
        let sender = Arc::new(RecordingSender::default());

        capturer.enable_capture_and_send(sender.clone(), Some(CaptureOptions::new(320, 240, 15)));
        let first = requests.recv().await.unwrap();
        capturer.stop_capturing();
        capturer.enable_capture_and_send(sender.clone(), Some(CaptureOptions::new(1280, 720, 30)));
        let second = requests.recv().await.unwrap();
        assert_eq!(second.constraints.max_dimensions(), (1280, 720));

        let stale = first.resolve("stale");
        settle().await;
        assert_eq!(stale.track().stops(), 1);
        assert_eq!(capturer.phase(), CapturePhase::Opening);
        assert!(capturer.stream().is_none());
        assert!(!capturer.is_pumping());

        let fresh = second.resolve("fresh");
        settle().await;
        assert_eq!(capturer.stream().map(|s| s.id().to_owned()).as_deref(), Some("fresh"));
        assert_eq!(fresh.track().stops(), 0);
        assert!(capturer.is_pumping());
        assert_eq!(capturer.health().summary().superseded_opens, 1);
    }

    #[tokio::test]
    async fn test_superseded_failure_keeps_newer_attempt() {
        let (devices, mut requests) = FakeDevices::manual();
        let capturer = capturer(&devices);

        capturer.enable_capture();
        let first = requests.recv().await.unwrap();
        capturer.stop_capturing();
        capturer.enable_capture();
        let second = requests.recv().await.unwrap();

        first.fail();
        settle().await;
        assert_eq!(capturer.phase(), CapturePhase::Opening);

        second.resolve("ok");
        settle().await;
        assert_eq!(capturer.phase(), CapturePhase::Active);
    }

    #[tokio::test]
    async fn test_single_pump_across_toggles() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);
        let sender = Arc::new(RecordingSender::default());

        for _ in 0..5 {
            capturer.enable_capture_and_send(sender.clone(), None);
            settle().await;
            capturer.disable();
            capturer.enable_capture_and_send(sender.clone(), None);
        }
        settle().await;

        assert!(capturer.is_pumping());
        assert_eq!(devices.max_concurrent_readers(), 1);

        // only the live stream reaches the sender
        let live = devices.last_opened();
        live.track().push_frame(FakeFrame::new(Some("NV12"), 4, 2, 3));
        settle().await;
        let frames = sender.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].format, VideoPixelFormat::Nv12);
    }

    #[tokio::test]
    async fn test_restart_sends_only_new_stream() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);
        let sender = Arc::new(RecordingSender::default());

        capturer.enable_capture_and_send(sender.clone(), None);
        settle().await;
        let old = devices.opened(0);
        old.track().push_frame(FakeFrame::new(Some("RGBA"), 2, 2, 1));
        settle().await;
        assert_eq!(sender.frames().len(), 1);

        let opts = capturer.config().default_capture.clone();
        capturer.stop_capturing();
        capturer.start_capturing(opts).await;
        settle().await;

        let late = FakeFrame::new(Some("RGBA"), 2, 2, 2);
        let late_closes = late.closes();
        old.track().push_frame(late);
        let new = devices.opened(1);
        new.track().push_frame(FakeFrame::new(Some("RGBA"), 2, 2, 5));
        settle().await;

        let frames = sender.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].first_byte, 5);
        assert_eq!(late_closes.load(Ordering::SeqCst), 0);
        assert_eq!(old.track().stops(), 1);
        assert!(capturer.is_pumping());
    }

    #[tokio::test]
    async fn test_sender_swap_hands_over_pump() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);
        let first = Arc::new(RecordingSender::default());
        let second = Arc::new(RecordingSender::default());

        capturer.enable_capture_and_send(first.clone(), None);
        settle().await;
        // same sender again is a no-op
        capturer.start_sending(first.clone());
        capturer.start_sending(second.clone());
        settle().await;

        let stream = devices.opened(0);
        stream.track().push_frame(FakeFrame::new(Some("RGBA"), 2, 2, 1));
        stream.track().push_frame(FakeFrame::new(Some("RGBA"), 2, 2, 2));
        settle().await;

        // the old pump consumed one frame, saw the swap and handed over
        assert!(first.frames().is_empty());
        assert_eq!(second.frames().len(), 1);
        assert_eq!(second.frames()[0].first_byte, 2);
        assert!(capturer.is_pumping());
        assert_eq!(stream.track().max_concurrent_readers(), 1);
    }

    #[tokio::test]
    async fn test_stop_sending_keeps_capture() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);
        let sender = Arc::new(RecordingSender::default());

        capturer.enable_capture_and_send(sender.clone(), None);
        settle().await;
        capturer.stop_sending();
        let stream = devices.opened(0);
        stream.track().push_frame(FakeFrame::new(Some("RGBA"), 2, 2, 1));
        settle().await;

        assert!(sender.frames().is_empty());
        assert!(capturer.capturing());
        assert!(!capturer.is_pumping());
        assert_eq!(stream.track().releases(), 1);
    }

    #[tokio::test]
    async fn test_preferred_device_restarts_capture() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);
        let sender = Arc::new(RecordingSender::default());

        // not capturing: only recorded
        capturer.set_preferred_device("cam-a");
        assert!(!capturer.capturing());
        assert_eq!(devices.requests(), 0);

        capturer.enable_capture_and_send(sender.clone(), Some(CaptureOptions::default().with_device("cam-x")));
        settle().await;
        assert_eq!(devices.constraints(0).device_id(), Some("cam-x"));

        capturer.set_preferred_device("cam-b");
        assert!(capturer.capturing());
        settle().await;

        assert_eq!(devices.opened(0).track().stops(), 1);
        assert_eq!(devices.constraints(1).device_id(), Some("cam-b"));
        assert!(capturer.is_sending());
        assert!(capturer.is_pumping());
        assert_eq!(capturer.preferred_device().as_deref(), Some("cam-b"));
    }

    struct FailingSender;

    impl VideoFrameSender for FailingSender {
        fn send_video_frame(&self, _: u32, _: u32, _: VideoPixelFormat, _: &[u8]) {
            panic!("sender failed");
        }
    }

    #[tokio::test]
    async fn test_new_sender_after_sender_panic() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);

        capturer.enable_capture_and_send(Arc::new(FailingSender), None);
        settle().await;
        let stream = devices.opened(0);
        stream.track().push_frame(FakeFrame::new(Some("RGBA"), 2, 2, 1));
        settle().await;

        // the panicked pump still reported back and released the track
        assert!(!capturer.is_pumping());
        assert_eq!(stream.track().releases(), 1);

        let good = Arc::new(RecordingSender::default());
        capturer.start_sending(good.clone());
        settle().await;
        stream.track().push_frame(FakeFrame::new(Some("RGBA"), 2, 2, 2));
        settle().await;

        assert!(capturer.is_pumping());
        assert_eq!(good.frames().len(), 1);
        assert_eq!(good.frames()[0].first_byte, 2);
    }

    #[tokio::test]
    async fn test_preview_follows_current_stream() {
        let (devices, mut requests) = FakeDevices::manual();
        let capturer = capturer(&devices);
        let element = Arc::new(VideoElement::default());
        let preview = Arc::new(PreviewRef::new(Some(element.clone())));
        capturer.set_local_preview(Some(Arc::downgrade(&preview)));
        assert_eq!(element.stream_id(), None);

        capturer.enable_capture();
        let first = requests.recv().await.unwrap();
        capturer.stop_capturing();
        capturer.enable_capture();
        let second = requests.recv().await.unwrap();

        second.resolve("current");
        settle().await;
        first.resolve("stale");
        settle().await;

        assert_eq!(element.stream_id().as_deref(), Some("current"));
        assert_eq!((element.width(), element.height()), (640, 480));

        capturer.stop_capturing();
        assert_eq!(element.stream_id(), None);
    }

    #[tokio::test]
    async fn test_rebinding_preview_clears_old_target() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);
        capturer.enable_capture();
        settle().await;

        let old = Arc::new(VideoElement::default());
        let old_ref = Arc::new(PreviewRef::new(Some(old.clone())));
        capturer.set_local_preview(Some(Arc::downgrade(&old_ref)));
        assert!(old.stream_id().is_some());

        let new = Arc::new(VideoElement::default());
        let new_ref = Arc::new(PreviewRef::new(Some(new.clone())));
        capturer.set_local_preview(Some(Arc::downgrade(&new_ref)));
        assert_eq!(old.stream_id(), None);
        assert_eq!(new.stream_id(), capturer.stream().map(|s| s.id().to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_resync_repairs_swapped_element() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);
        capturer.enable_capture();
        settle().await;

        let preview = Arc::new(PreviewRef::new(Some(Arc::new(VideoElement::default()))));
        capturer.set_local_preview(Some(Arc::downgrade(&preview)));

        // the host remounts the element behind our back
        let remounted = Arc::new(VideoElement::default());
        preview.set(Some(remounted.clone()));
        assert_eq!(remounted.stream_id(), None);

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        settle().await;
        assert!(remounted.stream_id().is_some());

        // disable cancels the periodic re-sync
        capturer.disable();
        capturer.enable_capture();
        settle().await;
        let again = Arc::new(VideoElement::default());
        preview.set(Some(again.clone()));
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(again.stream_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_resync_survives_device_switch() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);
        let preview = Arc::new(PreviewRef::new(Some(Arc::new(VideoElement::default()))));
        capturer.set_local_preview(Some(Arc::downgrade(&preview)));
        capturer.enable_capture();
        settle().await;

        capturer.set_preferred_device("cam-b");
        settle().await;
        assert_eq!(devices.requests(), 2);

        let remounted = Arc::new(VideoElement::default());
        preview.set(Some(remounted.clone()));
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        settle().await;

        assert_eq!(remounted.stream_id().as_deref(), Some("stream-2"));
        assert_eq!(
            remounted.stream_id(),
            capturer.stream().map(|s| s.id().to_owned())
        );
    }

    #[tokio::test]
    async fn test_enumerate_only_cameras() {
        let devices = FakeDevices::auto();
        let capturer = capturer(&devices);
        let ids: Vec<_> = capturer
            .enumerate_devices()
            .await
            .into_iter()
            .map(|d| d.device_id)
            .collect();
        assert_eq!(ids, vec!["cam-a", "cam-b"]);
    }
}
