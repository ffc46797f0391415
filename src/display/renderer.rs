//! Canvas video renderer
//!
//! Pulls frames from a render source once per display refresh and paints them
//! letterboxed into the bound canvas.

use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::display::letterbox::Letterbox;
use crate::display::scheduler::RefreshScheduler;
use crate::display::source::VideoFrameSource;
use crate::display::surface::{CanvasRef, ImageData, Rgba};
use crate::pipeline::{FrameBuffer, PipelineHealth};
use crate::utils::same_object;

struct RendererState {
    canvas: Option<Weak<CanvasRef>>,
    source: Option<Arc<dyn VideoFrameSource>>,
    buffer: FrameBuffer,
    /// Reused while the frame size stays the same.
    image: Option<ImageData>,
    image_allocations: usize,
    schedule: Option<CancellationToken>,
}

struct Shared {
    scheduler: Arc<dyn RefreshScheduler>,
    health: Arc<PipelineHealth>,
    state: Mutex<RendererState>,
}

/// Cheap to clone; clones drive the same renderer.
#[derive(Clone)]
pub struct CanvasVideoRenderer {
    shared: Arc<Shared>,
}

impl CanvasVideoRenderer {
    pub fn new(scheduler: Arc<dyn RefreshScheduler>, config: &Config) -> Self {
        Self::with_health(scheduler, config, Arc::new(PipelineHealth::new()))
    }

    pub fn with_health(
        scheduler: Arc<dyn RefreshScheduler>,
        config: &Config,
        health: Arc<PipelineHealth>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                scheduler,
                health,
                state: Mutex::new(RendererState {
                    canvas: None,
                    source: None,
                    buffer: FrameBuffer::new(config.max_buffer_size()),
                    image: None,
                    image_allocations: 0,
                    schedule: None,
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RendererState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_canvas(&self, canvas: Option<Weak<CanvasRef>>) {
        self.lock().canvas = canvas;
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().source.is_some()
    }

    /// How many times the image surface had to be (re)allocated.
    pub fn image_allocations(&self) -> usize {
        self.lock().image_allocations
    }

    /// Start drawing `source`: once right away, then on every refresh.
    pub fn enable(&self, source: Arc<dyn VideoFrameSource>) {
        let token = CancellationToken::new();
        {
            let mut state = self.lock();
            if let Some(current) = &state.source
                && same_object(current, &source)
            {
                return;
            }
            if let Some(previous) = state.schedule.replace(token.clone()) {
                previous.cancel();
            }
            state.source = Some(source);
        }
        info!("Renderer enabled");

        let weak = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            loop {
                if token.is_cancelled() {
                    break;
                }
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let scheduler = Arc::clone(&shared.scheduler);
                CanvasVideoRenderer { shared }.render_video_frame();

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = scheduler.next_refresh() => {}
                }
            }
            debug!("Render schedule ended");
        });
    }

    /// Paint the canvas black and stop drawing.
    pub fn disable(&self) {
        // painted under the state lock so no frame lands on top of the fill
        let schedule = {
            let mut state = self.lock();
            state.source = None;
            let schedule = state.schedule.take();
            if let Some(schedule) = &schedule {
                schedule.cancel();
            }
            paint_black(&state);
            schedule
        };
        if schedule.is_some() {
            info!("Renderer disabled");
        }
    }

    pub fn render_black(&self) {
        paint_black(&self.lock());
    }

    /// Draw the source's newest frame, if any. Returns whether something was
    /// painted.
    pub fn render_video_frame(&self) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(source) = state.source.as_ref() else {
            return false;
        };
        let Some(canvas) = state
            .canvas
            .as_ref()
            .and_then(Weak::upgrade)
            .and_then(|c| c.current())
        else {
            return false;
        };

        let Some((width, height)) = source.receive_video_frame(state.buffer.as_mut_slice()) else {
            return false;
        };
        let Some(fit) = Letterbox::fit((width, height), canvas.client_size()) else {
            return false;
        };
        let len = width as usize * height as usize * 4;
        let Some(pixels) = state.buffer.filled(len) else {
            debug!("Skipping {}x{} frame larger than the render buffer", width, height);
            return false;
        };

        canvas.set_size(fit.canvas_width, fit.canvas_height);
        if fit.has_bars() {
            canvas.fill_rect(0, 0, fit.canvas_width, fit.canvas_height, Rgba::BLACK);
        }

        if state
            .image
            .as_ref()
            .is_none_or(|image| image.width != width || image.height != height)
        {
            state.image = Some(ImageData::new(width, height));
            state.image_allocations += 1;
        }
        let Some(image) = state.image.as_mut() else {
            return false;
        };
        image.data.copy_from_slice(pixels);
        canvas.put_image_data(image, fit.dx, fit.dy);

        self.shared.health.record_frame_rendered();
        true
    }
}

fn paint_black(state: &RendererState) {
    let Some(canvas) = state
        .canvas
        .as_ref()
        .and_then(Weak::upgrade)
        .and_then(|c| c.current())
    else {
        return;
    };
    let (width, height) = canvas.size();
    canvas.fill_rect(0, 0, width, height, Rgba::BLACK);
}
