//! Local preview binding

use super::traits::MediaStream;
use crate::utils::ElementRef;
use std::sync::{Arc, Mutex, PoisonError};

/// A host element able to display a live stream.
pub trait PreviewSurface: Send + Sync {
    fn src_object(&self) -> Option<Arc<dyn MediaStream>>;

    fn set_src_object(&self, stream: Option<Arc<dyn MediaStream>>);

    fn width(&self) -> u32;

    fn set_width(&self, width: u32);

    fn height(&self) -> u32;

    fn set_height(&self, height: u32);
}

/// Slot holding the preview element; the host may swap the element behind it.
pub type PreviewRef = ElementRef<dyn PreviewSurface>;

/// Make `surface` show `stream`. A surface without a size adopts
/// `fallback_size`. Returns whether the surface was touched.
pub fn apply_stream(
    surface: &dyn PreviewSurface,
    stream: Option<&Arc<dyn MediaStream>>,
    fallback_size: (u32, u32),
) -> bool {
    let shown = surface.src_object();
    if shown.as_ref().map(|s| s.id()) == stream.map(|s| s.id()) {
        return false;
    }

    match stream {
        Some(stream) => {
            surface.set_src_object(Some(Arc::clone(stream)));
            if surface.width() == 0 {
                surface.set_width(fallback_size.0);
            }
            if surface.height() == 0 {
                surface.set_height(fallback_size.1);
            }
        }
        None => surface.set_src_object(None),
    }
    true
}

#[derive(Default)]
struct ElementState {
    src: Option<Arc<dyn MediaStream>>,
    width: u32,
    height: u32,
    assignments: usize,
}

/// In-memory preview element.
#[derive(Default)]
pub struct VideoElement {
    state: Mutex<ElementState>,
}

impl VideoElement {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Mutex::new(ElementState {
                width,
                height,
                ..Default::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut ElementState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Id of the stream currently shown.
    pub fn stream_id(&self) -> Option<String> {
        self.with(|s| s.src.as_ref().map(|s| s.id().to_owned()))
    }

    /// How many times `set_src_object` was called.
    pub fn assignments(&self) -> usize {
        self.with(|s| s.assignments)
    }
}

impl PreviewSurface for VideoElement {
    fn src_object(&self) -> Option<Arc<dyn MediaStream>> {
        self.with(|s| s.src.clone())
    }

    fn set_src_object(&self, stream: Option<Arc<dyn MediaStream>>) {
        self.with(|s| {
            s.src = stream;
            s.assignments += 1;
        })
    }

    fn width(&self) -> u32 {
        self.with(|s| s.width)
    }

    fn set_width(&self, width: u32) {
        self.with(|s| s.width = width)
    }

    fn height(&self) -> u32 {
        self.with(|s| s.height)
    }

    fn set_height(&self, height: u32) {
        self.with(|s| s.height = height)
    }
}
