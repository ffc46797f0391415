//! Display components for canvas video rendering

pub mod letterbox;
pub mod renderer;
pub mod scheduler;
pub mod source;
pub mod surface;

pub use letterbox::Letterbox;
pub use renderer::CanvasVideoRenderer;
pub use scheduler::{IntervalScheduler, RefreshScheduler};
pub use source::{LoopbackSink, VideoFrameSource};
pub use surface::{CanvasRef, DrawingSurface, ImageData, MemoryCanvas, Rgba};
