//! Pipeline building blocks
//!
//! - State machines for capture sessions and pumps
//! - The frame pump moving raw frames from a track to a sender
//! - Reusable frame buffers
//! - Health counters shared by capture and render sides
//!
//! # Architecture
//!
//! ```text
//! VideoTrack → FramePump → FrameBuffer → VideoFrameSender
//! ```

pub mod buffer;
pub mod health;
pub mod pump;
pub mod stage;
pub mod state;

pub use buffer::FrameBuffer;
pub use health::{HealthSummary, PipelineHealth};
pub use pump::{FramePump, PumpOwner, PumpToken, VideoFrameSender};
pub use stage::PipelineStage;
pub use state::{CapturePhase, CaptureState, PumpState};
