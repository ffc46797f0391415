//! Live video pipeline
//!
//! - `capture`: capture lifecycle, device selection and local preview
//! - `pipeline`: frame pump, buffers, state machines and health counters
//! - `display`: letterboxed canvas rendering driven by display refresh

pub mod assets;
pub mod capture;
pub mod config;
pub mod display;
pub mod pipeline;
pub mod utils;
