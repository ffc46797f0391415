pub const FRAME_RATE: u32 = 30;
pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

// capture limits, scaled by `MAX_VIDEO_CAPTURE_MULTIPLIER`
pub const MAX_VIDEO_CAPTURE_MULTIPLIER: f64 = 1.0;
pub const BASE_CAPTURE_WIDTH: u32 = 1920;
pub const BASE_CAPTURE_HEIGHT: u32 = 1080;

pub const MAX_VIDEO_CAPTURE_WIDTH: u32 = BASE_CAPTURE_WIDTH;
pub const MAX_VIDEO_CAPTURE_HEIGHT: u32 = BASE_CAPTURE_HEIGHT;
pub const MAX_VIDEO_CAPTURE_AREA: usize =
    MAX_VIDEO_CAPTURE_WIDTH as usize * MAX_VIDEO_CAPTURE_HEIGHT as usize;
/// Worst case is RGBA, 4 bytes per pixel.
pub const MAX_VIDEO_CAPTURE_BUFFER_SIZE: usize = MAX_VIDEO_CAPTURE_AREA * 4;

pub const PREVIEW_RESYNC_INTERVAL_MS: u64 = 1000;
pub const DISPLAY_REFRESH_RATE: u32 = 60;
