use std::fmt;

/// Raw pixel layouts accepted by senders.
///
/// The numeric values are part of the sender contract.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoPixelFormat {
    I420 = 0,
    Nv12 = 1,
    Rgba = 2,
}

impl VideoPixelFormat {
    /// Tag assumed when a frame does not report one.
    pub const DEFAULT_TAG: &'static str = "I420";

    /// Resolve a frame format tag. Anything outside I420, NV12 and RGBA is
    /// unsupported.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "I420" => Some(VideoPixelFormat::I420),
            "NV12" => Some(VideoPixelFormat::Nv12),
            "RGBA" => Some(VideoPixelFormat::Rgba),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            VideoPixelFormat::I420 => "I420",
            VideoPixelFormat::Nv12 => "NV12",
            VideoPixelFormat::Rgba => "RGBA",
        }
    }

    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(VideoPixelFormat::I420),
            1 => Some(VideoPixelFormat::Nv12),
            2 => Some(VideoPixelFormat::Rgba),
            _ => None,
        }
    }

    /// Bytes needed for a `width` x `height` frame in this layout.
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            VideoPixelFormat::I420 | VideoPixelFormat::Nv12 => {
                let chroma = w.div_ceil(2) * h.div_ceil(2);
                w * h + chroma * 2
            }
            VideoPixelFormat::Rgba => w * h * 4,
        }
    }
}

impl fmt::Display for VideoPixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}
