use crate::assets::MAX_VIDEO_CAPTURE_BUFFER_SIZE;

/// Fixed capacity pixel buffer reused across frames.
///
/// # Performance
/// - Allocated once, sized for the largest supported frame
/// - Never grows, so the hot path does not allocate
///
/// A buffer belongs to exactly one loop (a pump or a render chain) at a time.
pub struct FrameBuffer {
    data: Box<[u8]>,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Buffer sized for the default 1920x1080 RGBA ceiling.
    pub fn max_capture() -> Self {
        Self::new(MAX_VIDEO_CAPTURE_BUFFER_SIZE)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// First `len` bytes, or `None` if `len` exceeds the capacity.
    #[inline]
    pub fn filled(&self, len: usize) -> Option<&[u8]> {
        self.data.get(..len)
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("capacity", &self.capacity())
            .finish()
    }
}
