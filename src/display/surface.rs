//! 2D drawing surfaces

use crate::utils::ElementRef;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    pub const BLACK: Rgba = Rgba(0, 0, 0, 0xff);
    pub const TRANSPARENT: Rgba = Rgba(0, 0, 0, 0);

    fn bytes(&self) -> [u8; 4] {
        [self.0, self.1, self.2, self.3]
    }
}

/// RGBA pixels with no row padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }
}

/// A host canvas with a 2D context.
pub trait DrawingSurface: Send + Sync {
    /// Laid out size of the element on screen.
    fn client_size(&self) -> (u32, u32);

    /// Backing store size in pixels.
    fn size(&self) -> (u32, u32);

    /// Resize the backing store. Clears its content.
    fn set_size(&self, width: u32, height: u32);

    fn fill_rect(&self, x: u32, y: u32, width: u32, height: u32, color: Rgba);

    /// Blit `image` with its top-left corner at `(dx, dy)`, clipped to the canvas.
    fn put_image_data(&self, image: &ImageData, dx: u32, dy: u32);
}

pub type CanvasRef = ElementRef<dyn DrawingSurface>;

struct CanvasState {
    client: (u32, u32),
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    fills: usize,
    puts: usize,
}

/// Canvas kept in memory, used headless and in tests.
pub struct MemoryCanvas {
    state: Mutex<CanvasState>,
}

impl MemoryCanvas {
    pub fn new(client_width: u32, client_height: u32) -> Self {
        Self {
            state: Mutex::new(CanvasState {
                client: (client_width, client_height),
                width: 0,
                height: 0,
                pixels: Vec::new(),
                fills: 0,
                puts: 0,
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut CanvasState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn set_client_size(&self, width: u32, height: u32) {
        self.with(|s| s.client = (width, height))
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.with(|s| {
            if x >= s.width || y >= s.height {
                return None;
            }
            let i = (y as usize * s.width as usize + x as usize) * 4;
            let p = &s.pixels[i..i + 4];
            Some(Rgba(p[0], p[1], p[2], p[3]))
        })
    }

    /// Whether every pixel has `color`. True for an empty canvas.
    pub fn is_all(&self, color: Rgba) -> bool {
        let expected = color.bytes();
        self.with(|s| s.pixels.chunks_exact(4).all(|p| p == expected))
    }

    pub fn fills(&self) -> usize {
        self.with(|s| s.fills)
    }

    pub fn puts(&self) -> usize {
        self.with(|s| s.puts)
    }
}

impl DrawingSurface for MemoryCanvas {
    fn client_size(&self) -> (u32, u32) {
        self.with(|s| s.client)
    }

    fn size(&self) -> (u32, u32) {
        self.with(|s| (s.width, s.height))
    }

    fn set_size(&self, width: u32, height: u32) {
        self.with(|s| {
            s.width = width;
            s.height = height;
            s.pixels.clear();
            s.pixels.resize(width as usize * height as usize * 4, 0);
        })
    }

    fn fill_rect(&self, x: u32, y: u32, width: u32, height: u32, color: Rgba) {
        let color = color.bytes();
        self.with(|s| {
            s.fills += 1;
            let x_end = x.saturating_add(width).min(s.width) as usize;
            let y_end = y.saturating_add(height).min(s.height) as usize;
            let stride = s.width as usize * 4;
            for row in (y as usize)..y_end {
                for col in (x as usize)..x_end {
                    let i = row * stride + col * 4;
                    s.pixels[i..i + 4].copy_from_slice(&color);
                }
            }
        })
    }

    fn put_image_data(&self, image: &ImageData, dx: u32, dy: u32) {
        self.with(|s| {
            s.puts += 1;
            if dx >= s.width || dy >= s.height {
                return;
            }
            let cols = image.width.min(s.width - dx) as usize;
            let rows = image.height.min(s.height - dy) as usize;
            let stride = s.width as usize * 4;
            let src_stride = image.width as usize * 4;
            for row in 0..rows {
                let dst = (dy as usize + row) * stride + dx as usize * 4;
                let src = row * src_stride;
                s.pixels[dst..dst + cols * 4].copy_from_slice(&image.data[src..src + cols * 4]);
            }
        })
    }
}
