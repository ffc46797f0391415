//! Letterbox / pillarbox fit of a frame into a view

/// Canvas size and draw offset fitting a frame into a view without
/// distortion. Bars are whatever the frame does not cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub dx: u32,
    pub dy: u32,
}

impl Letterbox {
    /// `None` when either extent is zero.
    ///
    /// Aspect ratios are compared by cross-multiplication so equal ratios
    /// never pick up bars from rounding. Canvas sizes are truncated to whole
    /// pixels and offsets round half up.
    pub fn fit(frame: (u32, u32), view: (u32, u32)) -> Option<Self> {
        let (width, height) = frame;
        let (view_width, view_height) = view;
        if width == 0 || height == 0 || view_width == 0 || view_height == 0 {
            return None;
        }

        let (w, h) = (u64::from(width), u64::from(height));
        let (vw, vh) = (u64::from(view_width), u64::from(view_height));

        let fit = match (w * vh).cmp(&(vw * h)) {
            // frame wider than view: bars top and bottom
            std::cmp::Ordering::Greater => {
                let canvas_height = w * vh / vw;
                Self {
                    canvas_width: width,
                    canvas_height: clamp(canvas_height),
                    dx: 0,
                    dy: clamp(half_up(canvas_height - h)),
                }
            }
            // frame narrower: pillars on the sides
            std::cmp::Ordering::Less => {
                let canvas_width = h * vw / vh;
                Self {
                    canvas_width: clamp(canvas_width),
                    canvas_height: height,
                    dx: clamp(half_up(canvas_width - w)),
                    dy: 0,
                }
            }
            std::cmp::Ordering::Equal => Self {
                canvas_width: width,
                canvas_height: height,
                dx: 0,
                dy: 0,
            },
        };
        Some(fit)
    }

    pub fn has_bars(&self) -> bool {
        self.dx > 0 || self.dy > 0
    }
}

fn half_up(diff: u64) -> u64 {
    diff.div_ceil(2)
}

fn clamp(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
