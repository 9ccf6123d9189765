use diagram_align_kernel::types::color::{Bgr, Hsv, HUE_RANGE};
use imageproc::image::{GrayImage, Luma, RgbImage};

/// How far a pixel may stray from a pen color and still count as ink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTolerance {
    /// Half-width of the hue window, in half-degrees.
    pub hue: u8,
    pub saturation: u8,
    pub value: u8,
    /// Below this saturation the hue is noise and matching falls back to
    /// a BGR box.
    pub low_saturation: u8,
    /// BGR box half-width per unit of hue tolerance.
    pub bgr_multiplier: u8,
}

impl ColorTolerance {
    pub fn with_hue(self, hue: u8) -> Self {
        Self { hue, ..self }
    }
}

impl Default for ColorTolerance {
    fn default() -> Self {
        Self {
            hue: 10,
            saturation: 80,
            value: 80,
            low_saturation: 30,
            bgr_multiplier: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRange {
    Hsv { lower: Hsv, upper: Hsv },
    Bgr { lower: Bgr, upper: Bgr },
}

impl ColorRange {
    fn contains(&self, bgr: Bgr, hsv: Hsv) -> bool {
        fn within(v: u8, lo: u8, hi: u8) -> bool {
            lo <= v && v <= hi
        }
        match self {
            ColorRange::Hsv { lower, upper } => {
                within(hsv.h, lower.h, upper.h)
                    && within(hsv.s, lower.s, upper.s)
                    && within(hsv.v, lower.v, upper.v)
            }
            ColorRange::Bgr { lower, upper } => {
                within(bgr.b, lower.b, upper.b)
                    && within(bgr.g, lower.g, upper.g)
                    && within(bgr.r, lower.r, upper.r)
            }
        }
    }

    fn needs_hsv(&self) -> bool {
        matches!(self, ColorRange::Hsv { .. })
    }
}

/// Matches pixels against the ranges built around one target color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMatcher {
    ranges: Vec<ColorRange>,
}

impl ColorMatcher {
    /// Builds the ranges for `target`. A hue window crossing 0 or 179 is
    /// split in two.
    pub fn new(target: Bgr, tolerance: ColorTolerance) -> Self {
        let hsv = target.to_hsv();
        if hsv.s < tolerance.low_saturation {
            let delta = u16::from(tolerance.hue) * u16::from(tolerance.bgr_multiplier);
            let delta = delta.min(255) as u8;
            let lower = Bgr::new(
                target.b.saturating_sub(delta),
                target.g.saturating_sub(delta),
                target.r.saturating_sub(delta),
            );
            let upper = Bgr::new(
                target.b.saturating_add(delta),
                target.g.saturating_add(delta),
                target.r.saturating_add(delta),
            );
            return Self {
                ranges: vec![ColorRange::Bgr { lower, upper }],
            };
        }

        let s = (
            hsv.s.saturating_sub(tolerance.saturation),
            hsv.s.saturating_add(tolerance.saturation),
        );
        let v = (
            hsv.v.saturating_sub(tolerance.value),
            hsv.v.saturating_add(tolerance.value),
        );
        let hsv_range = |h0: u8, h1: u8| ColorRange::Hsv {
            lower: Hsv {
                h: h0,
                s: s.0,
                v: v.0,
            },
            upper: Hsv {
                h: h1,
                s: s.1,
                v: v.1,
            },
        };

        let max_hue = HUE_RANGE - 1;
        let tol = tolerance.hue.min(HUE_RANGE / 2);
        let lo = i16::from(hsv.h) - i16::from(tol);
        let hi = i16::from(hsv.h) + i16::from(tol);
        let ranges = if lo < 0 {
            vec![
                hsv_range(0, hi as u8),
                hsv_range((lo + i16::from(HUE_RANGE)) as u8, max_hue),
            ]
        } else if hi > i16::from(max_hue) {
            vec![
                hsv_range(lo as u8, max_hue),
                hsv_range(0, (hi - i16::from(HUE_RANGE)) as u8),
            ]
        } else {
            vec![hsv_range(lo as u8, hi as u8)]
        };
        Self { ranges }
    }

    pub fn ranges(&self) -> &[ColorRange] {
        &self.ranges
    }

    pub fn matches(&self, color: Bgr) -> bool {
        let hsv = if self.ranges.iter().any(ColorRange::needs_hsv) {
            color.to_hsv()
        } else {
            Hsv::default()
        };
        self.ranges.iter().any(|r| r.contains(color, hsv))
    }

    pub fn mask(&self, image: &RgbImage) -> GrayImage {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let color = Bgr::from_rgb(image.get_pixel(x, y).0);
            Luma([if self.matches(color) { 255 } else { 0 }])
        })
    }
}
