use std::fmt;

use serde::{Serialize, Serializer};

/// Hue values are stored in half-degrees, wrapping from 179 back to 0.
pub const HUE_RANGE: u8 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bgr {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Bgr {
    pub const NEUTRAL_GRAY: Self = Self::new(128, 128, 128);
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(b: u8, g: u8, r: u8) -> Self {
        Self { b, g, r }
    }

    pub const fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        Self { b, g, r }
    }

    pub const fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub const fn to_array(self) -> [u8; 3] {
        [self.b, self.g, self.r]
    }

    /// Parses `#RRGGBB` (or `#RRGGBBAA`, alpha dropped). Anything else is
    /// neutral gray.
    pub fn from_hex(hex: &str) -> Self {
        let hex = hex.trim().trim_start_matches('#');
        let hex = match hex.len() {
            6 | 8 => hex.get(..6).unwrap_or_default(),
            _ => return Self::NEUTRAL_GRAY,
        };
        let channel = |range| hex.get(range).and_then(|s| u8::from_str_radix(s, 16).ok());
        match (channel(0..2), channel(2..4), channel(4..6)) {
            (Some(r), Some(g), Some(b)) => Self { b, g, r },
            _ => Self::NEUTRAL_GRAY,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// 8-bit HSV with the hue halved into `0..180`.
    pub fn to_hsv(self) -> Hsv {
        let Self { b, g, r } = self;
        let (bi, gi, ri) = (i32::from(b), i32::from(g), i32::from(r));
        let v = ri.max(gi).max(bi);
        let min = ri.min(gi).min(bi);
        let diff = v - min;

        let s = if v == 0 { 0 } else { (diff * 255 + v / 2) / v };

        let h = if diff == 0 {
            0.0
        } else {
            let diff = diff as f32;
            let h = if v == ri {
                60.0 * (gi - bi) as f32 / diff
            } else if v == gi {
                120.0 + 60.0 * (bi - ri) as f32 / diff
            } else {
                240.0 + 60.0 * (ri - gi) as f32 / diff
            };
            if h < 0.0 {
                h + 360.0
            } else {
                h
            }
        };
        let h = (h / 2.0).round() as u8 % HUE_RANGE;

        Hsv {
            h,
            s: s as u8,
            v: v as u8,
        }
    }

    pub fn abs_diff_sum(self, other: Self) -> u32 {
        u32::from(self.b.abs_diff(other.b))
            + u32::from(self.g.abs_diff(other.g))
            + u32::from(self.r.abs_diff(other.r))
    }
}

impl fmt::Display for Bgr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Bgr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Circular distance between two half-degree hues.
pub fn hue_distance(a: u8, b: u8) -> u8 {
    let d = a.abs_diff(b) % HUE_RANGE;
    d.min(HUE_RANGE - d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_conversion() {
        assert_eq!(Bgr::from_hex("#0000FF"), Bgr::new(255, 0, 0));
        assert_eq!(Bgr::from_hex("FF8000"), Bgr::new(0, 128, 255));
        assert_eq!(Bgr::from_hex("#12345678"), Bgr::new(0x56, 0x34, 0x12));
        assert_eq!(Bgr::new(255, 0, 0).to_hex(), "#0000FF");
        assert_eq!(Bgr::new(0x0a, 0xb0, 0xc1).to_hex(), "#C1B00A");
    }

    #[test]
    fn malformed_hex_is_gray() {
        assert_eq!(Bgr::from_hex(""), Bgr::NEUTRAL_GRAY);
        assert_eq!(Bgr::from_hex("#FFF"), Bgr::NEUTRAL_GRAY);
        assert_eq!(Bgr::from_hex("#GG0000"), Bgr::NEUTRAL_GRAY);
        assert_eq!(Bgr::from_hex("#ÄÄÄÄ"), Bgr::NEUTRAL_GRAY);
    }

    #[test]
    fn hex_round_trip() {
        // xorshift so the sample is reproducible without a rng dependency
        let mut state = 0x2545_f491_u32;
        for _ in 0..1000 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [b, g, r, _] = state.to_le_bytes();
            let color = Bgr::new(b, g, r);
            assert_eq!(Bgr::from_hex(&color.to_hex()), color);
        }
    }

    #[test]
    fn hsv_conversion() {
        assert_eq!(Bgr::new(0, 0, 255).to_hsv(), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(Bgr::new(0, 255, 0).to_hsv(), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(Bgr::new(255, 0, 0).to_hsv(), Hsv { h: 120, s: 255, v: 255 });
        assert_eq!(Bgr::new(128, 128, 128).to_hsv(), Hsv { h: 0, s: 0, v: 128 });
        assert_eq!(Bgr::BLACK.to_hsv(), Hsv { h: 0, s: 0, v: 0 });
        // magenta-red just below 360 degrees wraps to 0 instead of 180
        assert_eq!(Bgr::new(1, 0, 255).to_hsv().h, 0);
        assert_eq!(Bgr::new(10, 0, 255).to_hsv().h, 179);
    }

    #[test]
    fn hue_wraps() {
        assert_eq!(hue_distance(0, 179), 1);
        assert_eq!(hue_distance(170, 5), 15);
        assert_eq!(hue_distance(90, 0), 90);
        assert_eq!(hue_distance(30, 30), 0);
    }
}
