use std::{fmt, ops, str::FromStr};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Coord {
    pub x: f32,
    pub y: f32,
}

impl Coord {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn norm(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).norm()
    }

    /// Unit vector, or zero for a zero vector.
    pub fn normalized(self) -> Self {
        let n = self.norm();
        if n > f32::EPSILON {
            self * (1.0 / n)
        } else {
            Self::default()
        }
    }

    /// Rotated by +90 degrees in image coordinates.
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    pub fn round(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

impl ops::Add for Coord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl ops::Sub for Coord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl ops::Mul<f32> for Coord {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Axis-aligned box with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            x,
            y,
            w: w.max(0.0),
            h: h.max(0.0),
        }
    }

    pub fn center(&self) -> Coord {
        Coord::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={:.1}, y={:.1}, w={:.1}, h={:.1}",
            self.x, self.y, self.w, self.h
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    #[serde(rename = "roundedrect")]
    RoundedRect {
        radius: f32,
    },
    Ellipse,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rect => "rect",
            ShapeKind::RoundedRect { .. } => "roundedrect",
            ShapeKind::Ellipse => "ellipse",
        }
    }

    pub fn radius(&self) -> Option<f32> {
        match self {
            ShapeKind::RoundedRect { radius } => Some(*radius),
            _ => None,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::RoundedRect { radius } => write!(f, "{}(r={radius})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unknown shape kind `{0}`, expected one of rect, roundedrect, ellipse")]
pub struct ParseShapeKindError(String);

impl FromStr for ShapeKind {
    type Err = ParseShapeKindError;

    /// Parses the kind name; a rounded rectangle starts with a zero radius.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rect" => Ok(ShapeKind::Rect),
            "roundedrect" => Ok(ShapeKind::RoundedRect { radius: 0.0 }),
            "ellipse" => Ok(ShapeKind::Ellipse),
            _ => Err(ParseShapeKindError(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClosedShape {
    #[serde(flatten)]
    pub bounds: Bounds,
    #[serde(flatten)]
    pub kind: ShapeKind,
}

/// A straight segment. Its angle is undirected and lives in `[0, 180)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LineGeometry {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl LineGeometry {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_coords(start: Coord, end: Coord) -> Self {
        Self::new(start.x, start.y, end.x, end.y)
    }

    pub fn start(&self) -> Coord {
        Coord::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Coord {
        Coord::new(self.x2, self.y2)
    }

    pub fn length(&self) -> f32 {
        self.start().distance(self.end())
    }

    pub fn midpoint(&self) -> Coord {
        (self.start() + self.end()) * 0.5
    }

    pub fn angle(&self) -> f32 {
        let d = self.end() - self.start();
        d.y.atan2(d.x).to_degrees().rem_euclid(180.0)
    }

    /// Unit vector from start to end.
    pub fn direction(&self) -> Coord {
        (self.end() - self.start()).normalized()
    }

    pub fn normal(&self) -> Coord {
        self.direction().perpendicular()
    }

    pub fn reversed(&self) -> Self {
        Self::from_coords(self.end(), self.start())
    }

    pub fn translated(&self, offset: Coord) -> Self {
        Self::from_coords(self.start() + offset, self.end() + offset)
    }

    /// Moved `distance` along its normal.
    pub fn shifted(&self, distance: f32) -> Self {
        self.translated(self.normal() * distance)
    }

    /// Lengthened by `amount` at both ends.
    pub fn extended(&self, amount: f32) -> Self {
        let d = self.direction() * amount;
        Self::from_coords(self.start() - d, self.end() + d)
    }

    /// Signed distance from the infinite line through this segment.
    pub fn signed_distance(&self, p: Coord) -> f32 {
        let dir = self.direction();
        if dir == Coord::default() {
            return p.distance(self.start());
        }
        dir.cross(p - self.start())
    }

    pub fn bounds(&self) -> Bounds {
        let x = self.x1.min(self.x2);
        let y = self.y1.min(self.y2);
        Bounds::new(x, y, (self.x1 - self.x2).abs(), (self.y1 - self.y2).abs())
    }
}

impl fmt::Display for LineGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1}, {:.1})-({:.1}, {:.1})",
            self.x1, self.y1, self.x2, self.y2
        )
    }
}

/// Absolute difference of two undirected angles in degrees, in `[0, 90]`.
pub fn angle_difference(a: f32, b: f32) -> f32 {
    let d = (a - b).abs().rem_euclid(180.0);
    d.min(180.0 - d)
}
