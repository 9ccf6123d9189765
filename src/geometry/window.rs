use diagram_align_kernel::types::geometry::{Coord, LineGeometry};
use imageproc::rect::Rect;

/// An unclamped search rectangle with inclusive edges.
///
/// Windows may extend past the image; [`SearchWindow::clip`] brings them
/// back inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Which sides of a window a point lies against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchedEdges {
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

impl TouchedEdges {
    pub fn any(&self) -> bool {
        self.left || self.top || self.right || self.bottom
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            left: self.left || other.left,
            top: self.top || other.top,
            right: self.right || other.right,
            bottom: self.bottom || other.bottom,
        }
    }
}

impl SearchWindow {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// `center ± half` on each axis, truncated toward zero.
    pub fn around(center: Coord, half_width: f32, half_height: f32) -> Self {
        Self::new(
            (center.x - half_width) as i32,
            (center.y - half_height) as i32,
            (center.x + half_width) as i32,
            (center.y + half_height) as i32,
        )
    }

    /// Bounding box of a line grown by a margin on each axis.
    pub fn around_line(line: &LineGeometry, margin_x: f32, margin_y: f32) -> Self {
        let b = line.bounds();
        Self::new(
            (b.x - margin_x).floor() as i32,
            (b.y - margin_y).floor() as i32,
            (b.x + b.w + margin_x).ceil() as i32,
            (b.y + b.h + margin_y).ceil() as i32,
        )
    }

    pub fn width(&self) -> i32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top + 1
    }

    pub fn origin(&self) -> Coord {
        Coord::new(self.left as f32, self.top as f32)
    }

    pub fn grow(&self, edges: TouchedEdges, amount: i32) -> Self {
        let step = |touched: bool| if touched { amount } else { 0 };
        Self::new(
            self.left - step(edges.left),
            self.top - step(edges.top),
            self.right + step(edges.right),
            self.bottom + step(edges.bottom),
        )
    }

    pub fn touched_edges(&self, p: Coord, distance: f32) -> TouchedEdges {
        TouchedEdges {
            left: p.x - self.left as f32 <= distance,
            top: p.y - self.top as f32 <= distance,
            right: self.right as f32 - p.x <= distance,
            bottom: self.bottom as f32 - p.y <= distance,
        }
    }

    /// Intersection with `base_rect`, or `None` when nothing is left.
    pub fn clip(&self, base_rect: Rect) -> Option<Rect> {
        let left = self.left.clamp(base_rect.left(), base_rect.right());
        let right = self.right.clamp(base_rect.left(), base_rect.right());
        let top = self.top.clamp(base_rect.top(), base_rect.bottom());
        let bottom = self.bottom.clamp(base_rect.top(), base_rect.bottom());

        let overlaps = self.left <= base_rect.right()
            && self.right >= base_rect.left()
            && self.top <= base_rect.bottom()
            && self.bottom >= base_rect.top();
        (overlaps && left <= right && top <= bottom).then(|| {
            Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32)
        })
    }
}

impl From<Rect> for SearchWindow {
    fn from(rect: Rect) -> Self {
        Self::new(rect.left(), rect.top(), rect.right(), rect.bottom())
    }
}
