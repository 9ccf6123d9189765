use diagram_align_kernel::types::geometry::{Bounds, Coord};
use imageproc::point::Point;

pub fn to_coord(p: Point<i32>) -> Coord {
    Coord::new(p.x as f32, p.y as f32)
}

/// Area enclosed by a closed polygon (shoelace formula).
pub fn polygon_area(points: &[Point<i32>]) -> f32 {
    signed_area2(points).abs() as f32 / 2.0
}

fn signed_area2(points: &[Point<i32>]) -> i64 {
    let n = points.len();
    if n < 3 {
        return 0;
    }
    (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y)
        })
        .sum()
}

/// Pixel bounding box, counting both boundary pixels.
pub fn bounding_box(points: &[Point<i32>]) -> Option<Bounds> {
    let first = points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Some(Bounds::new(
        x0 as f32,
        y0 as f32,
        (x1 - x0 + 1) as f32,
        (y1 - y0 + 1) as f32,
    ))
}

/// Area centroid, or the vertex mean for degenerate polygons.
pub fn polygon_centroid(points: &[Point<i32>]) -> Option<Coord> {
    if points.is_empty() {
        return None;
    }
    let area2 = signed_area2(points);
    if area2 == 0 {
        let sum = points
            .iter()
            .fold(Coord::default(), |acc, p| acc + to_coord(*p));
        return Some(sum * (1.0 / points.len() as f32));
    }
    let n = points.len();
    let (mut cx, mut cy) = (0.0_f64, 0.0_f64);
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        let cross = f64::from(p.x) * f64::from(q.y) - f64::from(q.x) * f64::from(p.y);
        cx += f64::from(p.x + q.x) * cross;
        cy += f64::from(p.y + q.y) * cross;
    }
    let scale = 1.0 / (3.0 * area2 as f64);
    Some(Coord::new((cx * scale) as f32, (cy * scale) as f32))
}

/// Side lengths `(long, short)` of the minimum-area rotated box around a
/// convex hull, measured in pixels so a single pixel is `1x1`.
pub fn rotated_extent(hull: &[Point<i32>]) -> (f32, f32) {
    let pts = hull.iter().map(|p| to_coord(*p)).collect::<Vec<_>>();
    if pts.is_empty() {
        return (0.0, 0.0);
    }

    let mut best: Option<(f32, f32)> = None;
    for i in 0..pts.len() {
        let dir = (pts[(i + 1) % pts.len()] - pts[i]).normalized();
        if dir == Coord::default() {
            continue;
        }
        let normal = dir.perpendicular();
        let (mut a0, mut a1, mut b0, mut b1) = (f32::MAX, f32::MIN, f32::MAX, f32::MIN);
        for p in &pts {
            let a = p.dot(dir);
            let b = p.dot(normal);
            a0 = a0.min(a);
            a1 = a1.max(a);
            b0 = b0.min(b);
            b1 = b1.max(b);
        }
        let extent = (a1 - a0 + 1.0, b1 - b0 + 1.0);
        match best {
            Some((w, h)) if w * h <= extent.0 * extent.1 => {}
            _ => best = Some(extent),
        }
    }

    // every hull point coincides
    let (w, h) = best.unwrap_or((1.0, 1.0));
    (w.max(h), w.min(h))
}
