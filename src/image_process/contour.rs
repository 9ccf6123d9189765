use imageproc::{
    contours::{self, BorderType},
    drawing,
    image::{imageops, GrayImage, Luma},
    point::Point,
};

/// Outer borders of the top-level blobs in a mask.
///
/// Blobs may touch the mask border; contours are traced on a copy framed by
/// one unset pixel so that border tracing always starts outside every blob.
pub fn outer_contours(mask: &GrayImage) -> Vec<Vec<Point<i32>>> {
    let mut framed = GrayImage::new(mask.width() + 2, mask.height() + 2);
    imageops::replace(&mut framed, mask, 1, 1);
    contours::find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect::<Vec<_>>()
        })
        .filter(|points| !points.is_empty())
        .collect()
}

/// Paints the region enclosed by a contour, border included.
pub fn fill_contour(mask: &mut GrayImage, points: &[Point<i32>]) {
    let mut poly = points.to_vec();
    poly.dedup();
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if poly.len() >= 3 {
        drawing::draw_polygon_mut(mask, &poly, Luma([255]));
    }
    draw_contour(mask, points);
}

/// Paints only the contour pixels.
pub fn draw_contour(mask: &mut GrayImage, points: &[Point<i32>]) {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    for p in points {
        if (0..w).contains(&p.x) && (0..h).contains(&p.y) {
            mask.put_pixel(p.x as u32, p.y as u32, Luma([255]));
        }
    }
}

pub fn count_set(mask: &GrayImage) -> usize {
    mask.pixels().filter(|Luma([v])| *v > 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_has_one_outer_contour() {
        let mut mask = GrayImage::new(20, 20);
        for y in 2..18 {
            for x in 2..18 {
                if !(4..16).contains(&x) || !(4..16).contains(&y) {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        let found = outer_contours(&mask);
        assert_eq!(found.len(), 1);

        let mut filled = GrayImage::new(20, 20);
        fill_contour(&mut filled, &found[0]);
        assert_eq!(count_set(&filled), 16 * 16);
    }

    #[test]
    fn blobs_touching_the_border_are_kept() {
        let mut mask = GrayImage::new(30, 20);
        // runs off the left edge
        for y in 5..8 {
            for x in 0..10 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        for y in 10..16 {
            for x in 15..25 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let mut found = outer_contours(&mask);
        found.sort_by_key(|c| c.iter().map(|p| p.x).min());
        assert_eq!(found.len(), 2, "{found:?}");

        let xs = |c: &[Point<i32>]| {
            let min = c.iter().map(|p| p.x).min();
            let max = c.iter().map(|p| p.x).max();
            (min, max)
        };
        assert_eq!(xs(&found[0]), (Some(0), Some(9)));
        assert_eq!(xs(&found[1]), (Some(15), Some(24)));
        assert!(found[1].iter().all(|p| (10..16).contains(&p.y)));
    }

    #[test]
    fn degenerate_contours_do_not_panic() {
        let mut mask = GrayImage::new(5, 5);
        fill_contour(&mut mask, &[Point::new(1, 1)]);
        fill_contour(&mut mask, &[Point::new(1, 1), Point::new(3, 1), Point::new(1, 1)]);
        fill_contour(&mut mask, &[]);
        assert_eq!(count_set(&mask), 2);
    }
}
