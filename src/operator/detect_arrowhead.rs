use diagram_align_kernel::types::{color::Bgr, geometry::Coord};
use imageproc::{
    distance_transform::Norm,
    geometry::{approximate_polygon_dp, arc_length, convex_hull},
    image::RgbImage,
    morphology,
    point::Point,
};

use crate::{
    algorithm::{polygon_area, polygon_centroid, to_coord},
    geometry::SearchWindow,
    image_process::{crop, image_rect, outer_contours, ColorMatcher, ColorTolerance},
    util::ImageLogger,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrowhead {
    pub tip: Coord,
    /// Distance from the tip to the middle of the base.
    pub size: f32,
}

/// Looks for a filled triangle-ish blob capping a line end.
#[derive(Debug, Clone)]
pub struct ArrowheadDetector {
    pub search_radius: f32,
    pub tolerance: ColorTolerance,
    pub close_radius: u8,
    pub min_area: f32,
    pub max_area: f32,
    /// Polygon approximation tolerance as a fraction of the hull perimeter.
    pub epsilon_ratio: f64,
    pub min_vertices: usize,
    pub max_vertices: usize,
    /// Blob centroids must lie within this fraction of the search radius.
    pub centroid_ratio: f32,
    /// Base vertices sit at least this fraction of the widest offset away
    /// from the line.
    pub base_ratio: f32,
    /// Narrower bases are the bare shaft.
    pub min_base_width: f32,
}

impl Default for ArrowheadDetector {
    fn default() -> Self {
        Self {
            search_radius: 20.0,
            tolerance: ColorTolerance {
                hue: 20,
                saturation: 120,
                value: 120,
                ..ColorTolerance::default()
            },
            close_radius: 1,
            min_area: 20.0,
            max_area: 3000.0,
            epsilon_ratio: 0.06,
            min_vertices: 3,
            max_vertices: 6,
            centroid_ratio: 0.9,
            base_ratio: 0.5,
            min_base_width: 6.0,
        }
    }
}

impl ArrowheadDetector {
    /// `outward` points from the line body past `endpoint`.
    #[tracing::instrument(level = "trace", skip_all, fields(endpoint = %endpoint))]
    pub fn detect(
        &self,
        image: &RgbImage,
        endpoint: Coord,
        outward: Coord,
        pen_color: Bgr,
        logger: &ImageLogger,
    ) -> Option<Arrowhead> {
        let outward = outward.normalized();
        if outward == Coord::default() {
            return None;
        }
        let window = SearchWindow::around(endpoint, self.search_radius, self.search_radius)
            .clip(image_rect(image)?)?;
        let origin = SearchWindow::from(window).origin();

        let region = logger.log(crop(image, window));
        let matcher = ColorMatcher::new(pen_color, self.tolerance);
        let mask = tracing::trace_span!("mask").in_scope(|| {
            let mask = matcher.mask(&region);
            logger.log(morphology::close(&mask, Norm::LInf, self.close_radius))
        });

        let best = outer_contours(&mask)
            .iter()
            .filter_map(|contour| self.measure(contour, origin, endpoint, outward))
            .fold(None, |best: Option<Arrowhead>, candidate| match best {
                Some(b) if b.size >= candidate.size => Some(b),
                _ => Some(candidate),
            });
        tracing::trace!(found = ?best);
        best
    }

    fn measure(
        &self,
        contour: &[Point<i32>],
        origin: Coord,
        endpoint: Coord,
        outward: Coord,
    ) -> Option<Arrowhead> {
        let area = polygon_area(contour);
        if area < self.min_area || area > self.max_area {
            return None;
        }

        let hull = convex_hull(contour);
        if hull.len() < 3 {
            return None;
        }
        let epsilon = self.epsilon_ratio * arc_length(&hull, true);
        if epsilon <= 0.0 {
            return None;
        }
        let mut vertices = approximate_polygon_dp(&hull, epsilon, true);
        while vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < self.min_vertices || vertices.len() > self.max_vertices {
            return None;
        }

        let centroid = polygon_centroid(contour)? + origin;
        if centroid.distance(endpoint) > self.centroid_ratio * self.search_radius {
            return None;
        }

        // tip and base come from the hull itself; the coarse polygon only
        // gates the overall shape
        let hull = hull
            .into_iter()
            .map(|p| to_coord(p) + origin)
            .collect::<Vec<_>>();
        let (tip_index, tip) = hull.iter().copied().enumerate().max_by(|(_, a), (_, b)| {
            (*a - endpoint)
                .dot(outward)
                .total_cmp(&(*b - endpoint).dot(outward))
        })?;

        let across = outward.perpendicular();
        let offsets = hull
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != tip_index)
            .map(|(_, v)| (*v, (*v - tip).dot(across)))
            .collect::<Vec<_>>();
        let widest = offsets.iter().map(|(_, o)| o.abs()).fold(0.0, f32::max);
        let base = offsets
            .iter()
            .filter(|(_, o)| o.abs() >= self.base_ratio * widest)
            .copied();
        let (left, right) = base.fold(None, |acc: Option<((Coord, f32), (Coord, f32))>, v| {
            Some(match acc {
                None => (v, v),
                Some((lo, hi)) => (
                    if v.1 < lo.1 { v } else { lo },
                    if v.1 > hi.1 { v } else { hi },
                ),
            })
        })?;

        let base_width = right.1 - left.1;
        let size = tip.distance((left.0 + right.0) * 0.5);
        tracing::trace!(%tip, size, base_width, vertices = vertices.len());

        (size > 0.0 && size < self.search_radius && base_width >= self.min_base_width)
            .then_some(Arrowhead { tip, size })
    }
}

#[cfg(test)]
mod tests {
    use imageproc::{drawing, image::Rgb, rect::Rect};

    use super::*;

    const BLUE: Bgr = Bgr::new(255, 0, 0);

    fn arrow_image() -> RgbImage {
        let mut image = RgbImage::from_pixel(320, 300, Rgb([255, 255, 255]));
        let blue = Rgb(BLUE.to_rgb());
        drawing::draw_filled_rect_mut(&mut image, Rect::at(50, 150).of_size(200, 2), blue);
        drawing::draw_polygon_mut(
            &mut image,
            &[Point::new(250, 145), Point::new(264, 150), Point::new(250, 155)],
            blue,
        );
        image
    }

    #[test]
    fn finds_tip_past_line_end() {
        let image = arrow_image();
        let detector = ArrowheadDetector::default();
        let logger = ImageLogger::disabled();
        let head = detector
            .detect(&image, Coord::new(250.0, 150.0), Coord::new(1.0, 0.0), BLUE, &logger)
            .expect("arrowhead");
        assert!(head.tip.distance(Coord::new(264.0, 150.0)) <= 2.0, "{}", head.tip);
        assert!((head.size - 14.0).abs() <= 2.5, "{}", head.size);

        // already at the tip
        let head = detector
            .detect(&image, Coord::new(264.0, 150.0), Coord::new(1.0, 0.0), BLUE, &logger)
            .expect("arrowhead");
        assert!(head.tip.distance(Coord::new(264.0, 150.0)) <= 2.0, "{}", head.tip);
    }

    #[test]
    fn bare_shaft_is_not_an_arrow() {
        let image = arrow_image();
        let head = ArrowheadDetector::default().detect(
            &image,
            Coord::new(50.0, 150.0),
            Coord::new(-1.0, 0.0),
            BLUE,
            &ImageLogger::disabled(),
        );
        assert_eq!(head, None);
    }

    #[test]
    fn window_outside_image() {
        let image = arrow_image();
        let head = ArrowheadDetector::default().detect(
            &image,
            Coord::new(-100.0, -100.0),
            Coord::new(-1.0, 0.0),
            BLUE,
            &ImageLogger::disabled(),
        );
        assert_eq!(head, None);
    }
}
