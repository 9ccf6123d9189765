use std::collections::HashSet;

use diagram_align_kernel::types::{
    color::Bgr,
    geometry::{Bounds, Coord},
};
use imageproc::{image::RgbImage, point::Point};

use crate::{
    algorithm::{bounding_box, polygon_area},
    image_process::{outer_contours, ColorMatcher, ColorTolerance, MaskCleanup},
    util::ImageLogger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedKind {
    Rect,
    Ellipse,
}

#[derive(custom_debug::Debug, Clone)]
pub struct DetectedShape {
    #[debug(skip)]
    pub contour: Vec<Point<i32>>,
    pub bounds: Bounds,
    pub center: Coord,
    pub area: f32,
    pub fill_ratio: f32,
    pub kind: DetectedKind,
}

impl DetectedShape {
    pub fn translated(mut self, dx: i32, dy: i32) -> Self {
        for p in &mut self.contour {
            p.x += dx;
            p.y += dy;
        }
        self.bounds.x += dx as f32;
        self.bounds.y += dy as f32;
        self.center = self.center + Coord::new(dx as f32, dy as f32);
        self
    }
}

/// Finds closed outlines drawn in one pen color.
#[derive(Debug, Clone)]
pub struct ShapeExtractor {
    /// Hue tolerances tried in order; contours from every level are kept.
    pub hue_tolerances: Vec<u8>,
    pub tolerance: ColorTolerance,
    pub cleanup: MaskCleanup,
    pub min_side: f32,
    /// Centers falling in the same cell are one shape.
    pub grid_cell: f32,
    /// Fill ratios strictly inside this band are ellipses.
    pub ellipse_fill_ratio: (f32, f32),
}

impl Default for ShapeExtractor {
    fn default() -> Self {
        Self {
            hue_tolerances: vec![10, 15, 20, 25, 30],
            tolerance: ColorTolerance {
                saturation: 80,
                value: 80,
                ..ColorTolerance::default()
            },
            cleanup: MaskCleanup::default(),
            min_side: 15.0,
            grid_cell: 10.0,
            ellipse_fill_ratio: (0.75, 0.85),
        }
    }
}

impl ShapeExtractor {
    /// Returns the shapes found in `image`, in discovery order. Nothing is
    /// found without a pen color.
    #[tracing::instrument(level = "trace", skip_all, fields(min_area = min_area))]
    pub fn extract(
        &self,
        image: &RgbImage,
        pen_color: Option<Bgr>,
        min_area: f32,
        logger: &ImageLogger,
    ) -> Vec<DetectedShape> {
        let Some(pen_color) = pen_color else {
            return vec![];
        };

        let mut shapes = vec![];
        let mut cells = HashSet::new();
        for &hue in &self.hue_tolerances {
            let matcher = ColorMatcher::new(pen_color, self.tolerance.with_hue(hue));
            let mask = tracing::trace_span!("mask", hue)
                .in_scope(|| logger.log(matcher.mask(image)));
            let mask =
                tracing::trace_span!("cleanup").in_scope(|| logger.log(self.cleanup.clean(&mask)));
            logger.end_group();

            let contours = tracing::trace_span!("contours").in_scope(|| outer_contours(&mask));
            for contour in contours {
                let Some(shape) = self.classify(contour, min_area) else {
                    continue;
                };
                let cell = (
                    (shape.center.x / self.grid_cell).floor() as i64,
                    (shape.center.y / self.grid_cell).floor() as i64,
                );
                if !cells.insert(cell) {
                    continue;
                }
                tracing::trace!(hue, bounds = %shape.bounds, kind = ?shape.kind, fill_ratio = shape.fill_ratio);
                shapes.push(shape);
            }
        }
        tracing::debug!(count = shapes.len(), "extracted shapes");
        shapes
    }

    fn classify(&self, contour: Vec<Point<i32>>, min_area: f32) -> Option<DetectedShape> {
        let bounds = bounding_box(&contour)?;
        let area = polygon_area(&contour);
        if area < min_area || bounds.w < self.min_side || bounds.h < self.min_side {
            return None;
        }
        // the contour runs through pixel centers, so compare against the box
        // spanned by those centers
        let fill_ratio = area / ((bounds.w - 1.0).max(1.0) * (bounds.h - 1.0).max(1.0));
        let (lo, hi) = self.ellipse_fill_ratio;
        let kind = if lo < fill_ratio && fill_ratio < hi {
            DetectedKind::Ellipse
        } else {
            DetectedKind::Rect
        };
        Some(DetectedShape {
            center: bounds.center(),
            contour,
            bounds,
            area,
            fill_ratio,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use diagram_align_kernel::types::geometry::ShapeKind;
    use imageproc::image::{imageops, Rgb};

    use super::*;
    use crate::image_process::{render, TemplateStyle};

    const BLUE: Bgr = Bgr::new(255, 0, 0);

    fn canvas_with(shapes: &[(ShapeKind, i64, i64, u32, u32)]) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(300, 200, Rgb([255, 255, 255]));
        let style = TemplateStyle {
            fill: Bgr::WHITE,
            border: BLUE,
            border_width: 2,
        };
        for &(kind, x, y, w, h) in shapes {
            imageops::replace(&mut canvas, &render(kind, w, h, &style), x, y);
        }
        canvas
    }

    #[test]
    fn classifies_by_fill_ratio() {
        let image = canvas_with(&[
            (ShapeKind::Rect, 20, 20, 80, 50),
            (ShapeKind::Rect, 150, 100, 61, 41),
        ]);
        let shapes =
            ShapeExtractor::default().extract(&image, Some(BLUE), 100.0, &ImageLogger::disabled());
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].kind, DetectedKind::Rect);
        assert_eq!(shapes[0].bounds, Bounds::new(20.0, 20.0, 80.0, 50.0));
    }

    #[test]
    fn detects_ellipse() {
        let mut image = RgbImage::from_pixel(200, 120, Rgb([255, 255, 255]));
        let style = TemplateStyle {
            fill: Bgr::WHITE,
            border: BLUE,
            border_width: 2,
        };
        let template = render(ShapeKind::Ellipse, 101, 61, &style);
        for (x, y, p) in template.enumerate_pixels() {
            if p.0 != [0, 0, 0] {
                image.put_pixel(x + 30, y + 20, *p);
            }
        }
        let shapes =
            ShapeExtractor::default().extract(&image, Some(BLUE), 100.0, &ImageLogger::disabled());
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].kind, DetectedKind::Ellipse);
        assert_eq!(shapes[0].bounds, Bounds::new(30.0, 20.0, 101.0, 61.0));
    }

    #[test]
    fn no_pen_color_or_no_ink_finds_nothing() {
        let image = canvas_with(&[(ShapeKind::Rect, 20, 20, 80, 50)]);
        let extractor = ShapeExtractor::default();
        let logger = ImageLogger::disabled();
        assert!(extractor.extract(&image, None, 0.0, &logger).is_empty());
        let red = Bgr::new(0, 0, 255);
        assert!(extractor.extract(&image, Some(red), 0.0, &logger).is_empty());
    }

    #[test]
    fn small_contours_are_rejected() {
        let image = canvas_with(&[(ShapeKind::Rect, 20, 20, 10, 40)]);
        let shapes =
            ShapeExtractor::default().extract(&image, Some(BLUE), 0.0, &ImageLogger::disabled());
        assert!(shapes.is_empty());
    }

    #[test]
    fn one_shape_per_grid_cell() {
        let image = canvas_with(&[
            (ShapeKind::Rect, 20, 20, 80, 50),
            (ShapeKind::Rect, 24, 22, 72, 46),
            (ShapeKind::Rect, 150, 100, 61, 41),
        ]);
        let extractor = ShapeExtractor::default();
        let shapes = extractor.extract(&image, Some(BLUE), 0.0, &ImageLogger::disabled());
        let mut cells = HashSet::new();
        for shape in &shapes {
            let cell = (
                (shape.center.x / extractor.grid_cell).floor() as i64,
                (shape.center.y / extractor.grid_cell).floor() as i64,
            );
            assert!(cells.insert(cell), "duplicate cell {cell:?}");
        }
    }
}
