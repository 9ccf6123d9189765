use std::f32::consts::PI;

use diagram_align_kernel::types::{
    color::Bgr,
    geometry::{Coord, LineGeometry},
};
use imageproc::{
    edges,
    geometry::{arc_length, convex_hull},
    image::{GrayImage, Luma, RgbImage},
};

use crate::{
    algorithm::{polygon_area, rotated_extent},
    image_process::{fill_contour, outer_contours, ColorMatcher, ColorTolerance, MaskCleanup},
    util::ImageLogger,
};

pub use self::{hough::*, merge::*};

mod hough;
mod merge;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedLine {
    pub line: LineGeometry,
    pub is_dashed: bool,
}

impl DetectedLine {
    pub fn length(&self) -> f32 {
        self.line.length()
    }

    pub fn angle(&self) -> f32 {
        self.line.angle()
    }

    pub fn midpoint(&self) -> Coord {
        self.line.midpoint()
    }

    pub fn translated(&self, offset: Coord) -> Self {
        Self {
            line: self.line.translated(offset),
            ..*self
        }
    }
}

/// Finds straight strokes drawn in one pen color.
#[derive(Debug, Clone)]
pub struct LineDetector {
    /// Hue tolerances tried in order until one yields segments.
    pub hue_tolerances: Vec<u8>,
    pub tolerance: ColorTolerance,
    pub cleanup: MaskCleanup,
    /// Keep only elongated, non-compact blobs so shape outlines in the same
    /// color do not vote.
    pub filter_enclosed_shapes: bool,
    pub min_aspect_ratio: f32,
    pub max_compactness: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Gaps along a single bridged segment that make it dashed. A label
    /// over a solid line leaves one.
    pub dashed_min_gaps: usize,
    pub hough: HoughSegments,
    pub merge: MergeSegments,
}

impl Default for LineDetector {
    fn default() -> Self {
        Self {
            hue_tolerances: vec![10, 15, 20, 25, 30],
            tolerance: ColorTolerance {
                saturation: 120,
                value: 120,
                ..ColorTolerance::default()
            },
            cleanup: MaskCleanup::default(),
            filter_enclosed_shapes: true,
            min_aspect_ratio: 2.0,
            max_compactness: 0.4,
            canny_low: 50.0,
            canny_high: 150.0,
            dashed_min_gaps: 2,
            hough: HoughSegments::default(),
            merge: MergeSegments::default(),
        }
    }
}

impl LineDetector {
    #[tracing::instrument(level = "trace", skip_all, fields(min_length = min_length))]
    pub fn detect(
        &self,
        image: &RgbImage,
        pen_color: Bgr,
        min_length: f32,
        logger: &ImageLogger,
    ) -> Vec<DetectedLine> {
        if image.width() == 0 || image.height() == 0 {
            return vec![];
        }

        for &hue in &self.hue_tolerances {
            let matcher = ColorMatcher::new(pen_color, self.tolerance.with_hue(hue));
            let mask = tracing::trace_span!("mask", hue).in_scope(|| {
                let mask = logger.log(matcher.mask(image));
                logger.log(self.cleanup.clean(&mask))
            });
            let mask = if self.filter_enclosed_shapes {
                tracing::trace_span!("line-like").in_scope(|| logger.log(self.line_like(&mask)))
            } else {
                mask
            };
            let edges = tracing::trace_span!("canny").in_scope(|| {
                logger.log(edges::canny(&mask, self.canny_low, self.canny_high))
            });
            logger.end_group();

            let segments = self.hough.find(&edges, &mask);
            if segments.is_empty() {
                continue;
            }
            tracing::trace!(hue, segments = segments.len(), "found segments");

            let segments = self.merge.dedup(segments);
            let lines = self
                .merge
                .merge(segments)
                .into_iter()
                .filter(|l| l.length() >= min_length)
                .map(|mut l| {
                    l.is_dashed |=
                        self.hough.interior_gaps(&l.line, &mask) >= self.dashed_min_gaps;
                    l
                })
                .collect::<Vec<_>>();
            tracing::debug!(hue, lines = lines.len(), "detected lines");
            return lines;
        }
        vec![]
    }

    /// Rebuilds the mask from the blobs that look like strokes.
    fn line_like(&self, mask: &GrayImage) -> GrayImage {
        let mut keep = GrayImage::new(mask.width(), mask.height());
        for contour in outer_contours(mask) {
            let hull = convex_hull(&contour[..]);
            let (long, short) = rotated_extent(&hull);
            let aspect = long / short.max(1.0);
            let perimeter = arc_length(&contour, true) as f32;
            let compactness = if perimeter > 0.0 {
                4.0 * PI * polygon_area(&contour) / (perimeter * perimeter)
            } else {
                0.0
            };
            if aspect >= self.min_aspect_ratio && compactness < self.max_compactness {
                fill_contour(&mut keep, &contour);
            }
        }
        GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
            let set = keep.get_pixel(x, y).0[0] > 0 && mask.get_pixel(x, y).0[0] > 0;
            Luma([if set { 255 } else { 0 }])
        })
    }
}

#[cfg(test)]
mod tests {
    use diagram_align_kernel::types::geometry::ShapeKind;
    use imageproc::{
        drawing,
        image::{imageops, Rgb},
        rect::Rect,
    };

    use super::*;
    use crate::image_process::{render, TemplateStyle};

    const BLUE: Bgr = Bgr::new(255, 0, 0);

    fn white(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([255, 255, 255]))
    }

    fn blue_bar(image: &mut RgbImage, x: i32, y: i32, w: u32, h: u32) {
        drawing::draw_filled_rect_mut(image, Rect::at(x, y).of_size(w, h), Rgb(BLUE.to_rgb()));
    }

    #[test]
    fn detects_horizontal_stroke() {
        let mut image = white(300, 100);
        blue_bar(&mut image, 40, 50, 200, 2);
        let lines = LineDetector::default().detect(&image, BLUE, 50.0, &ImageLogger::disabled());
        assert_eq!(lines.len(), 1, "{lines:?}");
        let line = lines[0];
        assert!(!line.is_dashed);
        assert!((line.length() - 199.0).abs() < 3.0, "{}", line.line);
        assert!((line.midpoint().y - 50.5).abs() < 1.5, "{}", line.line);
        assert!(line.angle() < 2.0 || line.angle() > 178.0);
    }

    #[test]
    fn dashed_stroke_is_one_line() {
        let mut image = white(300, 100);
        for k in 0..10 {
            blue_bar(&mut image, 50 + 20 * k, 40, 10, 2);
        }
        let lines = LineDetector::default().detect(&image, BLUE, 50.0, &ImageLogger::disabled());
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!((lines[0].length() - 189.0).abs() < 3.0, "{}", lines[0].line);
        assert!(lines[0].is_dashed);
    }

    #[test]
    fn label_gap_does_not_make_a_line_dashed() {
        let mut image = white(300, 100);
        blue_bar(&mut image, 40, 50, 90, 2);
        blue_bar(&mut image, 170, 50, 90, 2);
        let lines = LineDetector::default().detect(&image, BLUE, 50.0, &ImageLogger::disabled());
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(!lines[0].is_dashed);
    }

    #[test]
    fn enclosed_shape_outline_is_ignored() {
        let mut image = white(300, 200);
        let outline = render(
            ShapeKind::Rect,
            120,
            100,
            &TemplateStyle {
                fill: Bgr::WHITE,
                border: BLUE,
                border_width: 2,
            },
        );
        imageops::replace(&mut image, &outline, 90, 50);
        let lines = LineDetector::default().detect(&image, BLUE, 30.0, &ImageLogger::disabled());
        assert!(lines.is_empty(), "{lines:?}");

        let unfiltered = LineDetector {
            filter_enclosed_shapes: false,
            ..LineDetector::default()
        };
        assert!(!unfiltered
            .detect(&image, BLUE, 30.0, &ImageLogger::disabled())
            .is_empty());
    }

    #[test]
    fn blank_image_has_no_lines() {
        let image = white(120, 80);
        let lines = LineDetector::default().detect(&image, BLUE, 10.0, &ImageLogger::disabled());
        assert!(lines.is_empty());
    }
}
