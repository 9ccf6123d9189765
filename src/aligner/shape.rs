use diagram_align_collections::MinMaxRecord;
use diagram_align_kernel::types::{
    alignment::{ShapeAlignment, ShapeTarget},
    color::{hue_distance, Bgr},
    geometry::{Bounds, ClosedShape, Coord, ShapeKind},
};
use imageproc::{
    distance_transform::Norm,
    image::{GrayImage, RgbImage},
    morphology,
    point::Point,
    rect::Rect,
};
use rayon::prelude::*;

use crate::{
    algorithm::{median_color, normalized_cross_correlation, shape_match_score},
    geometry::SearchWindow,
    image_process::{
        background_color, clamp_radius, crop, draw_contour, fill_contour, image_rect, pad,
        render_over, TemplateStyle,
    },
    operator::{DetectedShape, ShapeExtractor},
    util::{ImageLogger, Progress, Reporter},
};

use super::AlignOutcome;

/// Snaps a rectangle, rounded rectangle or ellipse onto the outline drawn
/// near it and reads back its pen style.
#[derive(Debug, Clone)]
pub struct ShapeAligner {
    pub extractor: ShapeExtractor,
    /// Half-size of the search window relative to the target size.
    pub window_scale: f32,
    /// Smallest contour area considered, relative to the target area.
    pub min_area_ratio: f32,
    /// Weight of the relative size difference when picking a shape.
    pub size_weight: f32,
    pub pen_widths: Vec<u32>,
    pub radii: Vec<f32>,
    /// The current radius and this far either side of it are tried too.
    pub radius_step: f32,
    /// Erosion keeping fill samples clear of the border.
    pub fill_erosion: u8,
    /// Dilation of the contour from which pen color is sampled. Zero keeps
    /// the outermost ink pixels only, so a hairline outline still samples
    /// ink rather than the paper either side of it.
    pub edge_dilation: u8,
    /// Hue distance, in half-degrees, a pen color sample must stay below.
    pub pen_hue_distance: u8,
    pub pen_min_saturation: u8,
}

impl Default for ShapeAligner {
    fn default() -> Self {
        Self {
            extractor: ShapeExtractor::default(),
            window_scale: 1.5,
            min_area_ratio: 0.1,
            size_weight: 50.0,
            pen_widths: vec![1, 2, 3, 4, 5, 6, 8, 10],
            radii: vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 15.0, 20.0, 25.0, 30.0],
            radius_step: 2.0,
            fill_erosion: 6,
            edge_dilation: 0,
            pen_hue_distance: 25,
            pen_min_saturation: 30,
        }
    }
}

impl ShapeAligner {
    #[tracing::instrument(level = "trace", skip_all, fields(kind = %target.shape.kind, bounds = %target.shape.bounds))]
    pub fn align(
        &self,
        image: &RgbImage,
        target: &ShapeTarget,
        progress: &mut dyn Progress,
        logger: &ImageLogger,
    ) -> AlignOutcome<ShapeAlignment> {
        let mut reporter = Reporter::new(progress);
        let outcome = match self.try_align(image, target, &mut reporter, logger) {
            Some(result) => {
                reporter.report(format!("aligned to {}", result.shape.bounds));
                AlignOutcome::Aligned(result)
            }
            None => {
                reporter.report("no matching shape found");
                AlignOutcome::Unchanged(ShapeAlignment::unchanged(target))
            }
        };
        logger.flush("align-shape");
        outcome
    }

    fn try_align(
        &self,
        image: &RgbImage,
        target: &ShapeTarget,
        reporter: &mut Reporter<'_>,
        logger: &ImageLogger,
    ) -> Option<ShapeAlignment> {
        let bounds = target.shape.bounds;
        if bounds.w <= 0.0 || bounds.h <= 0.0 {
            return None;
        }

        reporter.report("detecting background");
        let background = background_color(image);
        let padding = bounds.w.max(bounds.h).ceil() as u32;
        let padded = pad(image, padding, background);
        let offset = Coord::new(padding as f32, padding as f32);

        let window = SearchWindow::around(
            bounds.center() + offset,
            self.window_scale * bounds.w,
            self.window_scale * bounds.h,
        )
        .clip(image_rect(&padded)?)?;
        let region = logger.log(crop(&padded, window));
        logger.end_group();

        reporter.report("extracting shapes");
        let shapes = self.extractor.extract(
            &region,
            Some(target.pen_color),
            self.min_area_ratio * bounds.area(),
            logger,
        );
        let expected = shift(&bounds, offset);
        let (best, score) = shapes
            .into_iter()
            .map(|shape| shape.translated(window.left(), window.top()))
            .map(|shape| {
                let score = shape_match_score(&shape.bounds, &expected, self.size_weight);
                (shape, score)
            })
            .collect::<MinMaxRecord<_, _>>()
            .into_min()?;
        tracing::debug!(bounds = %best.bounds, score, "selected shape");
        reporter.report(format!("matched shape, score {score:.1}"));

        let rect = bounds_rect(&best.bounds)?;
        let patch = logger.log(crop(&padded, rect));
        let contour = local_contour(&best, rect);
        let fill = self.sample_fill(&patch, &contour, background, logger);

        reporter.report("fitting pen width");
        let pen_width = self
            .fit_pen_width(&patch, target, fill, background)
            .unwrap_or(target.pen_width);

        let kind = match target.shape.kind {
            ShapeKind::RoundedRect { radius } => {
                reporter.report("fitting corner radius");
                let style = TemplateStyle {
                    fill,
                    border: target.pen_color,
                    border_width: pen_width,
                };
                let radius = self
                    .fit_radius(&patch, radius, &style, background)
                    .unwrap_or(radius);
                ShapeKind::RoundedRect { radius }
            }
            kind => kind,
        };

        reporter.report("sampling pen color");
        let pen_color = self.sample_pen_color(&patch, &contour, target.pen_color);
        logger.end_group();

        Some(ShapeAlignment {
            shape: ClosedShape {
                bounds: shift(&best.bounds, Coord::default() - offset),
                kind,
            },
            pen_width,
            pen_color,
        })
    }

    /// Median interior color, away from the border.
    fn sample_fill(
        &self,
        patch: &RgbImage,
        contour: &[Point<i32>],
        background: Bgr,
        logger: &ImageLogger,
    ) -> Bgr {
        let mut mask = GrayImage::new(patch.width(), patch.height());
        fill_contour(&mut mask, contour);
        let interior = logger.log(morphology::erode(&mask, Norm::LInf, self.fill_erosion));
        median_color(masked_pixels(patch, &interior)).unwrap_or(background)
    }

    fn fit_pen_width(
        &self,
        patch: &RgbImage,
        target: &ShapeTarget,
        fill: Bgr,
        background: Bgr,
    ) -> Option<u32> {
        let (w, h) = patch.dimensions();
        let scores = self
            .pen_widths
            .par_iter()
            .map(|&border_width| {
                let style = TemplateStyle {
                    fill,
                    border: target.pen_color,
                    border_width,
                };
                let template = render_over(target.shape.kind, w, h, &style, background);
                (border_width, normalized_cross_correlation(&template, patch))
            })
            .collect::<Vec<_>>();
        let record = scores.into_iter().collect::<MinMaxRecord<_, _>>();
        tracing::trace!(%record, "pen width");
        record.into_max().map(|(width, _)| width)
    }

    fn fit_radius(
        &self,
        patch: &RgbImage,
        current: f32,
        style: &TemplateStyle,
        background: Bgr,
    ) -> Option<f32> {
        let (w, h) = patch.dimensions();
        let mut candidates = self
            .radii
            .iter()
            .copied()
            .chain([current - self.radius_step, current, current + self.radius_step])
            .map(|r| clamp_radius(r, w as i32, h as i32))
            .collect::<Vec<_>>();
        candidates.sort_unstable();
        candidates.dedup();

        let scores = candidates
            .into_par_iter()
            .map(|radius| {
                let kind = ShapeKind::RoundedRect {
                    radius: radius as f32,
                };
                let template = render_over(kind, w, h, style, background);
                (radius, normalized_cross_correlation(&template, patch))
            })
            .collect::<Vec<_>>();
        let record = scores.into_iter().collect::<MinMaxRecord<_, _>>();
        tracing::trace!(%record, "corner radius");
        record.into_max().map(|(radius, _)| radius as f32)
    }

    /// Median of the outline pixels close in hue to the expected pen color,
    /// or of every outline pixel when none are.
    fn sample_pen_color(&self, patch: &RgbImage, contour: &[Point<i32>], expected: Bgr) -> Bgr {
        let mut mask = GrayImage::new(patch.width(), patch.height());
        draw_contour(&mut mask, contour);
        if self.edge_dilation > 0 {
            mask = morphology::dilate(&mask, Norm::LInf, self.edge_dilation);
        }
        let edge = masked_pixels(patch, &mask).collect::<Vec<_>>();

        let expected_hue = expected.to_hsv().h;
        let matching = edge
            .iter()
            .copied()
            .filter(|&c| self.is_pen_sample(c, expected_hue));
        median_color(matching)
            .or_else(|| median_color(edge.iter().copied()))
            .unwrap_or(expected)
    }

    fn is_pen_sample(&self, color: Bgr, expected_hue: u8) -> bool {
        let hsv = color.to_hsv();
        hue_distance(hsv.h, expected_hue) < self.pen_hue_distance
            && hsv.s > self.pen_min_saturation
    }
}

fn shift(bounds: &Bounds, offset: Coord) -> Bounds {
    Bounds::new(bounds.x + offset.x, bounds.y + offset.y, bounds.w, bounds.h)
}

fn bounds_rect(bounds: &Bounds) -> Option<Rect> {
    (bounds.w >= 1.0 && bounds.h >= 1.0).then(|| {
        Rect::at(bounds.x as i32, bounds.y as i32).of_size(bounds.w as u32, bounds.h as u32)
    })
}

fn local_contour(shape: &DetectedShape, rect: Rect) -> Vec<Point<i32>> {
    shape
        .contour
        .iter()
        .map(|p| Point::new(p.x - rect.left(), p.y - rect.top()))
        .collect()
}

fn masked_pixels<'a>(image: &'a RgbImage, mask: &'a GrayImage) -> impl Iterator<Item = Bgr> + 'a {
    image
        .enumerate_pixels()
        .filter(|(x, y, _)| mask.get_pixel(*x, *y).0[0] > 0)
        .map(|(_, _, p)| Bgr::from_rgb(p.0))
}
