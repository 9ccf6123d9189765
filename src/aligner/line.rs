use diagram_align_collections::MinMaxRecord;
use diagram_align_kernel::types::{
    alignment::{ArrowMode, LineAlignment, LineTarget},
    geometry::{angle_difference, Coord, LineGeometry},
};
use imageproc::image::RgbImage;

use crate::{
    geometry::{SearchWindow, TouchedEdges},
    image_process::{background_color, crop, image_rect, pad},
    operator::{ArrowheadDetector, DetectedLine, LineDetector, LineSampler, OrthogonalSearch},
    util::{ImageLogger, Progress, Reporter},
};

use super::{AlignOutcome, TextLocator};

/// Snaps a line onto the stroke drawn near it and reads back its arrowheads,
/// dash pattern, color and width.
#[derive(Debug, Clone)]
pub struct LineAligner {
    pub detector: LineDetector,
    pub arrowheads: ArrowheadDetector,
    pub sampler: LineSampler,
    pub orthogonal: OrthogonalSearch,
    /// Search margin around the line's box, relative to its extent.
    pub margin_ratio: f32,
    pub min_margin: f32,
    /// Growth per touched edge when a detection runs into the window border.
    pub expand_step: i32,
    pub max_expansions: u32,
    /// How close to a window edge an endpoint must be to touch it.
    pub edge_distance: f32,
    /// Shortest detection considered, relative to the target length.
    pub min_length_ratio: f32,
    pub min_length: f32,
    pub midpoint_weight: f32,
    pub angle_weight: f32,
    pub length_weight: f32,
}

impl Default for LineAligner {
    fn default() -> Self {
        Self {
            detector: LineDetector::default(),
            arrowheads: ArrowheadDetector::default(),
            sampler: LineSampler::default(),
            orthogonal: OrthogonalSearch::default(),
            margin_ratio: 0.2,
            min_margin: 20.0,
            expand_step: 30,
            max_expansions: 5,
            edge_distance: 2.0,
            min_length_ratio: 0.3,
            min_length: 10.0,
            midpoint_weight: 0.4,
            angle_weight: 0.35,
            length_weight: 0.25,
        }
    }
}

impl LineAligner {
    #[tracing::instrument(level = "trace", skip_all, fields(line = %target.line))]
    pub fn align(
        &self,
        image: &RgbImage,
        target: &LineTarget,
        text_locator: &dyn TextLocator,
        progress: &mut dyn Progress,
        logger: &ImageLogger,
    ) -> AlignOutcome<LineAlignment> {
        let mut reporter = Reporter::new(progress);
        let outcome = match self.try_align(image, target, text_locator, &mut reporter, logger) {
            Some(result) => {
                reporter.report(format!("aligned to {}", result.line));
                AlignOutcome::Aligned(result)
            }
            None => {
                reporter.report("no matching line found");
                AlignOutcome::Unchanged(LineAlignment::unchanged(target))
            }
        };
        logger.flush("align-line");
        outcome
    }

    fn try_align(
        &self,
        image: &RgbImage,
        target: &LineTarget,
        text_locator: &dyn TextLocator,
        reporter: &mut Reporter<'_>,
        logger: &ImageLogger,
    ) -> Option<LineAlignment> {
        let length = target.line.length();
        if length <= 0.0 {
            return None;
        }
        let expected = self.recenter(image, target, text_locator, reporter);

        reporter.report("detecting background");
        let background = background_color(image);
        let bounds = expected.bounds();
        let margin_x = (self.margin_ratio * bounds.w).max(self.min_margin);
        let margin_y = (self.margin_ratio * bounds.h).max(self.min_margin);
        let padding = (margin_x.max(margin_y)
            + (self.expand_step as f32) * self.max_expansions as f32)
            .ceil() as u32;
        let padded = pad(image, padding, background);
        let offset = Coord::new(padding as f32, padding as f32);
        let expected = expected.translated(offset);
        let padded_rect = image_rect(&padded)?;

        let min_length = (self.min_length_ratio * length).max(self.min_length);
        let detect = |window: &SearchWindow| -> Vec<DetectedLine> {
            let Some(rect) = window.clip(padded_rect) else {
                return vec![];
            };
            let origin = Coord::new(rect.left() as f32, rect.top() as f32);
            let region = logger.log(crop(&padded, rect));
            self.detector
                .detect(&region, target.pen_color, min_length, logger)
                .into_iter()
                .map(|l| l.translated(origin))
                .collect()
        };

        reporter.report("detecting lines");
        let mut window = SearchWindow::around_line(&expected, margin_x, margin_y);
        let mut lines = detect(&window);
        for expansion in 1..=self.max_expansions {
            let touched = lines
                .iter()
                .flat_map(|l| [l.line.start(), l.line.end()])
                .map(|p| window.touched_edges(p, self.edge_distance))
                .fold(TouchedEdges::default(), TouchedEdges::union);
            if lines.is_empty() || !touched.any() {
                break;
            }
            window = window.grow(touched, self.expand_step);
            reporter.report(format!("expanding search window ({expansion})"));
            lines = detect(&window);
        }

        if lines.is_empty() {
            reporter.report("searching sideways");
            let found = self.orthogonal.search(&expected, &detect)?;
            lines.push(found.line);
        }

        let (best, score) = lines
            .into_iter()
            .map(|l| {
                let score = self.score(&expected, &l);
                (l, score)
            })
            .collect::<MinMaxRecord<_, _>>()
            .into_min()?;
        tracing::debug!(line = %best.line, score, dashed = best.is_dashed, "selected line");
        reporter.report(format!("matched line, score {score:.2}"));

        let mut line = best.line;
        if line.start().distance(expected.start()) > line.end().distance(expected.start()) {
            line = line.reversed();
        }

        reporter.report("detecting arrowheads");
        let outward = line.end() - line.start();
        let heads = [
            (line.start(), Coord::default() - outward),
            (line.end(), outward),
        ]
        .map(|(endpoint, dir)| {
            self.arrowheads
                .detect(&padded, endpoint, dir, target.pen_color, logger)
        });
        let [start_head, end_head] = heads;
        if let Some(head) = start_head {
            line = LineGeometry::from_coords(head.tip, line.end());
        }
        if let Some(head) = end_head {
            line = LineGeometry::from_coords(line.start(), head.tip);
        }
        let arrow_mode = ArrowMode::from_ends(start_head.is_some(), end_head.is_some());
        let arrow_size = heads.iter().flatten().map(|h| h.size).reduce(f32::max);
        logger.end_group();

        reporter.report("sampling line style");
        let style = self.sampler.sample(
            &padded,
            &line,
            background,
            target.pen_color,
            target.pen_width,
        );

        Some(LineAlignment {
            line: line.translated(Coord::default() - offset),
            pen_width: style.width,
            pen_color: style.color,
            arrow_mode,
            arrow_size,
            pattern: style.pattern,
        })
    }

    /// The target line, moved so its midpoint sits on its label or note
    /// when one can be located. Only the position changes.
    fn recenter(
        &self,
        image: &RgbImage,
        target: &LineTarget,
        text_locator: &dyn TextLocator,
        reporter: &mut Reporter<'_>,
    ) -> LineGeometry {
        let texts = [target.label_text.as_deref(), target.note_text.as_deref()];
        let Some(center) = texts
            .into_iter()
            .flatten()
            .filter(|text| !text.trim().is_empty())
            .find_map(|text| text_locator.locate(image, text))
        else {
            return target.line;
        };
        reporter.report(format!("recentered on text at {center}"));
        target.line.translated(center - target.line.midpoint())
    }

    /// Weighted midpoint, angle and length mismatch. Lower is better.
    fn score(&self, expected: &LineGeometry, candidate: &DetectedLine) -> f32 {
        let length = expected.length().max(1.0);
        let midpoint = candidate.midpoint().distance(expected.midpoint()) / length;
        let angle = angle_difference(candidate.angle(), expected.angle()) / 90.0;
        let size = (candidate.length() - expected.length()).abs() / length;
        self.midpoint_weight * midpoint + self.angle_weight * angle + self.length_weight * size
    }
}
