use diagram_align_kernel::types::{
    alignment::LinePattern,
    color::Bgr,
    geometry::{Coord, LineGeometry},
};
use imageproc::image::RgbImage;

use crate::{
    algorithm::{median_color, median_u32, RunStats},
    image_process::{color_at, ColorMatcher, ColorTolerance},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStyle {
    pub pattern: LinePattern,
    pub color: Bgr,
    pub width: u32,
}

/// Reads the dash pattern, color and width of a located line.
///
/// Only the two end regions are looked at; the middle of a line often
/// carries a label.
#[derive(Debug, Clone)]
pub struct LineSampler {
    /// Length of each sampled end region as a fraction of the line.
    pub end_fraction: f32,
    pub step: f32,
    /// Minimum summed BGR difference from the background for ink.
    pub ink_threshold: u32,
    pub dashed_background_fraction: f32,
    pub dashed_min_transitions: u32,
    /// Where the width is probed, as fractions of the length from each end.
    pub width_probes: Vec<f32>,
    pub width_reach: i32,
    pub width_range: (u32, u32),
    pub width_tolerance: ColorTolerance,
}

impl Default for LineSampler {
    fn default() -> Self {
        Self {
            end_fraction: 0.25,
            step: 1.0,
            ink_threshold: 40,
            dashed_background_fraction: 0.2,
            dashed_min_transitions: 2,
            width_probes: vec![0.1, 0.15, 0.2, 0.25],
            width_reach: 10,
            width_range: (1, 20),
            width_tolerance: ColorTolerance {
                hue: 20,
                saturation: 120,
                value: 120,
                ..ColorTolerance::default()
            },
        }
    }
}

impl LineSampler {
    #[tracing::instrument(level = "trace", skip_all, fields(line = %line))]
    pub fn sample(
        &self,
        image: &RgbImage,
        line: &LineGeometry,
        background: Bgr,
        pen_color: Bgr,
        pen_width: u32,
    ) -> LineStyle {
        let length = line.length();
        let dir = line.direction();
        let normal = line.normal();
        let region = (length * self.end_fraction).max(0.0);
        let count = (region / self.step.max(f32::EPSILON)).floor() as i32;

        let mut stats = RunStats::default();
        let mut ink = vec![];
        for (origin, sign) in [(line.start(), 1.0), (line.end(), -1.0)] {
            let samples = (0..=count)
                .map(|i| {
                    let p = origin + dir * (sign * i as f32 * self.step);
                    self.classify(image, p, normal, background)
                })
                .collect::<Vec<_>>();
            ink.extend(samples.iter().flatten().copied());
            stats.append(RunStats::measure(samples.iter().map(Option::is_some)));
        }

        let background_fraction = stats.unset_fraction();
        let pattern = if background_fraction > self.dashed_background_fraction
            && stats.transitions >= self.dashed_min_transitions
        {
            let dash_length = median_u32(&mut stats.set_runs).unwrap_or(0);
            let gap_length = median_u32(&mut stats.gap_runs).unwrap_or(dash_length);
            LinePattern::Dashed {
                dash_length,
                gap_length,
            }
        } else {
            LinePattern::Solid
        };
        tracing::trace!(background_fraction, transitions = stats.transitions, %pattern);

        let color = median_color(ink).unwrap_or(pen_color);
        let width = self.width(image, line, pen_color).unwrap_or(pen_width);
        tracing::debug!(%pattern, color = %color.to_hex(), width, "sampled line style");

        LineStyle {
            pattern,
            color,
            width,
        }
    }

    /// The most distinct pixel at `p` or one step either side of the line,
    /// if it differs enough from the background.
    fn classify(&self, image: &RgbImage, p: Coord, normal: Coord, background: Bgr) -> Option<Bgr> {
        [p, p + normal, p - normal]
            .into_iter()
            .filter_map(|q| {
                let (x, y) = q.round();
                color_at(image, x, y)
            })
            .map(|c| (c.abs_diff_sum(background), c))
            .max_by_key(|(diff, _)| *diff)
            .filter(|(diff, _)| *diff > self.ink_threshold)
            .map(|(_, c)| c)
    }

    fn width(&self, image: &RgbImage, line: &LineGeometry, pen_color: Bgr) -> Option<u32> {
        let matcher = ColorMatcher::new(pen_color, self.width_tolerance);
        let length = line.length();
        let dir = line.direction();
        let normal = line.normal();

        let mut counts = vec![];
        for (origin, sign) in [(line.start(), 1.0), (line.end(), -1.0)] {
            for &fraction in &self.width_probes {
                let p = origin + dir * (sign * fraction * length);
                let count = (-self.width_reach..=self.width_reach)
                    .filter(|&k| {
                        let (x, y) = (p + normal * k as f32).round();
                        color_at(image, x, y).is_some_and(|c| matcher.matches(c))
                    })
                    .count() as u32;
                if count > 0 {
                    counts.push(count);
                }
            }
        }
        let (lo, hi) = self.width_range;
        median_u32(&mut counts).map(|w| w.clamp(lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use imageproc::{drawing, image::Rgb, rect::Rect};

    use super::*;

    const BLUE: Bgr = Bgr::new(255, 0, 0);

    fn canvas() -> RgbImage {
        RgbImage::from_pixel(300, 100, Rgb([255, 255, 255]))
    }

    fn bar(image: &mut RgbImage, x: i32, y: i32, w: u32, h: u32, color: Bgr) {
        drawing::draw_filled_rect_mut(image, Rect::at(x, y).of_size(w, h), Rgb(color.to_rgb()));
    }

    #[test]
    fn solid_line_style() {
        let mut image = canvas();
        bar(&mut image, 50, 50, 200, 3, BLUE);
        let line = LineGeometry::new(50.0, 51.0, 249.0, 51.0);
        let style = LineSampler::default().sample(&image, &line, Bgr::WHITE, BLUE, 1);
        assert_eq!(style.pattern, LinePattern::Solid);
        assert_eq!(style.color, BLUE);
        assert_eq!(style.width, 3);
    }

    #[test]
    fn dashed_line_ignores_label_in_the_middle() {
        let mut image = canvas();
        for k in 0..10 {
            bar(&mut image, 50 + 20 * k, 50, 10, 2, BLUE);
        }
        // a label covering the middle
        bar(&mut image, 120, 40, 60, 22, Bgr::BLACK);
        let line = LineGeometry::new(50.0, 50.5, 239.0, 50.5);
        let style = LineSampler::default().sample(&image, &line, Bgr::WHITE, BLUE, 1);
        let LinePattern::Dashed {
            dash_length,
            gap_length,
        } = style.pattern
        else {
            panic!("expected dashes, got {}", style.pattern);
        };
        assert!(dash_length.abs_diff(10) <= 3, "{dash_length}");
        assert!(gap_length.abs_diff(10) <= 3, "{gap_length}");
        assert_eq!(style.color, BLUE);
        assert_eq!(style.width, 2);
    }

    #[test]
    fn falls_back_to_pen_style_without_ink() {
        let image = canvas();
        let line = LineGeometry::new(50.0, 50.0, 250.0, 50.0);
        let red = Bgr::new(0, 0, 255);
        let style = LineSampler::default().sample(&image, &line, Bgr::WHITE, red, 4);
        assert_eq!(style.pattern, LinePattern::Solid);
        assert_eq!(style.color, red);
        assert_eq!(style.width, 4);
    }
}
