use diagram_align_kernel::types::geometry::{Coord, LineGeometry};
use imageproc::{
    hough::{self, LineDetectionOptions, PolarLine},
    image::GrayImage,
};

use crate::algorithm::{FindLineSegments, RunStats};

/// Segment detection on top of the standard Hough transform.
///
/// Each polar line voted for by the edge map is walked across the ink mask.
/// A step counts as ink when any mask pixel within `band` pixels of the line
/// is set, and ink runs are joined across gaps up to
/// `find_line_segments.max_line_gap` steps.
#[derive(Debug, Clone, Copy)]
pub struct HoughSegments {
    pub vote_threshold: u32,
    pub suppression_radius: u32,
    pub band: i32,
    pub find_line_segments: FindLineSegments,
}

impl Default for HoughSegments {
    fn default() -> Self {
        Self {
            vote_threshold: 30,
            suppression_radius: 8,
            band: 2,
            find_line_segments: FindLineSegments {
                vote_threshold: 10,
                min_line_len: 10,
                max_line_gap: 250,
            },
        }
    }
}

impl HoughSegments {
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn find(&self, edges: &GrayImage, mask: &GrayImage) -> Vec<LineGeometry> {
        if edges.width() == 0 || edges.height() == 0 {
            return vec![];
        }
        let options = LineDetectionOptions {
            vote_threshold: self.vote_threshold,
            suppression_radius: self.suppression_radius,
        };
        let polar_lines =
            tracing::trace_span!("hough").in_scope(|| hough::detect_lines(edges, options));
        tracing::trace!(polar_lines = polar_lines.len());

        polar_lines
            .iter()
            .flat_map(|line| self.walk(line, mask))
            .collect()
    }

    fn walk(&self, line: &PolarLine, mask: &GrayImage) -> Vec<LineGeometry> {
        let theta = (line.angle_in_degrees as f32).to_radians();
        let normal = Coord::new(theta.cos(), theta.sin());
        let dir = Coord::new(-theta.sin(), theta.cos());
        let origin = normal * line.r;

        let (w, h) = (mask.width() as f32, mask.height() as f32);
        let Some((t0, t1)) = clip_param(origin.x, dir.x, w - 1.0)
            .zip(clip_param(origin.y, dir.y, h - 1.0))
            .and_then(|((a0, a1), (b0, b1))| {
                let t0 = a0.max(b0).ceil() as i32;
                let t1 = a1.min(b1).floor() as i32;
                (t0 <= t1).then_some((t0, t1))
            })
        else {
            return vec![];
        };

        let offsets = (t0..=t1)
            .map(|t| self.ink_offset(mask, origin + dir * t as f32, normal))
            .collect::<Vec<_>>();

        self.find_line_segments
            .find(offsets.iter().map(Option::is_some))
            .map(|range| {
                let inked = offsets[range.start as usize..range.end as usize]
                    .iter()
                    .flatten()
                    .copied()
                    .collect::<Vec<_>>();
                let shift = inked.iter().sum::<f32>() / inked.len().max(1) as f32;
                let at = |i: i32| origin + dir * (t0 + i) as f32 + normal * shift;
                LineGeometry::from_coords(at(range.start), at(range.end - 1))
            })
            .collect()
    }

    /// Number of unset stretches strictly between the ends of `line`, as
    /// seen through the same band that joined it.
    pub fn interior_gaps(&self, line: &LineGeometry, mask: &GrayImage) -> usize {
        let steps = line.length().round() as i32;
        let (start, dir, normal) = (line.start(), line.direction(), line.normal());
        let stats = RunStats::measure(
            (0..=steps).map(|i| self.ink_offset(mask, start + dir * i as f32, normal).is_some()),
        );
        stats.gap_runs.len()
    }

    /// Mean normal offset of the ink near `p`, if there is any.
    fn ink_offset(&self, mask: &GrayImage, p: Coord, normal: Coord) -> Option<f32> {
        let (w, h) = (mask.width() as i32, mask.height() as i32);
        let mut sum = 0;
        let mut count = 0;
        for k in -self.band..=self.band {
            let (x, y) = (p + normal * k as f32).round();
            if x < 0 || y < 0 || x >= w || y >= h {
                continue;
            }
            if mask.get_pixel(x as u32, y as u32).0[0] > 0 {
                sum += k;
                count += 1;
            }
        }
        (count > 0).then(|| sum as f32 / count as f32)
    }
}

/// Parameter interval where `origin + t * dir` stays within `[0, max]`.
fn clip_param(origin: f32, dir: f32, max: f32) -> Option<(f32, f32)> {
    if dir.abs() < 1e-6 {
        return (-0.5..=max + 0.5)
            .contains(&origin)
            .then_some((f32::MIN, f32::MAX));
    }
    let a = (0.0 - origin) / dir;
    let b = (max - origin) / dir;
    Some((a.min(b), a.max(b)))
}
