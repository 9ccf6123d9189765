use diagram_align_kernel::types::geometry::{angle_difference, LineGeometry};

use crate::{geometry::SearchWindow, operator::DetectedLine};

/// A line found away from where it was expected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetMatch {
    /// Distance along the expected line's normal.
    pub offset: f32,
    pub line: DetectedLine,
}

/// Looks for a line sideways of its expected position, then re-centers and
/// stretches the search window around it.
///
/// Detection is delegated to a closure taking a search window, so this
/// works in whatever coordinate space the caller detects in.
#[derive(Debug, Clone)]
pub struct OrthogonalSearch {
    pub step: f32,
    pub max_offset: f32,
    /// Bracket width at which the offset bisection stops.
    pub precision: f32,
    pub angle_tolerance: f32,
    /// Allowed length difference as a fraction of the expected length.
    pub length_tolerance: f32,
    pub window_margin: f32,
    pub max_center_iterations: u32,
    pub center_residual: f32,
    pub grow_step: f32,
    pub max_grow_steps: u32,
    /// Consecutive non-improving growth steps before stopping.
    pub grow_patience: u32,
    pub min_gain: f32,
}

impl Default for OrthogonalSearch {
    fn default() -> Self {
        Self {
            step: 10.0,
            max_offset: 150.0,
            precision: 5.0,
            angle_tolerance: 15.0,
            length_tolerance: 0.5,
            window_margin: 20.0,
            max_center_iterations: 10,
            center_residual: 3.0,
            grow_step: 30.0,
            max_grow_steps: 10,
            grow_patience: 2,
            min_gain: 1.0,
        }
    }
}

impl OrthogonalSearch {
    #[tracing::instrument(level = "trace", skip_all, fields(expected = %expected))]
    pub fn search<F>(&self, expected: &LineGeometry, detect: F) -> Option<OffsetMatch>
    where
        F: Fn(&SearchWindow) -> Vec<DetectedLine>,
    {
        if expected.length() <= 0.0 || self.step <= 0.0 {
            return None;
        }
        let probe = |offset: f32| self.probe(expected, offset, &detect);

        let found = [1.0, -1.0]
            .into_iter()
            .filter_map(|sign| self.scan(sign, &probe))
            .fold(None, |best: Option<OffsetMatch>, m| match best {
                Some(b) if b.offset.abs() <= m.offset.abs() => Some(b),
                _ => Some(m),
            })?;
        tracing::debug!(offset = found.offset, line = %found.line.line, "found offset line");

        let centered = self.center(expected, found, &probe);
        let grown = self.grow(expected, centered, &detect);
        tracing::debug!(offset = grown.offset, line = %grown.line.line, "refined offset line");
        Some(grown)
    }

    /// Steps outward in one direction until something matches, then
    /// bisects between the last empty and the first matching offset.
    fn scan(
        &self,
        sign: f32,
        probe: &impl Fn(f32) -> Option<DetectedLine>,
    ) -> Option<OffsetMatch> {
        let mut empty = 0.0;
        let mut hit = None;
        let mut offset = self.step;
        while offset <= self.max_offset {
            if let Some(line) = probe(sign * offset) {
                hit = Some((offset, line));
                break;
            }
            empty = offset;
            offset += self.step;
        }
        let (mut matched, mut line) = hit?;

        while matched - empty > self.precision {
            let mid = (empty + matched) / 2.0;
            match probe(sign * mid) {
                Some(l) => {
                    matched = mid;
                    line = l;
                }
                None => empty = mid,
            }
        }
        tracing::trace!(sign, offset = matched, "scan hit");
        Some(OffsetMatch {
            offset: sign * matched,
            line,
        })
    }

    /// Moves the window onto the found line until it sits within the
    /// residual tolerance or stops getting closer.
    fn center(
        &self,
        expected: &LineGeometry,
        mut current: OffsetMatch,
        probe: &impl Fn(f32) -> Option<DetectedLine>,
    ) -> OffsetMatch {
        for iteration in 0..self.max_center_iterations {
            let residual = self.residual(expected, &current);
            if residual.abs() < self.center_residual {
                break;
            }
            let offset = current.offset + residual;
            let Some(line) = probe(offset) else {
                break;
            };
            let next = OffsetMatch { offset, line };
            if self.residual(expected, &next).abs() >= residual.abs() {
                break;
            }
            tracing::trace!(iteration, offset, "centered");
            current = next;
        }
        current
    }

    /// Lengthens the window along the line while the detection keeps
    /// getting longer.
    fn grow<F>(&self, expected: &LineGeometry, current: OffsetMatch, detect: &F) -> OffsetMatch
    where
        F: Fn(&SearchWindow) -> Vec<DetectedLine>,
    {
        let mut best = current;
        let mut stalled = 0;
        for step in 1..=self.max_grow_steps {
            let line = expected
                .shifted(best.offset)
                .extended(step as f32 * self.grow_step);
            let Some(line) = self.closest(expected, best.offset, detect(&self.window(&line)), false)
            else {
                break;
            };
            if line.length() - best.line.length() <= self.min_gain {
                stalled += 1;
                if stalled >= self.grow_patience {
                    break;
                }
                continue;
            }
            stalled = 0;
            tracing::trace!(step, length = line.length(), "grown");
            best.line = line;
        }
        best
    }

    fn probe<F>(&self, expected: &LineGeometry, offset: f32, detect: &F) -> Option<DetectedLine>
    where
        F: Fn(&SearchWindow) -> Vec<DetectedLine>,
    {
        let window = self.window(&expected.shifted(offset));
        self.closest(expected, offset, detect(&window), true)
    }

    /// The plausible detection nearest to the shifted expected line. Grown
    /// windows may legitimately see more than the expected length.
    fn closest(
        &self,
        expected: &LineGeometry,
        offset: f32,
        lines: Vec<DetectedLine>,
        check_length: bool,
    ) -> Option<DetectedLine> {
        let shifted = expected.shifted(offset);
        let length = expected.length();
        lines
            .into_iter()
            .filter(|l| {
                angle_difference(l.angle(), expected.angle()) <= self.angle_tolerance
                    && (!check_length
                        || (l.length() - length).abs() <= self.length_tolerance * length)
            })
            .min_by(|a, b| {
                let da = shifted.signed_distance(a.midpoint()).abs();
                let db = shifted.signed_distance(b.midpoint()).abs();
                da.total_cmp(&db)
            })
    }

    fn residual(&self, expected: &LineGeometry, m: &OffsetMatch) -> f32 {
        expected.shifted(m.offset).signed_distance(m.line.midpoint())
    }

    fn window(&self, line: &LineGeometry) -> SearchWindow {
        SearchWindow::around_line(line, self.window_margin, self.window_margin)
    }
}

#[cfg(test)]
mod tests {
    use diagram_align_kernel::types::geometry::Coord;

    use super::*;

    /// Pretends a horizontal line lies at `y` between `x0` and `x1`; a
    /// window sees the part of it that falls inside.
    fn fake_detector(y: f32, x0: f32, x1: f32) -> impl Fn(&SearchWindow) -> Vec<DetectedLine> {
        move |w: &SearchWindow| {
            let inside = (w.top as f32) <= y && y <= w.bottom as f32;
            let left = x0.max(w.left as f32);
            let right = x1.min(w.right as f32);
            if !inside || right <= left {
                return vec![];
            }
            vec![DetectedLine {
                line: LineGeometry::new(left, y, right, y),
                is_dashed: false,
            }]
        }
    }

    #[test]
    fn finds_line_below() {
        let expected = LineGeometry::new(50.0, 100.0, 250.0, 100.0);
        let found = OrthogonalSearch::default()
            .search(&expected, fake_detector(162.0, 50.0, 250.0))
            .expect("line");
        assert!((found.line.midpoint().y - 162.0).abs() < 0.5);
        assert!((found.offset - 62.0).abs() < 3.0, "{}", found.offset);
    }

    #[test]
    fn prefers_nearer_side() {
        let expected = LineGeometry::new(50.0, 100.0, 250.0, 100.0);
        let above = fake_detector(55.0, 50.0, 250.0);
        let below = fake_detector(190.0, 50.0, 250.0);
        let found = OrthogonalSearch::default()
            .search(&expected, |w: &SearchWindow| {
                let mut lines = above(w);
                lines.extend(below(w));
                lines
            })
            .expect("line");
        assert!((found.line.midpoint().y - 55.0).abs() < 0.5);
        assert!(found.offset < 0.0);
    }

    #[test]
    fn grows_to_full_length() {
        // the true line is longer than expected and shifted along itself
        let expected = LineGeometry::new(100.0, 100.0, 200.0, 100.0);
        let found = OrthogonalSearch::default()
            .search(&expected, fake_detector(140.0, 60.0, 240.0))
            .expect("line");
        assert!((found.line.length() - 180.0).abs() < 1.0, "{}", found.line.line);
        assert_eq!(found.line.midpoint(), Coord::new(150.0, 140.0));
    }

    #[test]
    fn nothing_within_reach() {
        let expected = LineGeometry::new(50.0, 100.0, 250.0, 100.0);
        let found = OrthogonalSearch::default().search(&expected, fake_detector(400.0, 50.0, 250.0));
        assert_eq!(found, None);

        let tilted = |w: &SearchWindow| {
            vec![DetectedLine {
                line: LineGeometry::new(w.left as f32, w.top as f32, w.right as f32, w.bottom as f32),
                is_dashed: false,
            }]
        };
        let vertical = LineGeometry::new(100.0, 50.0, 100.0, 60.0);
        assert!(OrthogonalSearch::default().search(&vertical, tilted).is_none());
    }
}
