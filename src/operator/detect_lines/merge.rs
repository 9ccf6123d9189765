use diagram_align_kernel::types::geometry::{angle_difference, Coord, LineGeometry};

use super::DetectedLine;

/// Collapses duplicate detections and joins collinear pieces.
#[derive(Debug, Clone, Copy)]
pub struct MergeSegments {
    pub duplicate_distance: f32,
    pub duplicate_angle: f32,
    pub collinear_angle: f32,
    pub collinear_distance: f32,
}

impl Default for MergeSegments {
    fn default() -> Self {
        Self {
            duplicate_distance: 15.0,
            duplicate_angle: 10.0,
            collinear_angle: 15.0,
            collinear_distance: 80.0,
        }
    }
}

impl MergeSegments {
    /// Drops segments whose midpoint and angle nearly equal a longer one.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn dedup(&self, mut segments: Vec<LineGeometry>) -> Vec<LineGeometry> {
        sort_longest_first(&mut segments);
        let mut kept: Vec<LineGeometry> = vec![];
        for seg in segments {
            let duplicate = kept.iter().any(|k| {
                k.midpoint().distance(seg.midpoint()) < self.duplicate_distance
                    && angle_difference(k.angle(), seg.angle()) < self.duplicate_angle
            });
            if !duplicate {
                kept.push(seg);
            }
        }
        kept
    }

    /// Groups segments lying on a common line, each group seeded by its
    /// longest member. A group spans its two mutually farthest endpoints
    /// and is dashed when it has more than one member.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn merge(&self, mut segments: Vec<LineGeometry>) -> Vec<DetectedLine> {
        sort_longest_first(&mut segments);
        let mut grouped = vec![false; segments.len()];
        let mut merged = vec![];
        for i in 0..segments.len() {
            if grouped[i] {
                continue;
            }
            grouped[i] = true;
            let seed = segments[i];
            let mut group = vec![seed];
            for j in i + 1..segments.len() {
                if grouped[j] {
                    continue;
                }
                let seg = segments[j];
                if angle_difference(seed.angle(), seg.angle()) <= self.collinear_angle
                    && seed.signed_distance(seg.midpoint()).abs() <= self.collinear_distance
                {
                    grouped[j] = true;
                    group.push(seg);
                }
            }

            let endpoints = group
                .iter()
                .flat_map(|s| [s.start(), s.end()])
                .collect::<Vec<_>>();
            let (a, b) = farthest_pair(&endpoints).unwrap_or((seed.start(), seed.end()));
            merged.push(DetectedLine {
                line: LineGeometry::from_coords(a, b),
                is_dashed: group.len() > 1,
            });
        }
        merged
    }
}

fn sort_longest_first(segments: &mut [LineGeometry]) {
    segments.sort_by(|a, b| b.length().total_cmp(&a.length()));
}

fn farthest_pair(points: &[Coord]) -> Option<(Coord, Coord)> {
    let mut best: Option<(f32, Coord, Coord)> = None;
    for (i, &p) in points.iter().enumerate() {
        for &q in &points[i + 1..] {
            let d = p.distance(q);
            match best {
                Some((bd, _, _)) if d <= bd => {}
                _ => best = Some((d, p, q)),
            }
        }
    }
    best.map(|(_, p, q)| (p, q))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collinear_pieces_merge_into_one_dashed_line() {
        let pieces = vec![
            LineGeometry::new(100.0, 50.0, 140.0, 50.0),
            LineGeometry::new(150.0, 50.0, 190.0, 50.5),
            LineGeometry::new(200.0, 50.5, 240.0, 50.0),
        ];
        let merged = MergeSegments::default().merge(pieces);
        assert_eq!(merged.len(), 1);
        let line = merged[0];
        assert!(line.is_dashed);
        let xs = [line.line.x1, line.line.x2];
        assert!(xs.contains(&100.0) && xs.contains(&240.0), "{}", line.line);
    }

    #[test]
    fn crossing_lines_stay_apart() {
        let pieces = vec![
            LineGeometry::new(0.0, 50.0, 100.0, 50.0),
            LineGeometry::new(50.0, 0.0, 50.0, 100.0),
        ];
        let merged = MergeSegments::default().merge(pieces);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|l| !l.is_dashed));
    }

    #[test]
    fn dedup_keeps_longer() {
        let segments = vec![
            LineGeometry::new(10.0, 10.0, 90.0, 10.0),
            LineGeometry::new(5.0, 11.0, 100.0, 11.0),
            LineGeometry::new(10.0, 40.0, 90.0, 40.0),
        ];
        let kept = MergeSegments::default().dedup(segments);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0], LineGeometry::new(5.0, 11.0, 100.0, 11.0));
    }
}
