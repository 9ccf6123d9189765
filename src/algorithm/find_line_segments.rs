use std::{iter, ops::Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    pub vote: u32,
    pub start: i32,
    pub end: i32,
}

impl Segment {
    pub fn range(&self) -> Range<i32> {
        self.start..self.end
    }
}

impl From<Range<i32>> for Segment {
    fn from(r: Range<i32>) -> Self {
        Self {
            vote: (r.end - r.start) as u32,
            start: r.start,
            end: r.end,
        }
    }
}

/// Joins set samples along a scan into segments, bridging gaps up to
/// `max_line_gap` samples long.
#[derive(Debug, Clone, Copy)]
pub struct FindLineSegments {
    pub vote_threshold: u32,
    pub min_line_len: i32,
    pub max_line_gap: i32,
}

impl FindLineSegments {
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn find(&self, seq: impl IntoIterator<Item = bool>) -> impl Iterator<Item = Range<i32>> {
        find_line_segments(
            seq,
            self.vote_threshold,
            self.min_line_len,
            self.max_line_gap,
        )
    }
}

pub fn find_line_segments(
    seq: impl IntoIterator<Item = bool>,
    vote_threshold: u32,
    min_line_len: i32,
    max_line_gap: i32,
) -> impl Iterator<Item = Range<i32>> {
    let it = seq.into_iter();
    let it = continuous_points(it);
    let it = join_segments(it, max_line_gap);
    filter_segments(it, vote_threshold, min_line_len)
}

/// Maximal runs of equal values, in scan order.
pub fn runs(seq: impl IntoIterator<Item = bool>) -> impl Iterator<Item = (bool, Range<i32>)> {
    let mut it = (0..).zip(seq).fuse();
    let mut state: Option<(bool, Range<i32>)> = None;
    iter::from_fn(move || loop {
        match it.next() {
            Some((i, value)) => match &mut state {
                Some((run_value, range)) if *run_value == value => {
                    range.end = i + 1;
                }
                Some(_) => return state.replace((value, i..i + 1)),
                None => state = Some((value, i..i + 1)),
            },
            None => return state.take(),
        }
    })
}

/// Run lengths of a classified scan.
///
/// Runs touching either end of the scan are cut off by the scan window, so
/// unset runs there are not counted as gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub set_runs: Vec<u32>,
    pub gap_runs: Vec<u32>,
    pub transitions: u32,
    pub set_count: u32,
    pub total_count: u32,
}

impl RunStats {
    pub fn measure(seq: impl IntoIterator<Item = bool>) -> Self {
        let runs = runs(seq).collect::<Vec<_>>();
        let mut stats = Self::default();
        for (i, (value, range)) in runs.iter().enumerate() {
            let len = (range.end - range.start) as u32;
            stats.total_count += len;
            if *value {
                stats.set_count += len;
                stats.set_runs.push(len);
            } else if i != 0 && i != runs.len() - 1 {
                stats.gap_runs.push(len);
            }
        }
        stats.transitions = runs.len().saturating_sub(1) as u32;
        stats
    }

    pub fn append(&mut self, other: Self) {
        self.set_runs.extend(other.set_runs);
        self.gap_runs.extend(other.gap_runs);
        self.transitions += other.transitions;
        self.set_count += other.set_count;
        self.total_count += other.total_count;
    }

    pub fn unset_fraction(&self) -> f32 {
        if self.total_count == 0 {
            return 0.0;
        }
        (self.total_count - self.set_count) as f32 / self.total_count as f32
    }
}

fn filter_segments(
    segments: impl IntoIterator<Item = Segment>,
    vote_threshold: u32,
    min_line_len: i32,
) -> impl Iterator<Item = Range<i32>> {
    segments
        .into_iter()
        .filter(move |seg| seg.vote >= vote_threshold && seg.end - seg.start >= min_line_len)
        .map(|seg| seg.range())
}

fn join_segments(
    segments: impl IntoIterator<Item = Segment>,
    max_line_gap: i32,
) -> impl Iterator<Item = Segment> {
    let mut it = segments.into_iter().fuse();
    let mut state: Option<Segment> = None;
    iter::from_fn(move || loop {
        match it.next() {
            Some(seg) => match &mut state {
                Some(prev_seg) if seg.start - prev_seg.end <= max_line_gap => {
                    prev_seg.end = seg.end;
                    prev_seg.vote += seg.vote;
                }
                Some(_) => return state.replace(seg),
                None => state = Some(seg),
            },
            None => return state.take(),
        }
    })
}

fn continuous_points(pts: impl IntoIterator<Item = bool>) -> impl Iterator<Item = Segment> {
    runs(pts)
        .filter(|(value, _)| *value)
        .map(|(_, range)| Segment::from(range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::single_range_in_vec_init)]
    fn test_continuous_points() {
        fn cp(seq: impl IntoIterator<Item = bool>) -> Vec<Segment> {
            continuous_points(seq).collect()
        }

        let seq = [true; 10];
        assert_eq!(cp(seq), [(0..10).into()]);

        let seq = [false; 10];
        assert_eq!(cp(seq), []);

        let seq = [false, true, false, true, false, true, true, true];
        assert_eq!(cp(seq), [(1..2).into(), (3..4).into(), (5..8).into()]);
    }

    #[test]
    fn test_join_segments() {
        fn js(seq: impl IntoIterator<Item = bool>, max_line_gap: i32) -> Vec<Segment> {
            join_segments(continuous_points(seq), max_line_gap).collect()
        }

        let seq = [
            true, false, true, true, false, false, true, false, false, false, true, true, false,
        ];
        assert_eq!(
            js(seq, 0),
            [(0..1).into(), (2..4).into(), (6..7).into(), (10..12).into()]
        );
        assert_eq!(
            js(seq, 2),
            [
                Segment {
                    vote: 4,
                    start: 0,
                    end: 7
                },
                (10..12).into()
            ]
        );
        assert_eq!(
            js(seq, 3),
            [Segment {
                vote: 6,
                start: 0,
                end: 12
            }]
        );
    }

    #[test]
    fn label_gap_is_bridged() {
        // a stroke interrupted by a 30 sample label
        let seq = (0..100).map(|i| !(40..70).contains(&i));
        let found = find_line_segments(seq, 10, 10, 50).collect::<Vec<_>>();
        assert_eq!(found, [0..100]);

        let seq = (0..100).map(|i| !(40..70).contains(&i));
        let found = find_line_segments(seq, 10, 10, 20).collect::<Vec<_>>();
        assert_eq!(found, [0..40, 70..100]);
    }

    #[test]
    fn test_runs() {
        let seq = [false, false, true, true, true, false, true];
        let found = runs(seq).collect::<Vec<_>>();
        assert_eq!(found, [(false, 0..2), (true, 2..5), (false, 5..6), (true, 6..7)]);
        assert_eq!(runs([]).count(), 0);
    }

    #[test]
    fn run_stats_skip_truncated_gaps() {
        // 3 off, then 10 on / 10 off twice, then 4 on
        let seq = (0..47).map(|i| i >= 3 && (i - 3) % 20 < 10);
        let stats = RunStats::measure(seq);
        assert_eq!(stats.set_runs, [10, 10, 4]);
        assert_eq!(stats.gap_runs, [10, 10]);
        assert_eq!(stats.transitions, 5);
        assert_eq!(stats.total_count, 47);
        assert_eq!(stats.set_count, 24);

        let solid = RunStats::measure([true; 20]);
        assert_eq!(solid.transitions, 0);
        assert_eq!(solid.unset_fraction(), 0.0);
    }
}
