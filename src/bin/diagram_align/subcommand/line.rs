use color_eyre::eyre::{self, bail};
use diagram_align::worker::{AlignJob, AlignRequest, AlignResult};
use diagram_align_kernel::types::{alignment::LineTarget, geometry::LineGeometry};

use super::CommonArgs;

/// Snap a line onto the image and read its arrowheads and dash pattern
#[derive(clap::Parser, Debug)]
pub struct Args {
    #[clap(flatten)]
    common: CommonArgs,
    #[clap(long, allow_negative_numbers = true)]
    x1: f32,
    #[clap(long, allow_negative_numbers = true)]
    y1: f32,
    #[clap(long, allow_negative_numbers = true)]
    x2: f32,
    #[clap(long, allow_negative_numbers = true)]
    y2: f32,
    /// Label text drawn on the line
    #[clap(long)]
    label: Option<String>,
    /// Note text attached to the line
    #[clap(long)]
    note: Option<String>,
    /// Longest gap in pixels bridged inside one detected line
    #[clap(long)]
    max_line_gap: Option<i32>,
    /// How far sideways to look when the line is not where expected
    #[clap(long)]
    max_offset: Option<f32>,
}

impl Args {
    #[tracing::instrument(name = "line", skip_all)]
    pub(crate) fn run(&self) -> eyre::Result<()> {
        let target = LineTarget {
            line: LineGeometry::new(self.x1, self.y1, self.x2, self.y2),
            pen_color: self.common.pen_color(),
            pen_width: self.common.pen_width,
            note_text: self.note.clone(),
            label_text: self.label.clone(),
        };

        let mut job = AlignJob::new(
            self.common.source()?,
            AlignRequest::Line(target),
        );
        if let Some(gap) = self.max_line_gap {
            job.config.line.detector.hough.find_line_segments.max_line_gap = gap;
        }
        if let Some(offset) = self.max_offset {
            job.config.line.orthogonal.max_offset = offset;
        }

        let AlignResult::Line(outcome) = super::run_job(&self.common, job)? else {
            bail!("expected a line result");
        };
        super::print_result(outcome.is_aligned(), outcome.result())
    }
}
