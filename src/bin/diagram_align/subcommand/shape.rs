use color_eyre::eyre::{self, bail};
use diagram_align::worker::{AlignJob, AlignRequest, AlignResult};
use diagram_align_kernel::types::{
    alignment::ShapeTarget,
    geometry::{Bounds, ClosedShape, ShapeKind},
};

use super::CommonArgs;

/// Snap a rectangle, rounded rectangle or ellipse onto the image
#[derive(clap::Parser, Debug)]
pub struct Args {
    #[clap(flatten)]
    common: CommonArgs,
    /// Shape kind: rect, roundedrect or ellipse
    #[clap(long, default_value = "rect")]
    kind: ShapeKind,
    #[clap(long, allow_negative_numbers = true)]
    x: f32,
    #[clap(long, allow_negative_numbers = true)]
    y: f32,
    #[clap(long)]
    width: f32,
    #[clap(long)]
    height: f32,
    /// Corner radius of a rounded rectangle
    #[clap(long, default_value = "0")]
    radius: f32,
    /// Weight of the size difference when choosing among shapes
    #[clap(long)]
    size_weight: Option<f32>,
}

impl Args {
    #[tracing::instrument(name = "shape", skip_all)]
    pub(crate) fn run(&self) -> eyre::Result<()> {
        let kind = match self.kind {
            ShapeKind::RoundedRect { .. } => ShapeKind::RoundedRect {
                radius: self.radius,
            },
            kind => kind,
        };
        let target = ShapeTarget {
            shape: ClosedShape {
                bounds: Bounds::new(self.x, self.y, self.width, self.height),
                kind,
            },
            pen_color: self.common.pen_color(),
            pen_width: self.common.pen_width,
        };

        let mut job = AlignJob::new(
            self.common.source()?,
            AlignRequest::Shape(target),
        );
        if let Some(weight) = self.size_weight {
            job.config.shape.size_weight = weight;
        }

        let AlignResult::Shape(outcome) = super::run_job(&self.common, job)? else {
            bail!("expected a shape result");
        };
        super::print_result(outcome.is_aligned(), outcome.result())
    }
}
