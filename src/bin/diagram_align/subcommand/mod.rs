use std::{
    io::{self, Read as _},
    path::PathBuf,
    sync::Arc,
};

use color_eyre::eyre::{self, WrapErr as _};
use diagram_align::{
    util::ImageLogger,
    worker::{AlignJob, AlignResult, ImageSource},
};
use diagram_align_kernel::types::color::Bgr;
use serde::Serialize;
use tracing::Span;

use crate::tui::Spinner;

mod line;
mod shape;

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Shape(shape::Args),
    Line(line::Args),
}

impl Subcommand {
    pub fn run(&self) -> eyre::Result<()> {
        match self {
            Subcommand::Shape(args) => args.run()?,
            Subcommand::Line(args) => args.run()?,
        }

        Ok(())
    }
}

/// Options shared by every alignment subcommand
#[derive(clap::Parser, Debug)]
pub struct CommonArgs {
    /// Image to align against, `-` to read it from stdin
    image: PathBuf,
    /// Pen color as `#RRGGBB`
    #[clap(long, default_value = "#000000")]
    pen_color: String,
    /// Pen width in pixels
    #[clap(long, default_value = "1")]
    pen_width: u32,
    /// Write intermediate images into this directory
    #[clap(long)]
    debug_dir: Option<PathBuf>,
}

impl CommonArgs {
    pub fn source(&self) -> eyre::Result<ImageSource> {
        if self.image.as_os_str() != "-" {
            return Ok(ImageSource::Path(self.image.clone()));
        }
        let mut bytes = vec![];
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .wrap_err("failed to read the image from stdin")?;
        Ok(ImageSource::Encoded(Arc::from(bytes)))
    }

    pub fn pen_color(&self) -> Bgr {
        Bgr::from_hex(&self.pen_color)
    }

    fn logger(&self) -> ImageLogger {
        match &self.debug_dir {
            Some(dir) => ImageLogger::to_dir(dir),
            None => ImageLogger::disabled(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Output<'a, R> {
    aligned: bool,
    #[serde(flatten)]
    result: &'a R,
}

/// Runs the job on a worker thread, showing its progress on a spinner.
fn run_job(common: &CommonArgs, mut job: AlignJob) -> eyre::Result<AlignResult> {
    job.logger = common.logger();
    let spinner = Spinner::new(Span::current());
    job.spawn()?
        .wait_with(|iteration, message| spinner.set_message(iteration, message))
}

fn print_result<R: Serialize>(aligned: bool, result: &R) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(&Output { aligned, result })?;
    println!("{json}");
    tracing::info!(aligned, "done");
    Ok(())
}
