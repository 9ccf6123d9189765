use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread::{self, JoinHandle},
};

use color_eyre::eyre::{self, eyre, WrapErr as _};
use diagram_align_kernel::types::alignment::{
    LineAlignment, LineTarget, ShapeAlignment, ShapeTarget,
};
use image::{ImageError, RgbImage};
use tracing::Span;

use crate::{
    aligner::{AlignConfig, AlignOutcome, NoTextLocator, TextLocator},
    image_source::{decode_image, load_image},
    util::{ImageLogger, Progress},
};

#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    /// Encoded image file contents, such as PNG bytes read from a pipe.
    Encoded(Arc<[u8]>),
    Raster(Arc<RgbImage>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlignRequest {
    Shape(ShapeTarget),
    Line(LineTarget),
}

impl AlignRequest {
    /// The target echoed back as a result.
    pub fn unchanged(&self) -> AlignResult {
        match self {
            AlignRequest::Shape(target) => {
                AlignResult::Shape(AlignOutcome::Unchanged(ShapeAlignment::unchanged(target)))
            }
            AlignRequest::Line(target) => {
                AlignResult::Line(AlignOutcome::Unchanged(LineAlignment::unchanged(target)))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlignResult {
    Shape(AlignOutcome<ShapeAlignment>),
    Line(AlignOutcome<LineAlignment>),
}

impl AlignResult {
    pub fn is_aligned(&self) -> bool {
        match self {
            AlignResult::Shape(outcome) => outcome.is_aligned(),
            AlignResult::Line(outcome) => outcome.is_aligned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Progress { iteration: u32, message: String },
    Finished(AlignResult),
    /// A human readable description of what went wrong.
    Failed(String),
}

/// Everything one alignment needs.
#[derive(Debug, Clone)]
pub struct AlignJob {
    pub source: ImageSource,
    pub request: AlignRequest,
    pub config: AlignConfig,
    pub text_locator: Arc<dyn TextLocator>,
    pub logger: ImageLogger,
}

impl AlignJob {
    pub fn new(source: ImageSource, request: AlignRequest) -> Self {
        Self {
            source,
            request,
            config: AlignConfig::default(),
            text_locator: Arc::new(NoTextLocator),
            logger: ImageLogger::disabled(),
        }
    }

    /// Runs the alignment on the calling thread.
    ///
    /// Image content that cannot be decoded leaves the target unchanged;
    /// failing to read the file is an error.
    pub fn run(&self, progress: &mut dyn Progress) -> eyre::Result<AlignResult> {
        let image = match &self.source {
            ImageSource::Raster(image) => Arc::clone(image),
            ImageSource::Path(path) => match load_image(path) {
                Ok(image) => Arc::new(image),
                Err(ImageError::IoError(err)) => {
                    return Err(err)
                        .wrap_err_with(|| format!("failed to read `{}`", path.display()));
                }
                Err(err) => {
                    tracing::warn!(%err, path = %path.display(), "cannot decode image, keeping the target");
                    return Ok(self.request.unchanged());
                }
            },
            ImageSource::Encoded(bytes) => match decode_image(bytes) {
                Ok(image) => Arc::new(image),
                Err(err) => {
                    tracing::warn!(%err, len = bytes.len(), "cannot decode image, keeping the target");
                    return Ok(self.request.unchanged());
                }
            },
        };

        let result = match &self.request {
            AlignRequest::Shape(target) => {
                AlignResult::Shape(self.config.shape.align(&image, target, progress, &self.logger))
            }
            AlignRequest::Line(target) => AlignResult::Line(self.config.line.align(
                &image,
                target,
                &*self.text_locator,
                progress,
                &self.logger,
            )),
        };
        Ok(result)
    }

    /// Runs the alignment on its own thread.
    pub fn spawn(self) -> eyre::Result<AlignTask> {
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let root_span = Span::current();

        let handle = thread::Builder::new().name("align".into()).spawn({
            let cancelled = Arc::clone(&cancelled);
            move || {
                let _span = root_span.enter();
                let send = |event: TaskEvent| {
                    if !cancelled.load(Ordering::Relaxed) {
                        // the receiver may be gone already
                        let _ = tx.send(event);
                    }
                };
                let mut progress = |iteration: u32, message: &str| {
                    send(TaskEvent::Progress {
                        iteration,
                        message: message.to_owned(),
                    })
                };

                let event = match panic::catch_unwind(AssertUnwindSafe(|| self.run(&mut progress)))
                {
                    Ok(Ok(result)) => TaskEvent::Finished(result),
                    Ok(Err(report)) => {
                        tracing::error!("{report:?}");
                        TaskEvent::Failed(format!("{report:#}"))
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(panic = %message, "alignment panicked");
                        TaskEvent::Failed(format!("alignment panicked: {message}"))
                    }
                };
                send(event);
            }
        })?;

        Ok(AlignTask {
            events: rx,
            cancelled,
            handle: Some(handle),
        })
    }
}

/// A running alignment.
///
/// Emits any number of [`TaskEvent::Progress`] events followed by exactly one
/// [`TaskEvent::Finished`] or [`TaskEvent::Failed`]. Cancelling does not stop
/// the search; the task just stops reporting and its result is dropped.
#[derive(Debug)]
pub struct AlignTask {
    events: mpsc::Receiver<TaskEvent>,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AlignTask {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Blocks for the next event; `None` once the task is over.
    pub fn next_event(&self) -> Option<TaskEvent> {
        self.events.recv().ok()
    }

    /// Waits for the outcome, handing progress to `on_progress`.
    pub fn wait_with(
        mut self,
        mut on_progress: impl FnMut(u32, &str),
    ) -> eyre::Result<AlignResult> {
        let mut outcome = Err(eyre!("alignment was cancelled"));
        while let Some(event) = self.next_event() {
            match event {
                TaskEvent::Progress { iteration, message } => on_progress(iteration, &message),
                TaskEvent::Finished(result) => {
                    outcome = Ok(result);
                    break;
                }
                TaskEvent::Failed(message) => {
                    outcome = Err(eyre!(message));
                    break;
                }
            }
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("alignment thread panicked");
            }
        }
        outcome
    }

    pub fn wait(self) -> eyre::Result<AlignResult> {
        self.wait_with(|_, _| {})
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
