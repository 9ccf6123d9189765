use std::fmt;

/// Receives milestone messages while an alignment runs.
///
/// Calls arrive synchronously, in order, on the aligning thread.
/// Implementations must not panic; the engine never looks at the outcome.
pub trait Progress {
    fn progress(&mut self, iteration: u32, message: &str);
}

impl<F> Progress for F
where
    F: FnMut(u32, &str),
{
    fn progress(&mut self, iteration: u32, message: &str) {
        self(iteration, message)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn progress(&mut self, _iteration: u32, _message: &str) {}
}

/// Numbers milestones for one alignment and forwards them.
pub struct Reporter<'a> {
    sink: &'a mut dyn Progress,
    iteration: u32,
}

impl fmt::Debug for Reporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}

impl<'a> Reporter<'a> {
    pub fn new(sink: &'a mut dyn Progress) -> Self {
        Self { sink, iteration: 0 }
    }

    pub fn report(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        self.iteration += 1;
        tracing::debug!(iteration = self.iteration, message);
        self.sink.progress(self.iteration, message);
    }
}
