use serde::Serialize;

pub use self::{line::*, shape::*, text_locator::*};

mod line;
mod shape;
mod text_locator;

/// Result of one alignment call.
///
/// Both variants carry a fully populated result. `Unchanged` echoes the
/// target because nothing convincing was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "result", rename_all = "lowercase")]
pub enum AlignOutcome<R> {
    Aligned(R),
    Unchanged(R),
}

impl<R> AlignOutcome<R> {
    pub fn is_aligned(&self) -> bool {
        matches!(self, AlignOutcome::Aligned(_))
    }

    pub fn result(&self) -> &R {
        match self {
            AlignOutcome::Aligned(r) | AlignOutcome::Unchanged(r) => r,
        }
    }

    pub fn into_result(self) -> R {
        match self {
            AlignOutcome::Aligned(r) | AlignOutcome::Unchanged(r) => r,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlignConfig {
    pub shape: ShapeAligner,
    pub line: LineAligner,
}
