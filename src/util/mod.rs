pub use self::{image_logger::*, progress::*};

mod image_logger;
mod progress;
