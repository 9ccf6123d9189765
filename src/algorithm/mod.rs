pub use self::{find_line_segments::*, median::*, polygon::*, similarity::*};

mod find_line_segments;
mod median;
mod polygon;
mod similarity;
