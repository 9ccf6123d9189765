pub use self::{
    detect_arrowhead::*, detect_lines::*, extract_shapes::*, orthogonal_search::*,
    sample_line::*,
};

mod detect_arrowhead;
mod detect_lines;
mod extract_shapes;
mod orthogonal_search;
mod sample_line;
