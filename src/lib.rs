pub mod algorithm;
pub mod aligner;
pub mod geometry;
pub mod image_process;
pub mod image_source;
pub mod operator;
pub mod util;
pub mod worker;
