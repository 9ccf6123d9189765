pub mod alignment;
pub mod color;
pub mod geometry;
