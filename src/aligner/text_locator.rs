use std::fmt;

use diagram_align_kernel::types::geometry::Coord;
use imageproc::image::RgbImage;

/// Finds where a piece of text is rendered in an image.
///
/// Line alignment uses it to move its search center onto the line's
/// label or note before looking for the line.
pub trait TextLocator: fmt::Debug + Send + Sync {
    /// Center of `text` in image coordinates, if it can be found.
    fn locate(&self, image: &RgbImage, text: &str) -> Option<Coord>;
}

/// Never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTextLocator;

impl TextLocator for NoTextLocator {
    fn locate(&self, _image: &RgbImage, _text: &str) -> Option<Coord> {
        None
    }
}
