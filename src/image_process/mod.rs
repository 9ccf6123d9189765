pub use self::{canvas::*, color_mask::*, contour::*, mask_cleanup::*, template::*};

mod canvas;
mod color_mask;
mod contour;
mod mask_cleanup;
mod template;
