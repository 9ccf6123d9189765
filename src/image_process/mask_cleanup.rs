use imageproc::{
    distance_transform::Norm,
    image::{GrayImage, Luma},
    morphology,
    region_labelling::{self, Connectivity},
};

/// Closes small gaps in a color mask, then drops speckles.
///
/// Speckles are removed by component size rather than by an opening, which
/// would also erase strokes one or two pixels wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskCleanup {
    pub close_radius: u8,
    pub min_component_area: u32,
}

impl Default for MaskCleanup {
    fn default() -> Self {
        Self {
            close_radius: 1,
            min_component_area: 4,
        }
    }
}

impl MaskCleanup {
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn clean(&self, mask: &GrayImage) -> GrayImage {
        let closed = if self.close_radius > 0 {
            morphology::close(mask, Norm::LInf, self.close_radius)
        } else {
            mask.clone()
        };
        remove_small_components(&closed, self.min_component_area)
    }
}

pub fn remove_small_components(mask: &GrayImage, min_area: u32) -> GrayImage {
    if min_area <= 1 {
        return mask.clone();
    }
    let labels = region_labelling::connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let mut sizes: Vec<u32> = vec![];
    for Luma([label]) in labels.pixels() {
        let label = *label as usize;
        if label == 0 {
            continue;
        }
        if sizes.len() <= label {
            sizes.resize(label + 1, 0);
        }
        sizes[label] += 1;
    }
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let Luma([label]) = *labels.get_pixel(x, y);
        let keep = label != 0 && sizes[label as usize] >= min_area;
        Luma([if keep { 255 } else { 0 }])
    })
}
