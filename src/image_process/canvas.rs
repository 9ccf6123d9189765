use diagram_align_kernel::types::color::Bgr;
use imageproc::{
    image::{imageops, ImageBuffer, Pixel, Rgb, RgbImage},
    rect::Rect,
};

use crate::algorithm::median_color;

/// Channel-wise median of the four corner pixels.
pub fn background_color(image: &RgbImage) -> Bgr {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Bgr::WHITE;
    }
    let corners = [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)];
    median_color(
        corners
            .iter()
            .map(|&(x, y)| Bgr::from_rgb(image.get_pixel(x, y).0)),
    )
    .unwrap_or(Bgr::WHITE)
}

/// Surrounds the image with `pad` pixels of `fill` on every side.
pub fn pad(image: &RgbImage, pad: u32, fill: Bgr) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut padded = RgbImage::from_pixel(w + 2 * pad, h + 2 * pad, Rgb(fill.to_rgb()));
    imageops::replace(&mut padded, image, i64::from(pad), i64::from(pad));
    padded
}

pub fn image_rect<P: Pixel>(image: &ImageBuffer<P, Vec<P::Subpixel>>) -> Option<Rect> {
    let (w, h) = image.dimensions();
    (w > 0 && h > 0).then(|| Rect::at(0, 0).of_size(w, h))
}

/// Copies `rect` out of the image; the rect must lie inside it.
pub fn crop<P>(image: &ImageBuffer<P, Vec<P::Subpixel>>, rect: Rect) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    imageops::crop_imm(
        image,
        rect.left() as u32,
        rect.top() as u32,
        rect.width(),
        rect.height(),
    )
    .to_image()
}

pub fn color_at(image: &RgbImage, x: i32, y: i32) -> Option<Bgr> {
    let (w, h) = image.dimensions();
    if x < 0 || y < 0 || x as u32 >= w || y as u32 >= h {
        return None;
    }
    Some(Bgr::from_rgb(image.get_pixel(x as u32, y as u32).0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_corner_median() {
        let mut image = RgbImage::from_pixel(10, 8, Rgb([250, 250, 250]));
        image.put_pixel(0, 0, Rgb([0, 0, 0]));
        assert_eq!(background_color(&image), Bgr::from_rgb([250, 250, 250]));

        // an even count takes the floored mean of the middle pair
        image.put_pixel(9, 7, Rgb([10, 200, 30]));
        assert_eq!(background_color(&image), Bgr::from_rgb([130, 225, 140]));
    }

    #[test]
    fn pad_and_crop() {
        let mut image = RgbImage::from_pixel(4, 3, Rgb([1, 2, 3]));
        image.put_pixel(0, 0, Rgb([9, 9, 9]));
        let padded = pad(&image, 5, Bgr::WHITE);
        assert_eq!(padded.dimensions(), (14, 13));
        assert_eq!(padded.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(padded.get_pixel(5, 5), &Rgb([9, 9, 9]));

        let cropped = crop(&padded, Rect::at(5, 5).of_size(4, 3));
        assert_eq!(cropped, image);
    }
}
