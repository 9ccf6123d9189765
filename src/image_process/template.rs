use diagram_align_kernel::types::{color::Bgr, geometry::ShapeKind};
use imageproc::{
    drawing,
    image::{GrayImage, Luma, Rgb, RgbImage},
    rect::Rect,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateStyle {
    pub fill: Bgr,
    pub border: Bgr,
    pub border_width: u32,
}

/// Rasterizes a shape filling a `width x height` box on black.
///
/// The border is the band between the outer outline and the same outline
/// inset by the border width.
pub fn render(kind: ShapeKind, width: u32, height: u32, style: &TemplateStyle) -> RgbImage {
    render_over(kind, width, height, style, Bgr::BLACK)
}

/// Like [`render`], with everything outside the outline painted `background`.
#[tracing::instrument(level = "trace", skip_all, fields(kind = %kind, width = width, height = height))]
pub fn render_over(
    kind: ShapeKind,
    width: u32,
    height: u32,
    style: &TemplateStyle,
    background: Bgr,
) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, Rgb(background.to_rgb()));
    if width == 0 || height == 0 {
        return image;
    }

    let (w, h) = (width as i32, height as i32);
    let bw = style.border_width as i32;
    let mut outer = GrayImage::new(width, height);
    let mut inner = GrayImage::new(width, height);
    match kind {
        ShapeKind::Rect => {
            fill_box(&mut outer, 0, 0, w, h);
            fill_box(&mut inner, bw, bw, w - 2 * bw, h - 2 * bw);
        }
        ShapeKind::RoundedRect { radius } => {
            let r = clamp_radius(radius, w, h);
            fill_rounded_box(&mut outer, 0, 0, w, h, r);
            fill_rounded_box(&mut inner, bw, bw, w - 2 * bw, h - 2 * bw, (r - bw).max(0));
        }
        ShapeKind::Ellipse => {
            let center = (w / 2, h / 2);
            let (ax, ay) = ((w - 1) / 2, (h - 1) / 2);
            drawing::draw_filled_ellipse_mut(&mut outer, center, ax, ay, Luma([255]));
            if ax - bw >= 0 && ay - bw >= 0 {
                drawing::draw_filled_ellipse_mut(&mut inner, center, ax - bw, ay - bw, Luma([255]));
            }
        }
    }

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if inner.get_pixel(x, y).0[0] > 0 {
            *pixel = Rgb(style.fill.to_rgb());
        } else if outer.get_pixel(x, y).0[0] > 0 {
            *pixel = Rgb(style.border.to_rgb());
        }
    }
    image
}

/// Largest usable corner radius for a `w x h` box.
pub fn clamp_radius(radius: f32, w: i32, h: i32) -> i32 {
    (radius.round() as i32).clamp(0, w.min(h) / 2)
}

fn fill_box(mask: &mut GrayImage, x: i32, y: i32, w: i32, h: i32) {
    if w > 0 && h > 0 {
        drawing::draw_filled_rect_mut(mask, Rect::at(x, y).of_size(w as u32, h as u32), Luma([255]));
    }
}

/// Two overlapping boxes plus a disc in each corner.
fn fill_rounded_box(mask: &mut GrayImage, x: i32, y: i32, w: i32, h: i32, r: i32) {
    if w <= 0 || h <= 0 {
        return;
    }
    let r = r.clamp(0, w.min(h) / 2);
    if r == 0 {
        fill_box(mask, x, y, w, h);
        return;
    }
    fill_box(mask, x + r, y, w - 2 * r, h);
    fill_box(mask, x, y + r, w, h - 2 * r);
    let (x0, y0) = (x + r, y + r);
    let (x1, y1) = (x + w - 1 - r, y + h - 1 - r);
    for center in [(x0, y0), (x1, y0), (x0, y1), (x1, y1)] {
        drawing::draw_filled_circle_mut(mask, center, r, Luma([255]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE: Bgr = Bgr::new(255, 0, 0);

    fn style(border_width: u32) -> TemplateStyle {
        TemplateStyle {
            fill: Bgr::WHITE,
            border: BLUE,
            border_width,
        }
    }

    fn count(image: &RgbImage, color: Bgr) -> usize {
        image.pixels().filter(|p| p.0 == color.to_rgb()).count()
    }

    #[test]
    fn rect_border_band() {
        let image = render(ShapeKind::Rect, 20, 10, &style(2));
        assert_eq!(image.dimensions(), (20, 10));
        assert_eq!(count(&image, Bgr::WHITE), 16 * 6);
        assert_eq!(count(&image, BLUE), 20 * 10 - 16 * 6);
        assert_eq!(image.get_pixel(1, 1).0, BLUE.to_rgb());
        assert_eq!(image.get_pixel(2, 2).0, Bgr::WHITE.to_rgb());
    }

    #[test]
    fn thick_border_fills_everything() {
        let image = render(ShapeKind::Rect, 6, 6, &style(3));
        assert_eq!(count(&image, BLUE), 36);
    }

    #[test]
    fn rounded_corners_are_background() {
        let image = render(ShapeKind::RoundedRect { radius: 8.0 }, 40, 30, &style(2));
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(39, 29).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(20, 0).0, BLUE.to_rgb());
        assert_eq!(image.get_pixel(20, 15).0, Bgr::WHITE.to_rgb());

        // radius beyond half the short side is clamped instead of overflowing
        let huge = render(ShapeKind::RoundedRect { radius: 100.0 }, 40, 30, &style(2));
        assert_eq!(huge.get_pixel(20, 15).0, Bgr::WHITE.to_rgb());
        assert_eq!(huge.get_pixel(20, 0).0, BLUE.to_rgb());
    }

    #[test]
    fn ellipse_stays_inside_grid() {
        let image = render(ShapeKind::Ellipse, 41, 21, &style(1));
        assert_eq!(image.get_pixel(0, 10).0, BLUE.to_rgb());
        assert_eq!(image.get_pixel(40, 10).0, BLUE.to_rgb());
        assert_eq!(image.get_pixel(20, 0).0, BLUE.to_rgb());
        assert_eq!(image.get_pixel(20, 20).0, BLUE.to_rgb());
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(20, 10).0, Bgr::WHITE.to_rgb());
    }

    #[test]
    fn background_fills_outside() {
        let gray = Bgr::new(200, 200, 200);
        let image = render_over(ShapeKind::Ellipse, 41, 21, &style(1), gray);
        assert_eq!(image.get_pixel(0, 0).0, gray.to_rgb());
        assert_eq!(image.get_pixel(20, 0).0, BLUE.to_rgb());
    }
}
