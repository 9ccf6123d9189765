#![allow(dead_code)]

use diagram_align::image_process::{render, TemplateStyle};
use diagram_align_kernel::types::{color::Bgr, geometry::ShapeKind};
use imageproc::{
    drawing,
    image::{Rgb, RgbImage},
    point::Point,
    rect::Rect,
};

pub const BLUE: Bgr = Bgr::new(255, 0, 0);

pub fn white_canvas(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
}

/// Draws a template-rendered shape, leaving the canvas visible around it.
pub fn stamp(
    canvas: &mut RgbImage,
    kind: ShapeKind,
    (x, y, w, h): (u32, u32, u32, u32),
    border_width: u32,
    pen: Bgr,
) {
    let style = TemplateStyle {
        fill: Bgr::WHITE,
        border: pen,
        border_width,
    };
    let template = render(kind, w, h, &style);
    for (tx, ty, p) in template.enumerate_pixels() {
        if p.0 != [0, 0, 0] {
            canvas.put_pixel(x + tx, y + ty, *p);
        }
    }
}

pub fn bar(canvas: &mut RgbImage, x: i32, y: i32, w: u32, h: u32, color: Bgr) {
    drawing::draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(w, h), Rgb(color.to_rgb()));
}

/// A filled triangle pointing right with its tip at `(tip_x, y)`.
pub fn arrowhead_right(
    canvas: &mut RgbImage,
    tip_x: i32,
    y: i32,
    height: i32,
    half_base: i32,
    color: Bgr,
) {
    let base_x = tip_x - height;
    drawing::draw_polygon_mut(
        canvas,
        &[
            Point::new(base_x, y - half_base),
            Point::new(tip_x, y),
            Point::new(base_x, y + half_base),
        ],
        Rgb(color.to_rgb()),
    );
}

/// Collects progress callbacks.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<(u32, String)>,
}

impl diagram_align::util::Progress for Recorder {
    fn progress(&mut self, iteration: u32, message: &str) {
        self.events.push((iteration, message.to_owned()));
    }
}

impl Recorder {
    /// Iterations count up from one without gaps.
    pub fn is_in_order(&self) -> bool {
        self.events
            .iter()
            .enumerate()
            .all(|(i, (iteration, _))| *iteration == i as u32 + 1)
    }
}
