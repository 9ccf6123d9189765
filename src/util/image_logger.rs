use std::{
    fmt, mem,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use chrono::Local;
use imageproc::{
    drawing,
    image::{buffer::ConvertBuffer, imageops, Rgb, RgbImage},
    rect::Rect,
};

const SHEET_BACKGROUND: Rgb<u8> = Rgb([64, 64, 64]);
const SHEET_FRAME: Rgb<u8> = Rgb([255, 200, 0]);

/// Collects intermediate images of an alignment for debugging.
///
/// A disabled logger holds nothing and hands every image straight back
/// without converting it. An enabled one arranges the logged images in
/// rows, one per group, and writes them as one PNG contact sheet on [`flush`].
///
/// [`flush`]: ImageLogger::flush
#[derive(Clone, Default)]
pub struct ImageLogger(Option<Arc<ImageLoggerInner>>);

impl fmt::Debug for ImageLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(inner) => f.debug_tuple("ImageLogger").field(&inner.dir).finish(),
            None => f.write_str("ImageLogger(disabled)"),
        }
    }
}

impl ImageLogger {
    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn to_dir(dir: impl Into<PathBuf>) -> Self {
        Self(Some(Arc::new(ImageLoggerInner::new(dir.into()))))
    }

    pub fn log<T>(&self, img: T) -> T
    where
        T: ConvertBuffer<RgbImage>,
    {
        if let Some(inner) = &self.0 {
            inner.push(img.convert());
        }
        img
    }

    pub fn end_group(&self) {
        if let Some(inner) = &self.0 {
            inner.end_group();
        }
    }

    /// Writes the collected images and starts over. Failures are reported
    /// as warnings.
    pub fn flush(&self, title: &str) {
        let Some(inner) = &self.0 else {
            return;
        };
        if let Err(err) = inner.flush(title) {
            tracing::warn!(%err, dir = %inner.dir.display(), "failed to write diagnostic image");
        }
    }
}

struct ImageLoggerInner {
    dir: PathBuf,
    images: Mutex<Vec<Vec<RgbImage>>>,
}

impl ImageLoggerInner {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            images: Mutex::new(vec![vec![]]),
        }
    }

    fn push(&self, img: RgbImage) {
        let mut images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
        match images.last_mut() {
            Some(group) => group.push(img),
            None => images.push(vec![img]),
        }
    }

    fn end_group(&self) {
        let mut images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
        if images.last().is_some_and(|group| !group.is_empty()) {
            images.push(vec![]);
        }
    }

    fn flush(&self, title: &str) -> Result<(), imageproc::image::ImageError> {
        let images = {
            let mut images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
            mem::replace(&mut *images, vec![vec![]])
        };
        if images.iter().all(Vec::is_empty) {
            return Ok(());
        }

        let sheet = contact_sheet(&images, 8);
        std::fs::create_dir_all(&self.dir)?;
        let path = sheet_path(&self.dir, title);
        sheet.save(&path)?;
        tracing::debug!(path = %path.display(), "wrote diagnostic image");
        Ok(())
    }
}

fn sheet_path(dir: &Path, title: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S%.3f");
    let title = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>();
    dir.join(format!("{timestamp}_{title}.png"))
}

/// Lays out one row per logged group with its stages left to right, each
/// image inside a one pixel frame.
fn contact_sheet(rows: &[Vec<RgbImage>], margin: u32) -> RgbImage {
    let (width, height, origins) = place(rows, margin);
    let mut sheet = RgbImage::from_pixel(width, height, SHEET_BACKGROUND);
    for (image, &(x, y)) in rows.iter().flatten().zip(&origins) {
        let frame = Rect::at(x as i32 - 1, y as i32 - 1)
            .of_size(image.width() + 2, image.height() + 2);
        drawing::draw_hollow_rect_mut(&mut sheet, frame, SHEET_FRAME);
        imageops::replace(&mut sheet, image, i64::from(x), i64::from(y));
    }
    sheet
}

/// Sheet size and the top-left corner of every image, in logging order.
fn place(rows: &[Vec<RgbImage>], margin: u32) -> (u32, u32, Vec<(u32, u32)>) {
    let mut origins = vec![];
    let mut width = margin;
    let mut y = margin;
    for row in rows.iter().filter(|row| !row.is_empty()) {
        let mut x = margin;
        let mut row_height = 0;
        for image in row {
            origins.push((x + 1, y + 1));
            x += image.width() + 2 + margin;
            row_height = row_height.max(image.height() + 2);
        }
        width = width.max(x);
        y += row_height + margin;
    }
    (width, y, origins)
}
