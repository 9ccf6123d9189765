use std::path::Path;

use image::{ImageResult, RgbImage};

/// Decodes an image file into an RGB raster.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn load_image(path: &Path) -> ImageResult<RgbImage> {
    let image = image::open(path)?.to_rgb8();
    tracing::debug!(width = image.width(), height = image.height(), "decoded image");
    Ok(image)
}

/// Decodes an in-memory encoded image into an RGB raster.
pub fn decode_image(bytes: &[u8]) -> ImageResult<RgbImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageError, ImageFormat, Rgb};

    use super::*;

    #[test]
    fn decodes_png_bytes() {
        let mut image = RgbImage::from_pixel(4, 3, Rgb([255, 255, 255]));
        image.put_pixel(1, 2, Rgb([0, 0, 255]));
        let mut bytes = Cursor::new(vec![]);
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();

        let decoded = decode_image(bytes.get_ref()).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn garbage_is_not_an_io_error() {
        let err = decode_image(b"not an image").unwrap_err();
        assert!(!matches!(err, ImageError::IoError(_)), "{err}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_image(Path::new("no/such/diagram.png")).unwrap_err();
        assert!(matches!(err, ImageError::IoError(_)), "{err}");
    }
}
