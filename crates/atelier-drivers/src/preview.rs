//! Best-effort thumbnail generation.
//!
//! Previews are a display concern: callers ignore failures and keep the
//! previous (or no) preview.

use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;

use crate::errors::DriverError;

/// Decode the file, downscale to at most `max_width`, and return a
/// `data:image/png;base64,...` URL.
pub fn image_preview(path: &Path, max_width: u32) -> Result<String, DriverError> {
    let img = image::open(path)?;
    let thumb = if img.width() > max_width {
        img.thumbnail(max_width, u32::MAX)
    } else {
        img
    };

    let mut buf = Vec::new();
    thumb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&buf)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_preview_is_png_data_url() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("in.png");
        RgbImage::from_pixel(64, 64, Rgb([10, 20, 30])).save(&path).unwrap();

        let url = image_preview(&path, 32).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let bytes = STANDARD.decode(&url["data:image/png;base64,".len()..]).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert!(thumb.width() <= 32);
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("in.png");
        RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])).save(&path).unwrap();

        let url = image_preview(&path, 520).unwrap();
        let bytes = STANDARD.decode(&url["data:image/png;base64,".len()..]).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (8, 8));
    }

    #[test]
    fn test_non_image_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("not.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(image_preview(&path, 32).is_err());
    }
}
