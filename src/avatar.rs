//! Avatar image processing: uploaded files are decoded, resized to a fixed
//! square, and re-encoded as PNG before they are stored.

use std::io::Cursor;

use image::imageops::FilterType;
use image::ImageFormat;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

/// Maximum accepted upload size, in bytes.
pub const MAX_AVATAR_BYTES: usize = 1_000_000;

/// Stored avatars are exactly this many pixels on each side.
pub const AVATAR_SIZE: u32 = 250;

lazy_static! {
    // Accepted upload filename extensions
    static ref AVATAR_FILENAME_REGEX: Regex = Regex::new(r"(?i)\.(jpg|jpeg|png)$").unwrap();
}

/// Whether an uploaded filename carries one of the accepted extensions.
pub fn is_supported_filename(filename: &str) -> bool {
    AVATAR_FILENAME_REGEX.is_match(filename)
}

/// Decodes uploaded image bytes, resizes to [`AVATAR_SIZE`]², and re-encodes
/// as PNG. Any decode failure is a client error: the upload was not a usable
/// image.
pub fn process(data: &[u8]) -> Result<Vec<u8>, AppError> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| AppError::BadRequest(format!("Unable to process image: {}", e)))?;

    let resized = decoded.resize_exact(AVATAR_SIZE, AVATAR_SIZE, FilterType::Lanczos3);

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AppError::InternalServerError(format!("Failed to encode avatar: {}", e)))?;

    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_filename_filter() {
        assert!(is_supported_filename("me.jpg"));
        assert!(is_supported_filename("me.jpeg"));
        assert!(is_supported_filename("photo.PNG"));
        assert!(is_supported_filename("archive.tar.png"));

        assert!(!is_supported_filename("me.gif"));
        assert!(!is_supported_filename("me.png.pdf"));
        assert!(!is_supported_filename("png"));
    }

    #[test]
    fn test_process_resizes_and_reencodes() {
        let input = sample_png(10, 20);
        let output = process(&input).unwrap();

        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.width(), AVATAR_SIZE);
        assert_eq!(decoded.height(), AVATAR_SIZE);
    }

    #[test]
    fn test_process_rejects_non_image_data() {
        match process(b"definitely not an image") {
            Err(AppError::BadRequest(_)) => {}
            other => panic!("Expected BadRequest, got {:?}", other.map(|v| v.len())),
        }
    }
}
