//! Cropping rendered page bitmaps into paste payloads

use crate::error::PayloadError;
use crate::geometry::NormalizedRect;
use crate::payload::{ImageFormat, ImagePayload};
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;

/// Crop `rect` out of a rendered page and encode it as a PNG data URL.
///
/// Edges are rounded to whole pixels and kept inside the bitmap; the crop is
/// never smaller than 1x1.
pub fn crop_page_region(bitmap: &DynamicImage, rect: &NormalizedRect) -> Result<String, PayloadError> {
    let (width, height) = bitmap.dimensions();
    if width == 0 || height == 0 {
        return Err(PayloadError::Encode("source bitmap is empty".to_string()));
    }
    if !rect.is_finite() {
        return Err(PayloadError::Encode("crop rectangle is not finite".to_string()));
    }

    let (x0, x1) = pixel_span(rect.left, rect.right(), width);
    let (y0, y1) = pixel_span(rect.top, rect.bottom(), height);

    let cropped = bitmap.crop_imm(x0, y0, x1 - x0, y1 - y0);
    let mut png = Cursor::new(Vec::new());
    cropped
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| PayloadError::Encode(e.to_string()))?;

    Ok(ImagePayload::from_bytes(ImageFormat::Png, png.into_inner()).to_data_url())
}

/// `[start, end)` in pixels, at least one pixel wide.
fn pixel_span(from: f64, to: f64, extent: u32) -> (u32, u32) {
    let max = extent as f64;
    let start = (from.min(to) * max).round().clamp(0.0, max - 1.0) as u32;
    let end = (from.max(to) * max).round().clamp(start as f64 + 1.0, max) as u32;
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn quadrants() -> DynamicImage {
        let mut img = RgbaImage::from_pixel(100, 50, Rgba([255, 0, 0, 255]));
        for x in 50..100 {
            for y in 0..50 {
                img.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    fn decode(data_url: &str) -> DynamicImage {
        let payload = ImagePayload::parse(data_url).unwrap();
        assert_eq!(payload.format, ImageFormat::Png);
        image::load_from_memory(&payload.bytes).unwrap()
    }

    #[test]
    fn test_crop_right_half() {
        let url = crop_page_region(&quadrants(), &NormalizedRect::new(0.5, 0.0, 0.5, 1.0)).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let cropped = decode(&url);
        assert_eq!(cropped.dimensions(), (50, 50));
        assert_eq!(cropped.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
        assert_eq!(cropped.get_pixel(49, 49), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_crop_rounds_to_pixels() {
        let cropped = decode(
            &crop_page_region(&quadrants(), &NormalizedRect::new(0.104, 0.0, 0.2, 0.5)).unwrap(),
        );
        assert_eq!(cropped.dimensions(), (20, 25));
    }

    #[test]
    fn test_degenerate_crop_is_one_pixel() {
        let cropped =
            decode(&crop_page_region(&quadrants(), &NormalizedRect::new(1.0, 1.0, 0.0, 0.0)).unwrap());
        assert_eq!(cropped.dimensions(), (1, 1));
    }

    #[test]
    fn test_crop_clamped_to_bitmap() {
        let cropped = decode(
            &crop_page_region(&quadrants(), &NormalizedRect::new(-0.5, 0.5, 2.0, 2.0)).unwrap(),
        );
        assert_eq!(cropped.dimensions(), (100, 25));
    }

    #[test]
    fn test_empty_bitmap_is_error() {
        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        assert!(crop_page_region(&empty, &NormalizedRect::new(0.0, 0.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn test_pixel_span() {
        assert_eq!(pixel_span(0.0, 1.0, 10), (0, 10));
        assert_eq!(pixel_span(0.5, 0.5, 10), (5, 6));
        assert_eq!(pixel_span(1.0, 1.0, 10), (9, 10));
    }
}
