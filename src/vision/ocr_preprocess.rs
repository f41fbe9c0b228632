//! Image preparation for metadata OCR
//!
//! Chart exports print their device name and test date in a thin strip at
//! the bottom (sometimes the top) of the image. These helpers cut that strip
//! out and binarize it into dark text on a light background, which is what
//! most recognizers expect.

use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

use super::preprocess::adaptive_threshold;

/// Sigma of a 3x3 Gaussian kernel
const SMALL_BLUR_SIGMA: f32 = 0.8;

/// Adaptive threshold window used for text
const TEXT_BLOCK_SIZE: u32 = 11;

/// Adaptive threshold offset used for text
const TEXT_OFFSET: f32 = 2.0;

/// Height of a strip covering `fraction` of the image, at least one row
fn strip_height(height: u32, fraction: f32) -> u32 {
    ((height as f32 * fraction.clamp(0.0, 1.0)).round() as u32).clamp(1, height.max(1))
}

/// Bottom `fraction` of the image
pub fn crop_footer(image: &RgbImage, fraction: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    let strip = strip_height(height, fraction).min(height);
    imageops::crop_imm(image, 0, height - strip, width, strip).to_image()
}

/// Top `fraction` of the image
pub fn crop_header(image: &RgbImage, fraction: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    let strip = strip_height(height, fraction).min(height);
    imageops::crop_imm(image, 0, 0, width, strip).to_image()
}

/// Binarize a text strip for recognition.
///
/// Grayscale, light blur, then adaptive threshold. The result is dark text
/// (0) on white (255); strips that come out mostly dark are inverted.
pub fn prepare_for_ocr(image: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(image);
    let blurred = gaussian_blur_f32(&gray, SMALL_BLUR_SIGMA);

    // Ink is 255 here; flip so text is dark
    let mut binary = adaptive_threshold(&blurred, TEXT_BLOCK_SIZE, TEXT_OFFSET);
    imageops::invert(&mut binary);

    if mean_intensity(&binary) < 127.0 {
        debug!("Text strip is mostly dark, inverting");
        imageops::invert(&mut binary);
    }

    binary
}

/// Average pixel value (0.0 for an empty image)
pub fn mean_intensity(image: &GrayImage) -> f32 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|Luma([v])| u64::from(*v)).sum();
    (sum as f64 / count as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_crop_footer_takes_bottom_strip() {
        let mut image = RgbImage::from_pixel(100, 200, Rgb([255, 255, 255]));
        draw_filled_rect_mut(&mut image, Rect::at(0, 190).of_size(100, 10), Rgb([0, 0, 0]));

        let footer = crop_footer(&image, 0.1);

        assert_eq!(footer.dimensions(), (100, 20));
        assert_eq!(footer.get_pixel(50, 15).0, [0, 0, 0]);
        assert_eq!(footer.get_pixel(50, 2).0, [255, 255, 255]);
    }

    #[test]
    fn test_crop_header_takes_top_strip() {
        let image = RgbImage::from_pixel(100, 200, Rgb([255, 255, 255]));
        assert_eq!(crop_header(&image, 0.1).dimensions(), (100, 20));
    }

    #[test]
    fn test_crop_is_never_empty() {
        let image = RgbImage::from_pixel(10, 5, Rgb([255, 255, 255]));
        assert_eq!(crop_footer(&image, 0.0).height(), 1);
        assert_eq!(crop_footer(&image, 5.0).height(), 5);
    }

    #[test]
    fn test_prepare_for_ocr_gives_dark_text_on_light() {
        let mut image = RgbImage::from_pixel(120, 30, Rgb([250, 250, 250]));
        draw_filled_rect_mut(&mut image, Rect::at(20, 12).of_size(80, 2), Rgb([10, 10, 10]));

        let binary = prepare_for_ocr(&image);

        assert_eq!(binary.get_pixel(60, 12).0[0], 0);
        assert_eq!(binary.get_pixel(60, 2).0[0], 255);
        assert!(mean_intensity(&binary) > 127.0);
    }

    #[test]
    fn test_mean_intensity() {
        assert_eq!(mean_intensity(&GrayImage::from_pixel(4, 4, Luma([200]))), 200.0);
        assert_eq!(mean_intensity(&GrayImage::new(0, 0)), 0.0);
    }
}
