//! Synthetic audiogram charts for tests
//!
//! Renders a 1000x800 chart whose plot frame spans pixels 100..=900 by
//! 100..=700, so the expected calibration is exact: 5 px per dB vertically
//! and 800 px across 64 Hz - 16 kHz.

use std::io::Cursor;

use image::{ImageFormat, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::rect::Rect;

use crate::analysis::calibration::{calibrate, AxisCalibration};
use crate::shared::{GraphBounds, STANDARD_FREQUENCIES};

pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 800;

/// First and last pixel of the plot frame
pub const PLOT_LEFT: u32 = 100;
pub const PLOT_RIGHT: u32 = 900;
pub const PLOT_TOP: u32 = 100;
pub const PLOT_BOTTOM: u32 = 700;

const FRAME: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([170, 170, 170]);
const RED: Rgb<u8> = Rgb([230, 20, 20]);
const BLUE: Rgb<u8> = Rgb([20, 40, 230]);
const MARKER_RADIUS: i32 = 8;

/// Reference right-ear thresholds, one per standard frequency
pub const RIGHT_THRESHOLDS: [f64; 9] = [10.0, 15.0, 20.0, 25.0, 30.0, 40.0, 50.0, 60.0, 70.0];

/// Reference left-ear thresholds, one per standard frequency
pub const LEFT_THRESHOLDS: [f64; 9] = [25.0, 30.0, 35.0, 40.0, 45.0, 55.0, 65.0, 75.0, 85.0];

/// Description of a chart to render
#[derive(Debug, Clone, Default)]
pub struct SyntheticChart {
    /// Red circles as (frequency Hz, threshold dB)
    pub right: Vec<(u32, f64)>,
    /// Blue crosses as (frequency Hz, threshold dB)
    pub left: Vec<(u32, f64)>,
    /// Clockwise rotation applied to the finished chart
    pub rotation_degrees: f32,
}

impl SyntheticChart {
    /// Both ears at every standard frequency
    pub fn complete() -> Self {
        Self {
            right: pairs(&RIGHT_THRESHOLDS),
            left: pairs(&LEFT_THRESHOLDS),
            rotation_degrees: 0.0,
        }
    }

    pub fn rotated(mut self, degrees: f32) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    pub fn render(&self) -> RgbImage {
        render_chart(self)
    }

    pub fn png(&self) -> Vec<u8> {
        encode_png(&self.render())
    }
}

fn pairs(thresholds: &[f64; 9]) -> Vec<(u32, f64)> {
    STANDARD_FREQUENCIES.iter().copied().zip(thresholds.iter().copied()).collect()
}

/// Exact calibration of an unrotated synthetic chart
pub fn chart_calibration() -> AxisCalibration {
    let bounds = GraphBounds::new(PLOT_LEFT, PLOT_RIGHT + 1, PLOT_TOP, PLOT_BOTTOM + 1).unwrap();
    calibrate(bounds, CHART_WIDTH, CHART_HEIGHT)
}

/// Pixel position of a (frequency, threshold) pair, rounded
pub fn marker_position(frequency_hz: u32, threshold_db: f64) -> (i32, i32) {
    let calibration = chart_calibration();
    (
        calibration.x_for_frequency(f64::from(frequency_hz)).round() as i32,
        calibration.y_for_threshold(threshold_db).round() as i32,
    )
}

fn draw_cross(image: &mut RgbImage, (cx, cy): (i32, i32)) {
    let r = MARKER_RADIUS as f32;
    for offset in -1..=1 {
        let (x, y) = ((cx + offset) as f32, cy as f32);
        draw_line_segment_mut(image, (x - r, y - r), (x + r, y + r), BLUE);
        draw_line_segment_mut(image, (x - r, y + r), (x + r, y - r), BLUE);
    }
}

/// Draw the chart: frame, grid, then markers on top
pub fn render_chart(chart: &SyntheticChart) -> RgbImage {
    let mut image = RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, Rgb([255, 255, 255]));
    let calibration = chart_calibration();

    for &frequency in &STANDARD_FREQUENCIES {
        let x = calibration.x_for_frequency(f64::from(frequency)).round() as f32;
        draw_line_segment_mut(&mut image, (x, PLOT_TOP as f32), (x, PLOT_BOTTOM as f32), GRID);
    }
    for db in (0..=120).step_by(10) {
        let y = calibration.y_for_threshold(f64::from(db)).round() as f32;
        draw_line_segment_mut(&mut image, (PLOT_LEFT as f32, y), (PLOT_RIGHT as f32, y), GRID);
    }

    // Two nested rectangles give a 2 px frame whose outer edge is the plot edge
    let width = PLOT_RIGHT - PLOT_LEFT + 1;
    let height = PLOT_BOTTOM - PLOT_TOP + 1;
    draw_hollow_rect_mut(&mut image, Rect::at(PLOT_LEFT as i32, PLOT_TOP as i32).of_size(width, height), FRAME);
    draw_hollow_rect_mut(
        &mut image,
        Rect::at(PLOT_LEFT as i32 + 1, PLOT_TOP as i32 + 1).of_size(width - 2, height - 2),
        FRAME,
    );

    for &(frequency, db) in &chart.right {
        draw_filled_circle_mut(&mut image, marker_position(frequency, db), MARKER_RADIUS, RED);
    }
    for &(frequency, db) in &chart.left {
        draw_cross(&mut image, marker_position(frequency, db));
    }

    if chart.rotation_degrees != 0.0 {
        image = rotate_about_center(
            &image,
            chart.rotation_degrees.to_radians(),
            Interpolation::Bilinear,
            Rgb([255, 255, 255]),
        );
    }

    image
}

/// Encode an image as PNG bytes
pub fn encode_png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Grayscale PNG of a uniform color, for degenerate-input tests
pub fn blank_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::GrayImage::from_pixel(width, height, Luma([255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_calibration_is_exact() {
        let calibration = chart_calibration();
        assert_eq!(marker_position(64, 0.0), (100, 100));
        assert_eq!(marker_position(16000, 120.0), (900, 700));
        assert!((calibration.db_scale - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_render_draws_markers_and_frame() {
        let image = SyntheticChart::complete().render();

        let (x, y) = marker_position(1000, 30.0);
        assert_eq!(*image.get_pixel(x as u32, y as u32), RED);
        let (x, y) = marker_position(1000, 45.0);
        assert_eq!(*image.get_pixel(x as u32, y as u32), BLUE);
        assert_eq!(*image.get_pixel(PLOT_LEFT, 400), FRAME);
        assert_eq!(*image.get_pixel(50, 50), Rgb([255, 255, 255]));
    }
}
