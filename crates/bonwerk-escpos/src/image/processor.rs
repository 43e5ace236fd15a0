// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grayscale-to-monochrome pipeline for raster printing: padding,
// thresholding (fixed or Otsu) and Floyd-Steinberg dithering.

use image::imageops::{self, BiLevel};
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use tracing::{debug, instrument};

use crate::raster::MonoBitmap;

/// Image pipeline operating on a single grayscale page image.
///
/// Each method consumes `self` and returns the transformed processor:
///
/// ```ignore
/// let bitmap = RasterProcessor::from_gray(page)
///     .pad_left(32)
///     .binarize(0, true)
///     .into_bitmap();
/// ```
pub struct RasterProcessor {
    image: GrayImage,
}

impl RasterProcessor {
    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    /// Prepend `dots` white columns.
    pub fn pad_left(self, dots: u32) -> Self {
        if dots == 0 {
            return self;
        }
        let (width, height) = self.image.dimensions();
        let mut padded = GrayImage::from_pixel(width + dots, height, Luma([255]));
        imageops::replace(&mut padded, &self.image, i64::from(dots), 0);
        Self { image: padded }
    }

    /// Threshold used for a binarisation `level`: 0 picks one from the
    /// histogram (Otsu), 1-100 is a percentage of full scale.
    pub fn threshold_for(&self, level: u8) -> u8 {
        let raw = if level == 0 {
            otsu_level(&self.image)
        } else {
            (u32::from(level.min(100)) * 255 / 100) as u8
        };
        raw.clamp(1, 254)
    }

    /// Reduce to pure black and white.
    #[instrument(skip(self))]
    pub fn binarize(self, level: u8, dithering: bool) -> Self {
        let threshold = self.threshold_for(level);
        debug!(
            width = self.image.width(),
            height = self.image.height(),
            threshold,
            "Binarizing page"
        );

        let mut gray = self.image;
        if dithering {
            // Move the chosen threshold onto the ditherer's fixed midpoint
            // while keeping pure black and pure white where they are.
            for pixel in gray.pixels_mut() {
                pixel.0[0] = remap_around(pixel.0[0], threshold);
            }
            imageops::dither(&mut gray, &BiLevel);
        } else {
            for pixel in gray.pixels_mut() {
                pixel.0[0] = if pixel.0[0] < threshold { 0 } else { 255 };
            }
        }
        Self { image: gray }
    }

    pub fn into_bitmap(self) -> MonoBitmap {
        MonoBitmap::from_gray(&self.image)
    }
}

/// Piecewise-linear map sending `threshold` to 128, 0 to 0 and 255 to 255.
fn remap_around(value: u8, threshold: u8) -> u8 {
    let v = u32::from(value);
    let t = u32::from(threshold);
    if v < t {
        (v * 128 / t) as u8
    } else {
        (128 + (v - t) * 127 / (255 - t)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| Luma([(x * 255 / (width - 1)) as u8]))
    }

    #[test]
    fn pad_left_adds_white_columns() {
        let black = GrayImage::from_pixel(4, 2, Luma([0]));
        let padded = RasterProcessor::from_gray(black).pad_left(3);
        assert_eq!(padded.width(), 7);
        assert_eq!(padded.as_gray().get_pixel(0, 0).0[0], 255);
        assert_eq!(padded.as_gray().get_pixel(3, 1).0[0], 0);
    }

    #[test]
    fn fixed_level_threshold() {
        let p = RasterProcessor::from_gray(gradient(10, 1));
        assert_eq!(p.threshold_for(50), 127);
        assert_eq!(p.threshold_for(100), 254);
    }

    #[test]
    fn threshold_splits_gradient() {
        let bitmap = RasterProcessor::from_gray(gradient(256, 1))
            .binarize(50, false)
            .into_bitmap();
        assert_eq!(bitmap.ink_dots(), 127);
    }

    #[test]
    fn white_page_stays_blank_when_dithered() {
        let white = GrayImage::from_pixel(64, 64, Luma([255]));
        let bitmap = RasterProcessor::from_gray(white).binarize(0, true).into_bitmap();
        assert_eq!(bitmap.ink_dots(), 0);
    }

    #[test]
    fn dithered_mid_gray_is_roughly_half_ink() {
        let gray = GrayImage::from_pixel(64, 64, Luma([128]));
        let bitmap = RasterProcessor::from_gray(gray).binarize(50, true).into_bitmap();
        let ink = bitmap.ink_dots();
        assert!(ink > 64 * 64 / 4 && ink < 64 * 64 * 3 / 4, "ink = {ink}");
    }

    #[test]
    fn remap_keeps_extremes() {
        assert_eq!(remap_around(0, 200), 0);
        assert_eq!(remap_around(255, 200), 255);
        assert_eq!(remap_around(200, 200), 128);
    }
}
