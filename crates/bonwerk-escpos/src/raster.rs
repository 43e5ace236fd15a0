// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 1-bit bitmaps and their GS v 0 raster encoding.

use image::GrayImage;

use crate::commands::{EscPosBuilder, RASTER_BAND_ROWS};

/// Packed 1-bit image, MSB first, one bit per printer dot (1 = black).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoBitmap {
    width: u32,
    height: u32,
    width_bytes: usize,
    data: Vec<u8>,
}

impl MonoBitmap {
    /// Pack a binarised grayscale image. Pixels below mid-gray become dots.
    pub fn from_gray(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let width_bytes = (width as usize).div_ceil(8);
        let mut data = vec![0u8; width_bytes * height as usize];

        for (x, y, pixel) in gray.enumerate_pixels() {
            if pixel.0[0] < 128 {
                let idx = y as usize * width_bytes + x as usize / 8;
                data[idx] |= 0x80 >> (x % 8);
            }
        }

        Self {
            width,
            height,
            width_bytes,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width_bytes(&self) -> usize {
        self.width_bytes
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width_bytes..(y + 1) * self.width_bytes]
    }

    pub fn is_row_blank(&self, y: usize) -> bool {
        self.row(y).iter().all(|&b| b == 0)
    }

    /// Number of black dots (used by tests and logging).
    pub fn ink_dots(&self) -> u32 {
        self.data.iter().map(|b| b.count_ones()).sum()
    }
}

/// Append `bitmap` as `GS v 0` bands.
///
/// With `compress`, runs of blank rows are sent as `ESC J` paper feeds
/// instead of zero-filled raster data.
pub fn append_raster(builder: &mut EscPosBuilder, bitmap: &MonoBitmap, compress: bool) {
    let height = bitmap.height() as usize;
    let mut y = 0;

    while y < height {
        if compress && bitmap.is_row_blank(y) {
            let start = y;
            while y < height && bitmap.is_row_blank(y) {
                y += 1;
            }
            builder.feed_dots((y - start) as u32);
            continue;
        }

        let start = y;
        while y < height
            && y - start < RASTER_BAND_ROWS
            && !(compress && bitmap.is_row_blank(y))
        {
            y += 1;
        }
        append_band(builder, bitmap, start, y);
    }
}

fn append_band(builder: &mut EscPosBuilder, bitmap: &MonoBitmap, start: usize, end: usize) {
    let width_bytes = bitmap.width_bytes();
    let mut band = Vec::with_capacity(width_bytes * (end - start));
    for y in start..end {
        band.extend_from_slice(bitmap.row(y));
    }
    builder.raster_band(width_bytes as u16, (end - start) as u16, &band);
}
