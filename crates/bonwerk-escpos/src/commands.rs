// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Low-level ESC/POS command builder.

use bonwerk_core::Alignment;

pub const ESC: u8 = 0x1B;
pub const GS: u8 = 0x1D;
pub const DLE: u8 = 0x10;
pub const EOT: u8 = 0x04;
pub const LF: u8 = 0x0A;

/// Code table 16: WPC1252 (Windows Latin-1).
const CODE_PAGE_WPC1252: u8 = 16;

/// Rows per `GS v 0` band. Many printers buffer at most this much.
pub const RASTER_BAND_ROWS: usize = 128;

/// Fluent builder for ESC/POS byte sequences.
///
/// Every builder starts with `ESC @` so that the bytes it produces never
/// depend on state left behind by an earlier job.
#[derive(Debug)]
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EscPosBuilder {
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&[ESC, b'@']);
        Self { buf }
    }

    /// `ESC t 16`
    pub fn code_page_wpc1252(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b't', CODE_PAGE_WPC1252]);
        self
    }

    /// `ESC a n`
    pub fn align(&mut self, alignment: Alignment) -> &mut Self {
        let n = match alignment {
            Alignment::Left => 0,
            Alignment::Center => 1,
            Alignment::Right => 2,
        };
        self.buf.extend_from_slice(&[ESC, b'a', n]);
        self
    }

    /// `ESC M n`: font A (12x24) or condensed font B (9x17).
    pub fn font(&mut self, condensed: bool) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'M', u8::from(condensed)]);
        self
    }

    /// `GS ! n`: character width and height multipliers, each 1-8.
    pub fn char_size(&mut self, width: u8, height: u8) -> &mut Self {
        let w = width.clamp(1, 8) - 1;
        let h = height.clamp(1, 8) - 1;
        self.buf.extend_from_slice(&[GS, b'!', (w << 4) | h]);
        self
    }

    /// `ESC E n`
    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'E', u8::from(on)]);
        self
    }

    /// `ESC J n`, repeated for feeds longer than 255 dots.
    pub fn feed_dots(&mut self, dots: u32) -> &mut Self {
        let mut remaining = dots;
        while remaining > 0 {
            let step = remaining.min(255) as u8;
            self.buf.extend_from_slice(&[ESC, b'J', step]);
            remaining -= u32::from(step);
        }
        self
    }

    /// `ESC $ nL nH`: absolute horizontal print position in dots.
    pub fn absolute_position(&mut self, dots: u16) -> &mut Self {
        let [lo, hi] = dots.to_le_bytes();
        self.buf.extend_from_slice(&[ESC, b'$', lo, hi]);
        self
    }

    /// Bytes already in the printer's code page.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(LF);
        self
    }

    /// `GS h n`
    pub fn barcode_height(&mut self, dots: u8) -> &mut Self {
        self.buf.extend_from_slice(&[GS, b'h', dots.max(1)]);
        self
    }

    /// `GS w n`
    pub fn barcode_module_width(&mut self, dots: u8) -> &mut Self {
        self.buf.extend_from_slice(&[GS, b'w', dots.clamp(2, 6)]);
        self
    }

    /// `GS H n`: 0 = no HRI, 2 = below the bars.
    pub fn barcode_hri(&mut self, below: bool) -> &mut Self {
        self.buf
            .extend_from_slice(&[GS, b'H', if below { 2 } else { 0 }]);
        self
    }

    /// `GS k m n d1..dn` (function B). Caller guarantees `data.len() <= 255`.
    pub fn barcode(&mut self, symbology: u8, data: &[u8]) -> &mut Self {
        self.buf
            .extend_from_slice(&[GS, b'k', symbology, data.len() as u8]);
        self.buf.extend_from_slice(data);
        self
    }

    /// `GS v 0 0 xL xH yL yH d1..dk`: one raster band at normal density.
    ///
    /// `data` holds `rows` rows of `width_bytes` bytes, MSB = leftmost dot.
    pub fn raster_band(&mut self, width_bytes: u16, rows: u16, data: &[u8]) -> &mut Self {
        let [xl, xh] = width_bytes.to_le_bytes();
        let [yl, yh] = rows.to_le_bytes();
        self.buf
            .extend_from_slice(&[GS, b'v', b'0', 0, xl, xh, yl, yh]);
        self.buf.extend_from_slice(data);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

/// `DLE EOT n` real-time status request.
pub fn status_request(n: u8) -> [u8; 3] {
    [DLE, EOT, n]
}
