// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fonts for painting PDF text.
//
// Embedded font programs are not parsed. Character codes are mapped to
// Unicode through the font's encoding, glyph advances come from the PDF
// `/Widths` array when it has one, and outlines come from a bundled DejaVu
// Sans face rasterised with `ab_glyph`.

use std::sync::OnceLock;

use ab_glyph::{Font, FontArc, PxScale, point};
use encoding_rs::{UTF_16BE, WINDOWS_1252};
use image::GrayImage;
use lopdf::{Dictionary, Document, Encoding, Object};
use tracing::{debug, warn};

use super::reader::{number, resolve};

static REGULAR_TTF: &[u8] = include_bytes!("../../assets/fonts/dejavu/DejaVuSans.ttf");
static BOLD_TTF: &[u8] = include_bytes!("../../assets/fonts/dejavu/DejaVuSans-Bold.ttf");

/// Bundled outline face standing in for the document's font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

impl Face {
    fn font(self) -> Option<&'static FontArc> {
        static REGULAR: OnceLock<Option<FontArc>> = OnceLock::new();
        static BOLD: OnceLock<Option<FontArc>> = OnceLock::new();
        let (cell, data) = match self {
            Face::Regular => (&REGULAR, REGULAR_TTF),
            Face::Bold => (&BOLD, BOLD_TTF),
        };
        cell.get_or_init(|| {
            FontArc::try_from_slice(data)
                .map_err(|err| warn!(face = ?self, %err, "Bundled font unreadable"))
                .ok()
        })
        .as_ref()
    }

    /// Horizontal advance of `ch` as a fraction of the em.
    pub fn advance(self, ch: char) -> f32 {
        let Some(font) = self.font() else {
            return 0.5;
        };
        let upem = font.units_per_em().unwrap_or(1000.0);
        font.h_advance_unscaled(font.glyph_id(ch)) / upem
    }

    /// Paint `ch` with its baseline origin at `origin` (device pixels) and
    /// an em of `em_x` by `em_y` pixels, blending toward `gray` by coverage.
    /// Returns whether any outline was drawn.
    pub fn paint(
        self,
        canvas: &mut GrayImage,
        ch: char,
        origin: (f32, f32),
        (em_x, em_y): (f32, f32),
        gray: u8,
    ) -> bool {
        let Some(font) = self.font() else {
            return false;
        };
        let upem = font.units_per_em().unwrap_or(1000.0);
        // PxScale measures ascent-to-descent, not the em square.
        let k = font.height_unscaled() / upem;
        let scale = PxScale {
            x: em_x * k,
            y: em_y * k,
        };
        let glyph = font
            .glyph_id(ch)
            .with_scale_and_position(scale, point(origin.0, origin.1));
        let Some(outlined) = font.outline_glyph(glyph) else {
            return false;
        };

        let bounds = outlined.px_bounds();
        let (width, height) = (i64::from(canvas.width()), i64::from(canvas.height()));
        let target = f32::from(gray);
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i64 + i64::from(gx);
            let py = bounds.min.y as i64 + i64::from(gy);
            if px < 0 || py < 0 || px >= width || py >= height {
                return;
            }
            let pixel = canvas.get_pixel_mut(px as u32, py as u32);
            let current = f32::from(pixel.0[0]);
            pixel.0[0] = (current + (target - current) * coverage.min(1.0)).round() as u8;
        });
        true
    }
}

/// One character code taken from a shown string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShownGlyph {
    pub ch: char,
    /// Advance in text space units per unit of font size, when the PDF
    /// declares one.
    pub width: Option<f32>,
    /// Single-byte code 32, which also receives word spacing.
    pub word_break: bool,
}

/// A font resource as far as painting needs it.
pub struct PdfFont<'a> {
    encoding: Option<Encoding<'a>>,
    first_char: i64,
    widths: Vec<f32>,
    composite: bool,
    face: Face,
}

impl<'a> PdfFont<'a> {
    pub fn from_dict(document: &'a Document, dict: &'a Dictionary) -> Self {
        let subtype = dict.get(b"Subtype").and_then(Object::as_name).unwrap_or_default();
        let base_font = dict.get(b"BaseFont").and_then(Object::as_name).unwrap_or_default();
        let encoding = match dict.get_font_encoding(document) {
            Ok(encoding) => Some(encoding),
            Err(err) => {
                debug!(%err, "Font encoding unsupported, using Windows-1252");
                None
            }
        };

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|v| v.as_i64().ok())
            .unwrap_or(0);
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|obj| resolve(document, obj))
            .and_then(|obj| obj.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| resolve(document, w).and_then(number).unwrap_or(0.0) / 1000.0)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            encoding,
            first_char,
            widths,
            composite: subtype == b"Type0",
            face: face_for(base_font),
        }
    }

    /// Font used when a page names a resource it does not define.
    pub fn fallback() -> Self {
        Self {
            encoding: None,
            first_char: 0,
            widths: Vec::new(),
            composite: false,
            face: Face::Regular,
        }
    }

    pub fn face(&self) -> Face {
        self.face
    }

    /// Split a string operand into glyphs.
    pub fn glyphs(&self, bytes: &[u8]) -> Vec<ShownGlyph> {
        if self.composite {
            let text = self
                .encoding
                .as_ref()
                .and_then(|enc| Document::decode_text(enc, bytes).ok())
                .unwrap_or_else(|| UTF_16BE.decode(bytes).0.into_owned());
            return text
                .chars()
                .map(|ch| ShownGlyph {
                    ch,
                    width: None,
                    word_break: false,
                })
                .collect();
        }

        bytes
            .iter()
            .map(|&code| ShownGlyph {
                ch: self.decode_byte(code),
                width: self.width(code),
                word_break: code == b' ',
            })
            .collect()
    }

    fn decode_byte(&self, code: u8) -> char {
        self.encoding
            .as_ref()
            .and_then(|enc| Document::decode_text(enc, &[code]).ok())
            .and_then(|s| s.chars().next())
            .or_else(|| WINDOWS_1252.decode(&[code]).0.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn width(&self, code: u8) -> Option<f32> {
        let index = usize::try_from(i64::from(code) - self.first_char).ok()?;
        self.widths.get(index).copied().filter(|w| *w > 0.0)
    }
}

fn face_for(base_font: &[u8]) -> Face {
    let name = String::from_utf8_lossy(base_font).to_ascii_lowercase();
    if ["bold", "black", "heavy"]
        .iter()
        .any(|weight| name.contains(weight))
    {
        Face::Bold
    } else {
        Face::Regular
    }
}
