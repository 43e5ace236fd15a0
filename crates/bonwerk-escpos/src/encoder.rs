// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command encoder: turns a PrintJob into ESC/POS bytes.

use bonwerk_core::{EncodeError, EncodedJob, PdfOptions, PrintJob};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::barcode::encode_barcode;
use crate::commands::EscPosBuilder;
use crate::image::processor::RasterProcessor;
use crate::pdf::reader::PdfReader;
use crate::pdf::render::render_page;
use crate::raster::append_raster;
use crate::text::encode_text;

/// Widest raster accepted, in dots.
pub const MAX_RASTER_WIDTH: u32 = 4096;

/// Stateless ESC/POS encoder.
///
/// Encoding is a pure function of the job: the same job always yields the
/// same bytes and digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandEncoder;

impl CommandEncoder {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(kind = job.kind()))]
    pub fn encode(&self, job: &PrintJob) -> Result<EncodedJob, EncodeError> {
        let bytes = match job {
            PrintJob::Text(opts) => encode_text(opts)?,
            PrintJob::Barcode(opts) => encode_barcode(opts)?,
            PrintJob::Pdf(opts) => encode_pdf(opts)?,
        };
        let digest = hex::encode(Sha256::digest(&bytes));
        debug!(bytes = bytes.len(), digest = %digest, "Job encoded");
        Ok(EncodedJob { bytes, digest })
    }
}

/// Render one PDF page as GS v 0 raster bands.
pub fn encode_pdf(opts: &PdfOptions) -> Result<Vec<u8>, EncodeError> {
    if opts.width == 0 || opts.width > MAX_RASTER_WIDTH {
        return Err(EncodeError::InvalidJob(format!(
            "width must be between 1 and {MAX_RASTER_WIDTH} dots, got {}",
            opts.width
        )));
    }
    if opts.level > 100 {
        return Err(EncodeError::InvalidJob(format!(
            "level must be 0 (automatic) or 1-100, got {}",
            opts.level
        )));
    }

    let reader = PdfReader::from_base64(&opts.base64)?;
    let page = reader.page(opts.page)?;
    let gray = render_page(&page, opts.width)?;

    let bitmap = RasterProcessor::from_gray(gray)
        .binarize(opts.level, opts.dithering)
        .pad_left(u32::from(opts.horizontal_position.unwrap_or(0)))
        .into_bitmap();

    let mut builder = EscPosBuilder::new();
    if let Some(dots) = opts.vertical_position {
        builder.feed_dots(u32::from(dots));
    }
    append_raster(&mut builder, &bitmap, opts.compress);
    Ok(builder.build())
}
