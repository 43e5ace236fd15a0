// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text job encoding.

use bonwerk_core::{EncodeError, TextOptions};
use encoding_rs::WINDOWS_1252;

use crate::commands::EscPosBuilder;

/// Encode a text job.
///
/// Style is applied first (alignment, font, size, bold), then the vertical
/// feed, then a horizontal position before every line so explicit
/// coordinates win over alignment.
pub fn encode_text(opts: &TextOptions) -> Result<Vec<u8>, EncodeError> {
    if opts.text.is_empty() {
        return Err(EncodeError::InvalidJob("text is empty".into()));
    }

    let (width, height) = opts.font_size.multipliers();
    let mut builder = EscPosBuilder::new();
    builder
        .code_page_wpc1252()
        .align(opts.alignment)
        .font(opts.font_size.condensed_font())
        .char_size(width, height)
        .bold(opts.bold);

    if let Some(dots) = opts.vertical_position {
        builder.feed_dots(u32::from(dots));
    }

    for line in opts.text.lines() {
        if let Some(dots) = opts.horizontal_position {
            builder.absolute_position(dots);
        }
        builder.raw(&to_wpc1252(line)).newline();
    }

    builder.bold(false).char_size(1, 1).font(false);
    Ok(builder.build())
}

/// Transcode to Windows-1252.
///
/// Control characters are dropped so user text can never smuggle printer
/// commands; characters without a 1252 mapping print as `?`.
pub fn to_wpc1252(line: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    let mut scratch = [0u8; 4];
    for ch in line.chars() {
        if ch.is_control() {
            continue;
        }
        if ch.is_ascii() {
            out.push(ch as u8);
            continue;
        }
        let (bytes, _, had_errors) = WINDOWS_1252.encode(ch.encode_utf8(&mut scratch));
        if had_errors {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}
