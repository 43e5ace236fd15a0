// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 1D barcode validation and encoding (GS k, function B).

use bonwerk_core::{BarcodeOptions, BarcodeType, EncodeError};

use crate::commands::EscPosBuilder;

const MAX_BARCODE_DATA: usize = 255;

const CODE39_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./";
const CODABAR_CHARSET: &str = "0123456789ABCD$+-./:";

/// `m` value for `GS k` function B.
pub fn symbology_code(barcode_type: BarcodeType) -> u8 {
    match barcode_type {
        BarcodeType::UpcA => 65,
        BarcodeType::UpcE => 66,
        BarcodeType::Ean13 => 67,
        BarcodeType::Ean8 => 68,
        BarcodeType::Code39 => 69,
        BarcodeType::Itf => 70,
        BarcodeType::Codabar => 71,
        BarcodeType::Code93 => 72,
        BarcodeType::Code128 => 73,
    }
}

/// Check that `data` can be represented in `barcode_type`.
pub fn validate(barcode_type: BarcodeType, data: &str) -> Result<(), EncodeError> {
    let invalid = |reason: String| {
        Err(EncodeError::InvalidBarcodeData(format!(
            "{}: {reason}",
            barcode_type.name()
        )))
    };

    if data.is_empty() {
        return invalid("data is empty".into());
    }
    if data.len() > MAX_BARCODE_DATA {
        return invalid(format!("data longer than {MAX_BARCODE_DATA} bytes"));
    }

    if barcode_type.numeric_only() && !data.bytes().all(|b| b.is_ascii_digit()) {
        return invalid(format!("{data:?} contains non-digit characters"));
    }

    let len = data.len();
    match barcode_type {
        BarcodeType::UpcA if !(11..=12).contains(&len) => {
            invalid(format!("needs 11 or 12 digits, got {len}"))
        }
        BarcodeType::UpcE if !((6..=8).contains(&len) || (11..=12).contains(&len)) => {
            invalid(format!("needs 6-8 or 11-12 digits, got {len}"))
        }
        BarcodeType::Ean13 if !(12..=13).contains(&len) => {
            invalid(format!("needs 12 or 13 digits, got {len}"))
        }
        BarcodeType::Ean8 if !(7..=8).contains(&len) => {
            invalid(format!("needs 7 or 8 digits, got {len}"))
        }
        BarcodeType::Itf if len % 2 != 0 => invalid(format!("needs an even digit count, got {len}")),
        BarcodeType::Code39 => check_charset(data, CODE39_CHARSET).or_else(invalid),
        BarcodeType::Codabar => check_charset(data, CODABAR_CHARSET).or_else(invalid),
        BarcodeType::Code93 | BarcodeType::Code128 => {
            match data.chars().find(|c| !(' '..='~').contains(c)) {
                Some(c) => invalid(format!("{c:?} is not printable ASCII")),
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

fn check_charset(data: &str, charset: &str) -> Result<(), String> {
    match data.chars().find(|c| !charset.contains(*c)) {
        Some(c) => Err(format!("{c:?} is not allowed")),
        None => Ok(()),
    }
}

/// Bytes sent after `GS k m n`. CODE128 selects code set B up front.
fn payload(barcode_type: BarcodeType, data: &str) -> Vec<u8> {
    match barcode_type {
        BarcodeType::Code128 => {
            let mut out = Vec::with_capacity(data.len() + 2);
            out.extend_from_slice(b"{B");
            for b in data.bytes() {
                if b == b'{' {
                    out.push(b'{');
                }
                out.push(b);
            }
            out
        }
        _ => data.as_bytes().to_vec(),
    }
}

/// Encode a barcode job.
pub fn encode_barcode(opts: &BarcodeOptions) -> Result<Vec<u8>, EncodeError> {
    validate(opts.barcode_type, &opts.data)?;

    let payload = payload(opts.barcode_type, &opts.data);
    if payload.len() > MAX_BARCODE_DATA {
        return Err(EncodeError::InvalidBarcodeData(format!(
            "{}: encoded data longer than {MAX_BARCODE_DATA} bytes",
            opts.barcode_type.name()
        )));
    }

    let mut builder = EscPosBuilder::new();
    if let Some(dots) = opts.vertical_position {
        builder.feed_dots(u32::from(dots));
    }
    if let Some(dots) = opts.horizontal_position {
        builder.absolute_position(dots);
    }
    builder
        .barcode_height(opts.height)
        .barcode_module_width(opts.width)
        .barcode_hri(opts.hri)
        .barcode(symbology_code(opts.barcode_type), &payload)
        .newline();

    Ok(builder.build())
}
