// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bonwerk-escpos: ESC/POS command encoding for thermal receipt printers.
//
// Turns print jobs into self-contained byte streams: styled text in
// Windows-1252, 1D barcodes (GS k) and PDF pages rasterised to GS v 0
// bands. Encoding is pure and deterministic; nothing here touches I/O.

pub mod barcode;
pub mod commands;
pub mod encoder;
pub mod image;
pub mod pdf;
pub mod raster;
pub mod text;

pub use commands::EscPosBuilder;
pub use encoder::CommandEncoder;
pub use pdf::reader::PdfReader;
pub use raster::MonoBitmap;
