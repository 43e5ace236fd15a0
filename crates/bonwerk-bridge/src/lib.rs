// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bonwerk Bridge: the caller-facing printer plugin and platform selection.

pub mod traits;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

pub mod stub;

pub use traits::*;

use bonwerk_core::PrinterConfig;

/// Build the printer plugin for the target platform.
///
/// Native targets get a live session coordinator; `wasm32` gets a plugin that
/// reports every operation as unsupported. Each call returns an independent
/// instance with its own session.
pub fn printer_plugin(config: PrinterConfig) -> Box<dyn PrinterPlugin> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(native::NativePrinter::new(config))
    }
    #[cfg(target_arch = "wasm32")]
    {
        let _ = config;
        Box::new(stub::UnsupportedPrinter)
    }
}
