// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bonwerk core: domain types, configuration and errors shared by every crate.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::PrinterConfig;
pub use error::{BonwerkError, EncodeError};
pub use types::*;
