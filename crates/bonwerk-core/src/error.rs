// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bonwerk.

use thiserror::Error;

/// Input-validation failures raised by the command encoder.
///
/// These are the only failures the caller-facing contract surfaces as typed
/// errors: they mean the request itself was malformed, not that the printer
/// or the link misbehaved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("invalid barcode data: {0}")]
    InvalidBarcodeData(String),

    #[error("malformed PDF payload: {0}")]
    MalformedPdfPayload(String),

    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("invalid print job: {0}")]
    InvalidJob(String),
}

/// Top-level error type for all Bonwerk operations.
#[derive(Debug, Error)]
pub enum BonwerkError {
    // -- Lifecycle --
    #[error("printer manager is not initialized")]
    NotInitialized,

    #[error("printer is not connected")]
    NotConnected,

    #[error("a printer session is already active")]
    AlreadyConnected,

    #[error("invalid printer address: {0}")]
    InvalidAddress(String),

    // -- Transport --
    #[error("printer unreachable: {0}")]
    TransportUnreachable(String),

    #[error("printer refused the connection: {0}")]
    TransportRefused(String),

    #[error("write to printer failed: {0}")]
    TransportWriteFailure(String),

    #[error("printer discovery failed: {0}")]
    Discovery(String),

    // -- Encoder --
    #[error(transparent)]
    Encode(#[from] EncodeError),

    // -- Platform --
    #[error("printing is not supported on this platform")]
    Unsupported,

    // -- Configuration / IO --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BonwerkError {
    /// The link is presumed dead after this error and the session is gone.
    pub fn tears_down_session(&self) -> bool {
        matches!(self, Self::TransportWriteFailure(_))
    }

    /// Encoder validation failure carried by this error, if any.
    pub fn as_encode_error(&self) -> Option<&EncodeError> {
        match self {
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BonwerkError>;
