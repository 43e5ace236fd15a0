// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for shop-floor operators.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The `retriable` flag is advisory: the session core never retries on its
// own, callers decide.

use crate::error::{BonwerkError, EncodeError};

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or timeout. Trying again may help.
    Transient,
    /// Someone must do something (connect first, add paper, close cover).
    ActionRequired,
    /// The request itself is wrong; retrying cannot help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the operator should try.
    pub suggestion: String,
    /// Whether a caller-side retry is sensible.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `BonwerkError` into a `HumanError`.
pub fn humanize_error(err: &BonwerkError) -> HumanError {
    match err {
        BonwerkError::NotInitialized => HumanError {
            message: "The printer service hasn't been started.".into(),
            suggestion: "Initialize the printer service before using it.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BonwerkError::NotConnected => HumanError {
            message: "No printer is connected.".into(),
            suggestion: "Connect to a printer first, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BonwerkError::AlreadyConnected => HumanError {
            message: "A printer is already connected.".into(),
            suggestion: "Disconnect from the current printer before connecting to another one."
                .into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BonwerkError::InvalidAddress(_) => HumanError {
            message: "That printer address isn't usable.".into(),
            suggestion: "Check the address and try again. It should look like 192.168.1.100."
                .into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BonwerkError::TransportUnreachable(_) => HumanError {
            message: "The receipt printer could not be reached.".into(),
            suggestion:
                "Check that the printer is turned on and on the same network, then try again."
                    .into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BonwerkError::TransportRefused(_) => HumanError {
            message: "The receipt printer turned the connection away.".into(),
            suggestion: "The printer may be busy with another device. Wait a moment, or turn it off and on again."
                .into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BonwerkError::TransportWriteFailure(_) => HumanError {
            message: "The connection to the printer was lost while printing.".into(),
            suggestion: "Reconnect to the printer and print again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BonwerkError::Discovery(_) => HumanError {
            message: "Searching the network for printers failed.".into(),
            suggestion: "Make sure this device is connected to the network, then try again."
                .into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BonwerkError::Encode(encode) => humanize_encode_error(encode),

        BonwerkError::Unsupported => HumanError {
            message: "Printing isn't available on this device.".into(),
            suggestion: "Use a device with network, Bluetooth or USB printer access.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        BonwerkError::Config(detail) => HumanError {
            message: "The printer settings are invalid.".into(),
            suggestion: format!("Fix the configuration file and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BonwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file couldn't be found.".into(),
                    suggestion: "Check the path and try again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Permission denied.".into(),
                    suggestion: "Check that this user may access the printer device or file."
                        .into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "A file could not be read or written.".into(),
                    suggestion: "Try again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        BonwerkError::Serialization(_) => HumanError {
            message: "A settings file couldn't be read.".into(),
            suggestion: "Check that the file is valid JSON.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

fn humanize_encode_error(err: &EncodeError) -> HumanError {
    match err {
        EncodeError::InvalidBarcodeData(detail) => HumanError {
            message: "That barcode can't be printed.".into(),
            suggestion: format!("Check the barcode data matches the barcode type. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },
        EncodeError::MalformedPdfPayload(_) => HumanError {
            message: "This PDF could not be read.".into(),
            suggestion: "The file may be damaged. Try a different file.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        EncodeError::PageOutOfRange { page, page_count } => HumanError {
            message: format!("Page {page} doesn't exist."),
            suggestion: format!("Choose a page between 1 and {page_count}."),
            retriable: false,
            severity: Severity::Permanent,
        },
        EncodeError::InvalidJob(detail) => HumanError {
            message: "Nothing to print.".into(),
            suggestion: format!("Check what you asked to print. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Plain-language summary for a printer status snapshot, if it needs
/// attention.
pub fn describe_status(snapshot: &crate::types::PrinterStatusSnapshot) -> Option<String> {
    use crate::types::PaperStatus;

    match snapshot.paper_status {
        PaperStatus::Ok if snapshot.ready => None,
        PaperStatus::Ok => Some("The printer is not ready.".into()),
        PaperStatus::Out => Some("The printer is out of paper. Load a new roll.".into()),
        PaperStatus::CoverOpen => Some("The printer cover is open. Close it.".into()),
        PaperStatus::Unknown => Some("The printer did not report its status.".into()),
        PaperStatus::Disconnected => Some("No printer is connected.".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaperStatus, PrinterStatusSnapshot};

    #[test]
    fn unreachable_is_transient() {
        let human = humanize_error(&BonwerkError::TransportUnreachable(
            "192.168.1.50:9100 timed out after 5000ms".into(),
        ));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn not_connected_is_action_required() {
        let human = humanize_error(&BonwerkError::NotConnected);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn barcode_error_is_permanent() {
        let err = BonwerkError::from(EncodeError::InvalidBarcodeData("letters in UPC_A".into()));
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Permanent);
        assert!(human.suggestion.contains("letters in UPC_A"));
    }

    #[test]
    fn page_out_of_range_names_bounds() {
        let err = BonwerkError::from(EncodeError::PageOutOfRange {
            page: 5,
            page_count: 2,
        });
        let human = humanize_error(&err);
        assert!(human.message.contains('5'));
        assert!(human.suggestion.contains("between 1 and 2"));
    }

    #[test]
    fn healthy_status_needs_no_description() {
        let healthy = PrinterStatusSnapshot {
            connected: true,
            ready: true,
            paper_status: PaperStatus::Ok,
            paper_out: Some(false),
            cover_open: Some(false),
        };
        assert!(describe_status(&healthy).is_none());
        assert!(describe_status(&PrinterStatusSnapshot::disconnected()).is_some());
    }
}
