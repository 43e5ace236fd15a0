// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plugin for targets without raw sockets or serial ports (browsers).
//
// Every operation reports `Unsupported` as an unsuccessful response; nothing
// here ever pretends a job was printed.

use async_trait::async_trait;

use bonwerk_core::{BonwerkError, EncodeError, PrinterStatusSnapshot};

use crate::traits::*;

pub struct UnsupportedPrinter;

fn unsupported(operation: &str) -> String {
    tracing::warn!(operation, "printer operation called on unsupported platform");
    BonwerkError::Unsupported.to_string()
}

#[async_trait]
impl PrinterPlugin for UnsupportedPrinter {
    fn platform_name(&self) -> &str {
        "Web (unsupported)"
    }

    async fn initialize(&self) -> SuccessResponse {
        SuccessResponse::failed(unsupported("initialize"))
    }

    async fn is_initialized(&self) -> InitializedResponse {
        InitializedResponse { initialized: false }
    }

    async fn connect(&self, _request: ConnectRequest) -> SuccessResponse {
        SuccessResponse::failed(unsupported("connect"))
    }

    async fn disconnect(&self) -> SuccessResponse {
        SuccessResponse::failed(unsupported("disconnect"))
    }

    async fn discover_network_printers(&self, _request: DiscoveryRequest) -> DiscoveryResponse {
        DiscoveryResponse {
            success: false,
            devices: Vec::new(),
            message: Some(unsupported("discoverNetworkPrinters")),
        }
    }

    async fn print_text(&self, _request: TextRequest) -> Result<SuccessResponse, EncodeError> {
        Ok(SuccessResponse::failed(unsupported("printText")))
    }

    async fn print_barcode(
        &self,
        _request: BarcodeRequest,
    ) -> Result<SuccessResponse, EncodeError> {
        Ok(SuccessResponse::failed(unsupported("printBarcode")))
    }

    async fn print_pdf(&self, _request: PdfRequest) -> Result<SuccessResponse, EncodeError> {
        Ok(SuccessResponse::failed(unsupported("printPDF")))
    }

    async fn get_status(&self) -> StatusResponse {
        StatusResponse {
            status: PrinterStatusSnapshot::disconnected(),
            message: Some(unsupported("getStatus")),
        }
    }
}
