// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native plugin for platforms with socket and serial access.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use bonwerk_core::error::Result;
use bonwerk_core::{BonwerkError, EncodeError, Endpoint, PrinterConfig, PrinterStatusSnapshot};
use bonwerk_print::SessionCoordinator;

use crate::traits::*;

pub struct NativePrinter {
    coordinator: SessionCoordinator,
}

impl NativePrinter {
    pub fn new(config: PrinterConfig) -> Self {
        Self::with_coordinator(SessionCoordinator::new(config))
    }

    pub fn with_coordinator(coordinator: SessionCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }
}

/// Fold a coordinator result into the caller-facing shape.
fn settle(operation: &str, result: Result<()>) -> std::result::Result<SuccessResponse, EncodeError> {
    match result {
        Ok(()) => Ok(SuccessResponse::ok()),
        Err(BonwerkError::Encode(e)) => Err(e),
        Err(e) => {
            warn!(operation, error = %e, "printer operation failed");
            Ok(SuccessResponse::failed(e.to_string()))
        }
    }
}

fn millis(ms: Option<u64>) -> Option<Duration> {
    ms.map(Duration::from_millis)
}

#[async_trait]
impl PrinterPlugin for NativePrinter {
    fn platform_name(&self) -> &str {
        std::env::consts::OS
    }

    async fn initialize(&self) -> SuccessResponse {
        self.coordinator.initialize();
        SuccessResponse::ok()
    }

    async fn is_initialized(&self) -> InitializedResponse {
        InitializedResponse {
            initialized: self.coordinator.is_initialized(),
        }
    }

    async fn connect(&self, request: ConnectRequest) -> SuccessResponse {
        let endpoint = Endpoint::new(request.kind, request.address, request.port);
        match self.coordinator.connect(endpoint, millis(request.timeout)).await {
            Ok(session) => SuccessResponse {
                success: true,
                message: Some(format!("Connected to: {}", session.endpoint)),
            },
            Err(e) => SuccessResponse::failed(e.to_string()),
        }
    }

    async fn disconnect(&self) -> SuccessResponse {
        settle("disconnect", self.coordinator.disconnect().await)
            .unwrap_or_else(|e| SuccessResponse::failed(e.to_string()))
    }

    async fn discover_network_printers(&self, request: DiscoveryRequest) -> DiscoveryResponse {
        match self.coordinator.discover(millis(request.timeout)).await {
            Ok(devices) => DiscoveryResponse {
                success: true,
                devices: devices.into_iter().map(|d| d.0).collect(),
                message: None,
            },
            Err(e) => {
                warn!(error = %e, "discovery failed");
                DiscoveryResponse {
                    success: false,
                    devices: Vec::new(),
                    message: Some(e.to_string()),
                }
            }
        }
    }

    async fn print_text(
        &self,
        request: TextRequest,
    ) -> std::result::Result<SuccessResponse, EncodeError> {
        settle("printText", self.coordinator.print_text(request.into()).await)
    }

    async fn print_barcode(
        &self,
        request: BarcodeRequest,
    ) -> std::result::Result<SuccessResponse, EncodeError> {
        let opts = request.into_options(self.coordinator.config());
        settle("printBarcode", self.coordinator.print_barcode(opts).await)
    }

    async fn print_pdf(
        &self,
        request: PdfRequest,
    ) -> std::result::Result<SuccessResponse, EncodeError> {
        let opts = request.into_options(self.coordinator.config());
        settle("printPDF", self.coordinator.print_pdf(opts).await)
    }

    async fn get_status(&self) -> StatusResponse {
        match self.coordinator.get_status().await {
            Ok(status) => status.into(),
            Err(e) => {
                warn!(error = %e, "status query failed");
                let status = if e.tears_down_session() || matches!(e, BonwerkError::NotInitialized)
                {
                    PrinterStatusSnapshot::disconnected()
                } else {
                    PrinterStatusSnapshot::unknown()
                };
                StatusResponse {
                    status,
                    message: Some(e.to_string()),
                }
            }
        }
    }
}
