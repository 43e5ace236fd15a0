// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The caller-facing printer plugin contract.
//
// Request and response shapes use camelCase field names so they can be
// bridged to and from JSON without an extra mapping layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bonwerk_core::{
    Alignment, BarcodeOptions, BarcodeType, EncodeError, FontSize, PdfOptions, PrinterConfig,
    PrinterStatusSnapshot, TextOptions, TransportKind,
};

/// Printer operations exposed to callers.
///
/// Lifecycle and transport failures come back as `success: false` with a
/// message. Only encoder input-validation failures are returned as `Err`.
#[async_trait]
pub trait PrinterPlugin: Send + Sync {
    /// Human-readable platform name.
    fn platform_name(&self) -> &str;

    async fn initialize(&self) -> SuccessResponse;

    async fn is_initialized(&self) -> InitializedResponse;

    async fn connect(&self, request: ConnectRequest) -> SuccessResponse;

    async fn disconnect(&self) -> SuccessResponse;

    async fn discover_network_printers(&self, request: DiscoveryRequest) -> DiscoveryResponse;

    async fn print_text(&self, request: TextRequest) -> Result<SuccessResponse, EncodeError>;

    async fn print_barcode(&self, request: BarcodeRequest)
    -> Result<SuccessResponse, EncodeError>;

    async fn print_pdf(&self, request: PdfRequest) -> Result<SuccessResponse, EncodeError>;

    async fn get_status(&self) -> StatusResponse;
}

// -- Requests ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub address: String,
    #[serde(rename = "type", default)]
    pub kind: TransportKind,
    #[serde(default)]
    pub port: Option<u16>,
    /// Milliseconds.
    #[serde(default, alias = "timeoutMs")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRequest {
    /// Milliseconds.
    #[serde(default, alias = "timeoutMs")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRequest {
    pub text: String,
    #[serde(default)]
    pub font_size: Option<FontSize>,
    #[serde(default)]
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default, alias = "hPos")]
    pub horizontal_position: Option<u16>,
    #[serde(default, alias = "vPos")]
    pub vertical_position: Option<u16>,
}

impl From<TextRequest> for TextOptions {
    fn from(request: TextRequest) -> Self {
        Self {
            font_size: request.font_size.unwrap_or_default(),
            alignment: request.alignment.unwrap_or_default(),
            bold: request.bold.unwrap_or(false),
            horizontal_position: request.horizontal_position,
            vertical_position: request.vertical_position,
            text: request.text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeRequest {
    pub data: String,
    #[serde(default)]
    pub barcode_type: Option<BarcodeType>,
    #[serde(default)]
    pub width: Option<u8>,
    #[serde(default)]
    pub height: Option<u8>,
    #[serde(default, alias = "hPos")]
    pub horizontal_position: Option<u16>,
    #[serde(default, alias = "vPos")]
    pub vertical_position: Option<u16>,
    #[serde(default)]
    pub hri: Option<bool>,
}

impl BarcodeRequest {
    /// Fill unset fields from `config`.
    pub fn into_options(self, config: &PrinterConfig) -> BarcodeOptions {
        BarcodeOptions {
            barcode_type: self.barcode_type.unwrap_or_default(),
            width: self.width.unwrap_or(config.default_barcode_width),
            height: self.height.unwrap_or(config.default_barcode_height),
            horizontal_position: self.horizontal_position,
            vertical_position: self.vertical_position,
            hri: self.hri.unwrap_or(false),
            data: self.data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfRequest {
    pub base64_file_string: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default, alias = "hPos")]
    pub horizontal_position: Option<u16>,
    #[serde(default, alias = "vPos")]
    pub vertical_position: Option<u16>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub dithering: Option<bool>,
    #[serde(default)]
    pub compress: Option<bool>,
    #[serde(default)]
    pub level: Option<u8>,
}

impl PdfRequest {
    /// Fill unset fields from `config`.
    pub fn into_options(self, config: &PrinterConfig) -> PdfOptions {
        PdfOptions {
            width: self.width.unwrap_or(config.default_pdf_width),
            horizontal_position: self.horizontal_position,
            vertical_position: self.vertical_position,
            page: self.page.unwrap_or(1),
            dithering: self.dithering.unwrap_or(true),
            compress: self.compress.unwrap_or(true),
            level: self.level.unwrap_or(0),
            base64: self.base64_file_string,
        }
    }
}

// -- Responses ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedResponse {
    pub initialized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    pub success: bool,
    /// IP addresses or host names.
    pub devices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: PrinterStatusSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<PrinterStatusSnapshot> for StatusResponse {
    fn from(status: PrinterStatusSnapshot) -> Self {
        Self {
            status,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bonwerk_core::PaperStatus;

    #[test]
    fn connect_request_defaults_to_network() {
        let req: ConnectRequest = serde_json::from_str(r#"{"address":"10.0.0.5"}"#).unwrap();
        assert_eq!(req.kind, TransportKind::Network);
        assert_eq!((req.port, req.timeout), (None, None));

        let req: ConnectRequest =
            serde_json::from_str(r#"{"address":"/dev/rfcomm0","type":"bluetooth","timeoutMs":800}"#)
                .unwrap();
        assert_eq!(req.kind, TransportKind::Bluetooth);
        assert_eq!(req.timeout, Some(800));
    }

    #[test]
    fn text_request_accepts_short_position_names() {
        let req: TextRequest = serde_json::from_str(
            r#"{"text":"Hi","fontSize":"xlarge","alignment":"right","hPos":12,"verticalPosition":30}"#,
        )
        .unwrap();
        let opts = TextOptions::from(req);
        assert_eq!(opts.font_size, FontSize::Xlarge);
        assert_eq!(opts.alignment, Alignment::Right);
        assert_eq!(opts.horizontal_position, Some(12));
        assert_eq!(opts.vertical_position, Some(30));
        assert!(!opts.bold);
    }

    #[test]
    fn barcode_request_takes_config_defaults() {
        let req: BarcodeRequest =
            serde_json::from_str(r#"{"data":"4006381333931","barcodeType":"EAN13"}"#).unwrap();
        let opts = req.into_options(&PrinterConfig::default());
        assert_eq!(opts.barcode_type, BarcodeType::Ean13);
        assert_eq!((opts.width, opts.height), (2, 100));
        assert!(!opts.hri);
    }

    #[test]
    fn pdf_request_defaults() {
        let req: PdfRequest = serde_json::from_str(r#"{"base64FileString":"JVBERi0="}"#).unwrap();
        let opts = req.into_options(&PrinterConfig::default());
        assert_eq!(opts.width, 576);
        assert_eq!(opts.page, 1);
        assert!(opts.dithering && opts.compress);
        assert_eq!(opts.level, 0);
    }

    #[test]
    fn status_response_is_flat_camel_case() {
        let json = serde_json::to_value(StatusResponse::from(PrinterStatusSnapshot {
            connected: true,
            ready: false,
            paper_status: PaperStatus::CoverOpen,
            paper_out: Some(false),
            cover_open: Some(true),
        }))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "connected": true,
                "ready": false,
                "paperStatus": "cover_open",
                "paperOut": false,
                "coverOpen": true
            })
        );
    }

    #[test]
    fn success_omits_empty_message() {
        let json = serde_json::to_string(&SuccessResponse::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }
}
