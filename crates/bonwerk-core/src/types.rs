// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bonwerk printer session manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{DEFAULT_BARCODE_HEIGHT, DEFAULT_BARCODE_WIDTH, DEFAULT_PDF_WIDTH};

/// Unique identifier for a printer session (log correlation only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Link-layer channel used to reach a printer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Raw TCP socket (JetDirect).
    #[default]
    Network,
    /// Bluetooth RFCOMM / SPP, exposed by the OS as a serial device.
    Bluetooth,
    /// USB printer-class device node.
    Usb,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::Bluetooth => "bluetooth",
            Self::Usb => "usb",
        })
    }
}

/// Where to reach a printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub kind: TransportKind,
    /// IP address or host name for network printers, device path otherwise.
    pub address: String,
    /// TCP port; only meaningful for [`TransportKind::Network`].
    pub port: Option<u16>,
}

impl Endpoint {
    pub fn new(kind: TransportKind, address: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            kind,
            address: address.into(),
            port,
        }
    }

    pub fn network(address: impl Into<String>, port: u16) -> Self {
        Self::new(TransportKind::Network, address, Some(port))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.kind, self.port) {
            (TransportKind::Network, Some(port)) => write!(f, "{}:{}", self.address, port),
            _ => f.write_str(&self.address),
        }
    }
}

/// Lifecycle states of a printer session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// Link is up and idle.
    Connected,
    /// A print job currently owns the link.
    Printing,
}

/// Paper state reported by the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Ok,
    Out,
    CoverOpen,
    Unknown,
    Disconnected,
}

/// Result of one status query. Never cached beyond the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterStatusSnapshot {
    pub connected: bool,
    pub ready: bool,
    pub paper_status: PaperStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_out: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_open: Option<bool>,
}

impl PrinterStatusSnapshot {
    /// Snapshot reported when no session is active.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ready: false,
            paper_status: PaperStatus::Disconnected,
            paper_out: None,
            cover_open: None,
        }
    }

    /// Snapshot reported when the printer is linked but did not answer.
    pub fn unknown() -> Self {
        Self {
            connected: true,
            ready: false,
            paper_status: PaperStatus::Unknown,
            paper_out: None,
            cover_open: None,
        }
    }
}

/// A printer endpoint found during a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscoveredDevice(pub String);

impl DiscoveredDevice {
    pub fn address(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DiscoveredDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Font size presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Normal,
    Medium,
    Large,
    Xlarge,
}

impl FontSize {
    /// Character (width, height) multipliers.
    pub fn multipliers(&self) -> (u8, u8) {
        match self {
            Self::Small | Self::Normal => (1, 1),
            Self::Medium => (1, 2),
            Self::Large => (2, 2),
            Self::Xlarge => (3, 3),
        }
    }

    /// Small text uses the condensed font instead of a smaller multiplier.
    pub fn condensed_font(&self) -> bool {
        matches!(self, Self::Small)
    }
}

/// Horizontal justification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Supported 1D barcode symbologies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeType {
    #[default]
    #[serde(rename = "CODE128")]
    Code128,
    #[serde(rename = "CODE39")]
    Code39,
    #[serde(rename = "CODE93")]
    Code93,
    #[serde(rename = "CODABAR")]
    Codabar,
    #[serde(rename = "ITF")]
    Itf,
    #[serde(rename = "UPC_A")]
    UpcA,
    #[serde(rename = "UPC_E")]
    UpcE,
    #[serde(rename = "EAN13")]
    Ean13,
    #[serde(rename = "EAN8")]
    Ean8,
}

impl BarcodeType {
    /// Whether the symbology only carries digits.
    pub fn numeric_only(&self) -> bool {
        matches!(
            self,
            Self::UpcA | Self::UpcE | Self::Ean13 | Self::Ean8 | Self::Itf
        )
    }

    /// Name as used by the caller-facing contract.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Code128 => "CODE128",
            Self::Code39 => "CODE39",
            Self::Code93 => "CODE93",
            Self::Codabar => "CODABAR",
            Self::Itf => "ITF",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::Ean13 => "EAN13",
            Self::Ean8 => "EAN8",
        }
    }
}

impl std::str::FromStr for BarcodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CODE128" => Ok(Self::Code128),
            "CODE39" => Ok(Self::Code39),
            "CODE93" => Ok(Self::Code93),
            "CODABAR" => Ok(Self::Codabar),
            "ITF" => Ok(Self::Itf),
            "UPC_A" => Ok(Self::UpcA),
            "UPC_E" => Ok(Self::UpcE),
            "EAN13" => Ok(Self::Ean13),
            "EAN8" => Ok(Self::Ean8),
            other => Err(format!("unknown barcode type {other}")),
        }
    }
}

/// Options for a text job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextOptions {
    pub text: String,
    pub font_size: FontSize,
    pub alignment: Alignment,
    pub bold: bool,
    /// Absolute horizontal position in dots from the left margin.
    pub horizontal_position: Option<u16>,
    /// Dots of paper to feed before the text.
    pub vertical_position: Option<u16>,
}

impl TextOptions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: FontSize::default(),
            alignment: Alignment::default(),
            bold: false,
            horizontal_position: None,
            vertical_position: None,
        }
    }
}

/// Options for a barcode job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeOptions {
    pub data: String,
    pub barcode_type: BarcodeType,
    /// Narrow module width in dots.
    pub width: u8,
    /// Bar height in dots.
    pub height: u8,
    pub horizontal_position: Option<u16>,
    pub vertical_position: Option<u16>,
    /// Print the human-readable interpretation below the bars.
    pub hri: bool,
}

impl BarcodeOptions {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            barcode_type: BarcodeType::default(),
            width: DEFAULT_BARCODE_WIDTH,
            height: DEFAULT_BARCODE_HEIGHT,
            horizontal_position: None,
            vertical_position: None,
            hri: false,
        }
    }
}

/// Options for a PDF job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfOptions {
    /// Base64-encoded PDF document.
    pub base64: String,
    /// Target raster width in dots.
    pub width: u32,
    pub horizontal_position: Option<u16>,
    pub vertical_position: Option<u16>,
    /// 1-based page number.
    pub page: u32,
    pub dithering: bool,
    /// Collapse blank raster rows into paper feeds.
    pub compress: bool,
    /// Binarisation level: 0 = automatic, 1-100 = fixed threshold percentage.
    pub level: u8,
}

impl PdfOptions {
    pub fn new(base64: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
            width: DEFAULT_PDF_WIDTH,
            horizontal_position: None,
            vertical_position: None,
            page: 1,
            dithering: true,
            compress: true,
            level: 0,
        }
    }
}

/// One requested print operation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintJob {
    Text(TextOptions),
    Barcode(BarcodeOptions),
    Pdf(PdfOptions),
}

impl PrintJob {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Barcode(_) => "barcode",
            Self::Pdf(_) => "pdf",
        }
    }
}

/// Encoder output: printer command bytes plus their SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedJob {
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`, for log correlation.
    pub digest: String,
}

/// The one logical connection owned by a session coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterSession {
    pub id: SessionId,
    pub state: ConnectionState,
    pub endpoint: Endpoint,
    pub connected_at: DateTime<Utc>,
    /// Last status read on this session. Diagnostic only; never served as a
    /// fresh status.
    pub last_status: Option<PrinterStatusSnapshot>,
}

impl PrinterSession {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            id: SessionId::new(),
            state: ConnectionState::Connected,
            endpoint,
            connected_at: Utc::now(),
            last_status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcode_type_uses_contract_names() {
        let json = serde_json::to_string(&BarcodeType::UpcA).unwrap();
        assert_eq!(json, "\"UPC_A\"");
        let parsed: BarcodeType = serde_json::from_str("\"EAN13\"").unwrap();
        assert_eq!(parsed, BarcodeType::Ean13);
        assert_eq!("code39".parse::<BarcodeType>().unwrap(), BarcodeType::Code39);
        assert!("QR".parse::<BarcodeType>().is_err());
    }

    #[test]
    fn paper_status_serialises_snake_case() {
        let snapshot = PrinterStatusSnapshot {
            connected: true,
            ready: false,
            paper_status: PaperStatus::CoverOpen,
            paper_out: Some(false),
            cover_open: Some(true),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["paperStatus"], "cover_open");
        assert_eq!(json["coverOpen"], true);
        assert_eq!(json["paperOut"], false);
    }

    #[test]
    fn disconnected_snapshot_omits_flags() {
        let json = serde_json::to_value(PrinterStatusSnapshot::disconnected()).unwrap();
        assert_eq!(json["paperStatus"], "disconnected");
        assert!(json.get("paperOut").is_none());
    }

    #[test]
    fn endpoint_display_includes_port_for_network_only() {
        let net = Endpoint {
            kind: TransportKind::Network,
            address: "192.168.1.50".into(),
            port: Some(9100),
        };
        assert_eq!(net.to_string(), "192.168.1.50:9100");

        let bt = Endpoint {
            kind: TransportKind::Bluetooth,
            address: "/dev/rfcomm0".into(),
            port: Some(9100),
        };
        assert_eq!(bt.to_string(), "/dev/rfcomm0");
    }

    #[test]
    fn font_size_multipliers() {
        assert_eq!(FontSize::Normal.multipliers(), (1, 1));
        assert_eq!(FontSize::Medium.multipliers(), (1, 2));
        assert_eq!(FontSize::Xlarge.multipliers(), (3, 3));
        assert!(FontSize::Small.condensed_font());
        assert!(!FontSize::Large.condensed_font());
    }

    #[test]
    fn pdf_defaults() {
        let opts = PdfOptions::new("JVBERi0=");
        assert_eq!(opts.width, 576);
        assert_eq!(opts.page, 1);
        assert!(opts.dithering);
        assert!(opts.compress);
        assert_eq!(opts.level, 0);
    }
}
