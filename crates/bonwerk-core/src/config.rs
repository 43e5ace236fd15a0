// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer manager configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BonwerkError, Result};

/// Raw TCP port (HP JetDirect).
pub const DEFAULT_PORT: u16 = 9100;

/// Default raster width in dots (80 mm head at 203 dpi).
pub const DEFAULT_PDF_WIDTH: u32 = 576;

/// Default narrow module width in dots.
pub const DEFAULT_BARCODE_WIDTH: u8 = 2;

/// Default bar height in dots.
pub const DEFAULT_BARCODE_HEIGHT: u8 = 100;

/// Settings shared by every component of a printer manager instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Port used for network printers when the caller omits one.
    pub default_port: u16,
    /// Connect timeout when the caller omits one.
    pub connect_timeout_ms: u64,
    /// Discovery window when the caller omits one.
    pub discovery_timeout_ms: u64,
    /// How long to wait for each status reply byte.
    pub status_timeout_ms: u64,
    /// Baud rate for Bluetooth SPP serial devices.
    pub serial_baud_rate: u32,
    /// Largest single write handed to a transport.
    pub write_chunk_size: usize,
    /// mDNS service types browsed during discovery.
    pub discovery_services: Vec<String>,
    pub default_pdf_width: u32,
    pub default_barcode_width: u8,
    pub default_barcode_height: u8,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            connect_timeout_ms: 5000,
            discovery_timeout_ms: 5000,
            status_timeout_ms: 1000,
            serial_baud_rate: 9600,
            write_chunk_size: 4096,
            discovery_services: vec![
                "_pdl-datastream._tcp.local.".to_string(),
                "_printer._tcp.local.".to_string(),
            ],
            default_pdf_width: DEFAULT_PDF_WIDTH,
            default_barcode_width: DEFAULT_BARCODE_WIDTH,
            default_barcode_height: DEFAULT_BARCODE_HEIGHT,
        }
    }
}

impl PrinterConfig {
    /// Load a configuration file. Missing keys take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject settings no printer session could work with.
    pub fn validate(&self) -> Result<()> {
        if self.write_chunk_size == 0 {
            return Err(BonwerkError::Config("write_chunk_size must be > 0".into()));
        }
        if self.default_pdf_width == 0 {
            return Err(BonwerkError::Config("default_pdf_width must be > 0".into()));
        }
        if self.serial_baud_rate == 0 {
            return Err(BonwerkError::Config("serial_baud_rate must be > 0".into()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = PrinterConfig::default();
        assert_eq!(config.default_port, 9100);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.discovery_timeout(), Duration::from_secs(5));
        assert_eq!(config.default_pdf_width, 576);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "default_port": 9101, "status_timeout_ms": 250 }"#).unwrap();

        let config = PrinterConfig::load(&path).unwrap();
        assert_eq!(config.default_port, 9101);
        assert_eq!(config.status_timeout(), Duration::from_millis(250));
        assert_eq!(config.write_chunk_size, 4096);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = PrinterConfig {
            serial_baud_rate: 115_200,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PrinterConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "write_chunk_size": 0 }"#).unwrap();
        assert!(matches!(
            PrinterConfig::load(&path),
            Err(BonwerkError::Config(_))
        ));
    }

    #[test]
    fn malformed_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PrinterConfig::load(&path),
            Err(BonwerkError::Serialization(_))
        ));
    }
}
