// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Link-layer transports. One concrete type per `TransportKind`, chosen by a
// `Connector` when a session is opened.

pub mod serial;
pub mod tcp;
pub mod usb;

use std::time::Duration;

use async_trait::async_trait;

use bonwerk_core::error::{BonwerkError, Result};
use bonwerk_core::{Endpoint, PrinterConfig, TransportKind};

pub use serial::SerialTransport;
pub use tcp::TcpTransport;
pub use usb::UsbTransport;

/// A live, bidirectional link to one printer.
#[async_trait]
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    /// Write every byte or fail with `TransportWriteFailure`.
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever the printer has sent, waiting at most `timeout`.
    /// Returns `Ok(0)` when nothing arrived in time.
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Release the link. Errors are informational; the handle is unusable
    /// afterwards either way.
    async fn close(&mut self) -> Result<()>;
}

/// Opens transports. The session core never constructs one directly so
/// tests can substitute scripted links.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Transport>>;
}

/// Opens real sockets, serial devices and device nodes.
#[derive(Debug, Clone)]
pub struct SystemConnector {
    chunk_size: usize,
    baud_rate: u32,
    default_port: u16,
}

impl SystemConnector {
    pub fn new(config: &PrinterConfig) -> Self {
        Self {
            chunk_size: config.write_chunk_size.max(1),
            baud_rate: config.serial_baud_rate,
            default_port: config.default_port,
        }
    }
}

#[async_trait]
impl Connector for SystemConnector {
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Transport>> {
        match endpoint.kind {
            TransportKind::Network => {
                let port = endpoint.port.unwrap_or(self.default_port);
                let transport = TcpTransport::connect(&endpoint.address, port, self.chunk_size).await?;
                Ok(Box::new(transport))
            }
            TransportKind::Bluetooth => {
                let transport =
                    SerialTransport::open(&endpoint.address, self.baud_rate, self.chunk_size).await?;
                Ok(Box::new(transport))
            }
            TransportKind::Usb => {
                let transport = UsbTransport::open(&endpoint.address, self.chunk_size).await?;
                Ok(Box::new(transport))
            }
        }
    }
}

/// Classify an I/O error raised while opening a link.
pub(crate) fn open_error(target: &str, err: std::io::Error) -> BonwerkError {
    match err.kind() {
        std::io::ErrorKind::ConnectionRefused => {
            BonwerkError::TransportRefused(format!("{target}: {err}"))
        }
        _ => BonwerkError::TransportUnreachable(format!("{target}: {err}")),
    }
}
