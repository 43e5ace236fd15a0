// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bluetooth SPP transport.
//
// The OS exposes a paired RFCOMM channel as a serial device (`/dev/rfcommN`,
// `COMn`). `serialport` is blocking, so every operation runs on tokio's
// blocking pool with the port moved in and handed back.

use std::io::{Read, Write};
use std::time::Duration;

use async_trait::async_trait;
use serialport::SerialPort;
use tracing::{debug, info};

use bonwerk_core::TransportKind;
use bonwerk_core::error::{BonwerkError, Result};

use super::Transport;

/// Read timeout used while opening; status reads set their own.
const OPEN_TIMEOUT: Duration = Duration::from_millis(500);

pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    path: String,
    chunk_size: usize,
}

impl SerialTransport {
    pub async fn open(path: &str, baud_rate: u32, chunk_size: usize) -> Result<Self> {
        info!(path, baud_rate, "opening serial port");
        let owned = path.to_owned();
        let port = tokio::task::spawn_blocking(move || {
            serialport::new(&owned, baud_rate).timeout(OPEN_TIMEOUT).open()
        })
        .await
        .map_err(|e| BonwerkError::TransportUnreachable(format!("{path}: {e}")))?
        .map_err(|e| serial_open_error(path, e))?;

        Ok(Self {
            port: Some(port),
            path: path.to_owned(),
            chunk_size: chunk_size.max(1),
        })
    }

    fn take_port(&mut self) -> Result<Box<dyn SerialPort>> {
        self.port
            .take()
            .ok_or_else(|| BonwerkError::TransportWriteFailure(format!("{} is closed", self.path)))
    }
}

fn serial_open_error(path: &str, err: serialport::Error) -> BonwerkError {
    match err.kind() {
        serialport::ErrorKind::NoDevice => {
            BonwerkError::TransportUnreachable(format!("{path}: no such device"))
        }
        serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
            BonwerkError::TransportRefused(format!("{path}: {err}"))
        }
        _ => BonwerkError::TransportUnreachable(format!("{path}: {err}")),
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Bluetooth
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut port = self.take_port()?;
        let data = data.to_vec();
        let chunk_size = self.chunk_size;

        let (port, result) = tokio::task::spawn_blocking(move || {
            let result = data
                .chunks(chunk_size)
                .try_for_each(|chunk| port.write_all(chunk))
                .and_then(|_| port.flush());
            (port, result)
        })
        .await
        .map_err(|e| BonwerkError::TransportWriteFailure(format!("{}: {e}", self.path)))?;

        self.port = Some(port);
        result.map_err(|e| BonwerkError::TransportWriteFailure(format!("{}: {e}", self.path)))?;
        debug!(path = %self.path, "serial write complete");
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let mut port = self.take_port()?;
        let len = buf.len();

        let (port, result) = tokio::task::spawn_blocking(move || {
            let mut scratch = vec![0u8; len];
            let result = port
                .set_timeout(timeout)
                .map_err(std::io::Error::from)
                .and_then(|_| port.read(&mut scratch))
                .map(|n| scratch[..n].to_vec());
            (port, result)
        })
        .await
        .map_err(|e| BonwerkError::TransportUnreachable(format!("{}: {e}", self.path)))?;

        self.port = Some(port);
        match result {
            Ok(bytes) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(BonwerkError::TransportUnreachable(format!("{}: {e}", self.path))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            info!(path = %self.path, "serial port closed");
        }
        Ok(())
    }
}
