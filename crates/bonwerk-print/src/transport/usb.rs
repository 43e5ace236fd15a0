// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// USB printer-class transport via the kernel's device node (`/dev/usb/lpN`).
//
// The node is opened non-blocking and every read and write runs on tokio's
// blocking pool, polling until it completes or its deadline passes. No
// operation is ever left parked in the kernel, so a printer that never
// answers a status request cannot wedge the writes that follow.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use bonwerk_core::TransportKind;
use bonwerk_core::error::{BonwerkError, Result};

use super::{Transport, open_error};

/// Pause between attempts on a node with nothing to read or no room to write.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A write that makes no progress for this long fails.
const WRITE_STALL: Duration = Duration::from_secs(10);

pub struct UsbTransport {
    file: Arc<File>,
    path: String,
    chunk_size: usize,
}

impl UsbTransport {
    pub async fn open(path: &str, chunk_size: usize) -> Result<Self> {
        info!(path, "opening USB printer device");
        let owned = path.to_owned();
        let file = tokio::task::spawn_blocking(move || open_nonblocking(&owned))
            .await
            .map_err(|e| BonwerkError::TransportUnreachable(format!("{path}: {e}")))?
            .map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => BonwerkError::TransportRefused(format!("{path}: {e}")),
                _ => open_error(path, e),
            })?;

        Ok(Self {
            file: Arc::new(file),
            path: path.to_owned(),
            chunk_size: chunk_size.max(1),
        })
    }
}

fn open_nonblocking(path: &str) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NONBLOCK);
    }
    options.open(path)
}

fn write_polling(mut file: &File, data: &[u8], chunk_size: usize) -> std::io::Result<()> {
    for chunk in data.chunks(chunk_size) {
        let mut remaining = chunk;
        let mut last_progress = Instant::now();
        while !remaining.is_empty() {
            match file.write(remaining) {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        ErrorKind::WriteZero,
                        "device accepted no bytes",
                    ));
                }
                Ok(n) => {
                    remaining = &remaining[n..];
                    last_progress = Instant::now();
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if last_progress.elapsed() >= WRITE_STALL {
                        return Err(std::io::Error::new(
                            ErrorKind::TimedOut,
                            "device stopped accepting data",
                        ));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(e),
            }
        }
    }
    file.flush()
}

/// Poll until the device has something for us or `timeout` passes. An empty
/// result means silence.
fn read_polling(mut file: &File, len: usize, timeout: Duration) -> std::io::Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut scratch = vec![0u8; len];
    loop {
        match file.read(&mut scratch) {
            Ok(n) => {
                scratch.truncate(n);
                return Ok(scratch);
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(Vec::new());
                }
                std::thread::sleep(POLL_INTERVAL.min(deadline - now));
            }
            Err(e) => return Err(e),
        }
    }
}

#[async_trait]
impl Transport for UsbTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Usb
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let file = Arc::clone(&self.file);
        let data = data.to_vec();
        let chunk_size = self.chunk_size;
        let len = data.len();

        tokio::task::spawn_blocking(move || write_polling(&file, &data, chunk_size))
            .await
            .map_err(|e| BonwerkError::TransportWriteFailure(format!("{}: {e}", self.path)))?
            .map_err(|e| BonwerkError::TransportWriteFailure(format!("{}: {e}", self.path)))?;
        debug!(path = %self.path, bytes = len, "USB write complete");
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let file = Arc::clone(&self.file);
        let len = buf.len();

        let bytes = tokio::task::spawn_blocking(move || read_polling(&file, len, timeout))
            .await
            .map_err(|e| BonwerkError::TransportUnreachable(format!("{}: {e}", self.path)))?
            .map_err(|e| BonwerkError::TransportUnreachable(format!("{}: {e}", self.path)))?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    async fn close(&mut self) -> Result<()> {
        info!(path = %self.path, "USB printer device closed");
        Ok(())
    }
}
