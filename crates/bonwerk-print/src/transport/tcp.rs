// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP transport (JetDirect, port 9100).
//
// Open a socket and stream ESC/POS bytes. The same socket carries the
// printer's status replies back to us.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use bonwerk_core::TransportKind;
use bonwerk_core::error::{BonwerkError, Result};

use super::{Transport, open_error};

pub struct TcpTransport {
    stream: TcpStream,
    addr: String,
    chunk_size: usize,
}

impl TcpTransport {
    /// Connect to `host:port`. The caller bounds this with its own timeout.
    pub async fn connect(host: &str, port: u16, chunk_size: usize) -> Result<Self> {
        let addr = format!("{host}:{port}");
        info!(addr = %addr, "connecting via raw TCP");

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| open_error(&addr, e))?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "TCP_NODELAY not applied");
        }

        Ok(Self {
            stream,
            addr,
            chunk_size: chunk_size.max(1),
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Network
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut sent = 0;
        for chunk in data.chunks(self.chunk_size) {
            self.stream.write_all(chunk).await.map_err(|e| {
                BonwerkError::TransportWriteFailure(format!(
                    "{} failed at byte {}: {}",
                    self.addr, sent, e
                ))
            })?;
            sent += chunk.len();
            debug!(sent, total = data.len(), "raw TCP progress");
        }
        self.stream
            .flush()
            .await
            .map_err(|e| BonwerkError::TransportWriteFailure(format!("{} flush: {e}", self.addr)))
    }

    /// End of stream means the printer hung up, which fails like a broken
    /// write so the session is torn down.
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        match tokio::time::timeout(timeout, self.stream.read(buf)).await {
            Ok(Ok(0)) if !buf.is_empty() => Err(BonwerkError::TransportWriteFailure(format!(
                "{} closed the connection",
                self.addr
            ))),
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(BonwerkError::TransportWriteFailure(format!(
                "{} read: {e}",
                self.addr
            ))),
            Err(_) => Ok(0),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.stream.shutdown().await {
            warn!(addr = %self.addr, error = %e, "raw TCP shutdown failed");
            return Err(BonwerkError::Io(e));
        }
        info!(addr = %self.addr, "raw TCP connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn writes_in_chunks_and_reads_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let printer = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = vec![0u8; 10];
            socket.read_exact(&mut received).await.unwrap();
            socket.write_all(&[0x12]).await.unwrap();
            received
        });

        let mut transport = TcpTransport::connect("127.0.0.1", port, 3).await.unwrap();
        transport.write_all(b"0123456789").await.unwrap();

        let mut buf = [0u8; 1];
        let n = transport.read(&mut buf, Duration::from_secs(2)).await.unwrap();
        assert_eq!((n, buf[0]), (1, 0x12));
        assert_eq!(printer.await.unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn silent_peer_reads_zero() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        let mut transport = TcpTransport::connect("127.0.0.1", port, 4096).await.unwrap();
        let mut buf = [0u8; 1];
        let n = transport
            .read(&mut buf, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn peer_hang_up_fails_the_read() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let peer = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut transport = TcpTransport::connect("127.0.0.1", port, 4096).await.unwrap();
        peer.await.unwrap();
        let mut buf = [0u8; 1];
        let result = transport.read(&mut buf, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(BonwerkError::TransportWriteFailure(_))));
    }

    #[tokio::test]
    async fn closed_port_is_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpTransport::connect("127.0.0.1", port, 4096).await;
        assert!(matches!(result, Err(BonwerkError::TransportRefused(_))));
    }
}
