// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connection manager: owns the single live transport and the session
// record that describes it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use bonwerk_core::error::{BonwerkError, Result};
use bonwerk_core::{ConnectionState, Endpoint, PrinterSession, PrinterStatusSnapshot};

use crate::transport::{Connector, Transport};

struct ActiveLink {
    session: PrinterSession,
    transport: Box<dyn Transport>,
}

/// Establishes, holds and releases the link to one printer.
///
/// Not synchronised itself: the session coordinator keeps it behind its
/// exclusivity gate.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    active: Option<ActiveLink>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            active: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    pub fn session(&self) -> Option<&PrinterSession> {
        self.active.as_ref().map(|link| &link.session)
    }

    pub fn state(&self) -> ConnectionState {
        self.session()
            .map(|s| s.state)
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub fn set_state(&mut self, state: ConnectionState) {
        if let Some(link) = self.active.as_mut() {
            link.session.state = state;
        }
    }

    pub fn record_status(&mut self, snapshot: PrinterStatusSnapshot) {
        if let Some(link) = self.active.as_mut() {
            link.session.last_status = Some(snapshot);
        }
    }

    /// Open a link to `endpoint` within `timeout`.
    ///
    /// A timed-out attempt is dropped before the error is returned, so no
    /// half-open handle survives.
    #[instrument(skip(self, endpoint), fields(endpoint = %endpoint))]
    pub async fn connect(&mut self, endpoint: Endpoint, timeout: Duration) -> Result<&PrinterSession> {
        if self.active.is_some() {
            return Err(BonwerkError::AlreadyConnected);
        }
        if endpoint.address.trim().is_empty() {
            return Err(BonwerkError::InvalidAddress("address is empty".into()));
        }

        let transport = tokio::time::timeout(timeout, self.connector.open(&endpoint))
            .await
            .map_err(|_| {
                BonwerkError::TransportUnreachable(format!(
                    "{endpoint} did not respond within {}ms",
                    timeout.as_millis()
                ))
            })??;

        let session = PrinterSession::new(endpoint);
        info!(session = %session.id, kind = %transport.kind(), "printer connected");
        let link = self.active.insert(ActiveLink { session, transport });
        Ok(&link.session)
    }

    /// Release the link. Calling this without a link is a no-op.
    pub async fn disconnect(&mut self) {
        let Some(mut link) = self.active.take() else {
            return;
        };
        if let Err(e) = link.transport.close().await {
            warn!(session = %link.session.id, error = %e, "transport close reported an error");
        }
        info!(session = %link.session.id, endpoint = %link.session.endpoint, "printer disconnected");
    }

    /// Send bytes to the printer. A failed write drops the link.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let link = self.active.as_mut().ok_or(BonwerkError::NotConnected)?;
        let result = link.transport.write_all(bytes).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(session = %link.session.id, error = %e, "write failed, dropping link");
                self.disconnect().await;
                Err(match e {
                    BonwerkError::TransportWriteFailure(_) => e,
                    other => BonwerkError::TransportWriteFailure(other.to_string()),
                })
            }
        }
    }

    /// Read a reply, waiting at most `timeout`. `Ok(0)` means silence.
    /// A read that finds the link dead drops it, as a failed write does.
    pub async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let link = self.active.as_mut().ok_or(BonwerkError::NotConnected)?;
        match link.transport.read(buf, timeout).await {
            Err(e) if e.tears_down_session() => {
                warn!(session = %link.session.id, error = %e, "link lost while reading, dropping it");
                self.disconnect().await;
                Err(e)
            }
            other => other,
        }
    }
}
