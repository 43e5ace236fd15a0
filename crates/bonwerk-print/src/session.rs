// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session coordinator: the single entry point that owns the printer link.
//
// Every print and status call passes through one `tokio::sync::Mutex` gate,
// so two jobs never interleave on the wire and waiters are served in arrival
// order. Encoding happens before the gate is taken; PDF rasterisation runs on
// the blocking pool. A cheap state snapshot sits beside the gate so callers
// can read the lifecycle state without queueing behind a print.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use bonwerk_core::error::{BonwerkError, Result};
use bonwerk_core::{
    BarcodeOptions, ConnectionState, DiscoveredDevice, EncodedJob, Endpoint, PdfOptions,
    PrintJob, PrinterConfig, PrinterSession, PrinterStatusSnapshot, TextOptions, TransportKind,
};
use bonwerk_escpos::CommandEncoder;

use crate::connection::ConnectionManager;
use crate::discovery::{DiscoveryScanner, MdnsBrowser, ServiceBrowser};
use crate::status::query_status;
use crate::transport::{Connector, SystemConnector};

pub struct SessionCoordinator {
    config: PrinterConfig,
    encoder: CommandEncoder,
    initialized: AtomicBool,
    state: RwLock<ConnectionState>,
    link: Mutex<ConnectionManager>,
    discovery: DiscoveryScanner,
}

impl SessionCoordinator {
    /// Coordinator backed by real sockets, serial ports and mDNS.
    pub fn new(config: PrinterConfig) -> Self {
        let connector = Arc::new(SystemConnector::new(&config));
        Self::with_parts(config, connector, Arc::new(MdnsBrowser))
    }

    /// Coordinator with caller-supplied link and discovery back ends.
    pub fn with_parts(
        config: PrinterConfig,
        connector: Arc<dyn Connector>,
        browser: Arc<dyn ServiceBrowser>,
    ) -> Self {
        let discovery = DiscoveryScanner::new(browser, config.discovery_services.clone());
        Self {
            config,
            encoder: CommandEncoder::new(),
            initialized: AtomicBool::new(false),
            state: RwLock::new(ConnectionState::Disconnected),
            link: Mutex::new(ConnectionManager::new(connector)),
            discovery,
        }
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// One-time setup. Repeat calls are no-ops.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("printer manager already initialized");
        } else {
            info!("printer manager initialized");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Current lifecycle state without waiting on the gate.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(BonwerkError::NotInitialized)
        }
    }

    // -- Lifecycle -----------------------------------------------------------

    /// Open the session. A missing network port falls back to the configured
    /// default and a missing timeout to `connect_timeout_ms`.
    #[instrument(skip(self, endpoint), fields(endpoint = %endpoint))]
    pub async fn connect(
        &self,
        mut endpoint: Endpoint,
        timeout: Option<Duration>,
    ) -> Result<PrinterSession> {
        self.ensure_initialized()?;
        if endpoint.kind == TransportKind::Network && endpoint.port.is_none() {
            endpoint.port = Some(self.config.default_port);
        }
        let timeout = timeout.unwrap_or_else(|| self.config.connect_timeout());

        let mut link = self.link.lock().await;
        if link.is_connected() {
            return Err(BonwerkError::AlreadyConnected);
        }

        self.set_state(ConnectionState::Connecting);
        match link.connect(endpoint, timeout).await {
            Ok(session) => {
                let session = session.clone();
                self.set_state(ConnectionState::Connected);
                Ok(session)
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                warn!(error = %e, "connect failed");
                Err(e)
            }
        }
    }

    /// Close the session. Succeeds even when nothing is connected.
    pub async fn disconnect(&self) -> Result<()> {
        self.ensure_initialized()?;
        let mut link = self.link.lock().await;
        link.disconnect().await;
        self.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    /// Scan the local network for printers. Never touches the session.
    pub async fn discover(&self, timeout: Option<Duration>) -> Result<Vec<DiscoveredDevice>> {
        self.ensure_initialized()?;
        let timeout = timeout.unwrap_or_else(|| self.config.discovery_timeout());
        self.discovery.discover(timeout).await
    }

    // -- Printing ------------------------------------------------------------

    pub async fn print_text(&self, opts: TextOptions) -> Result<()> {
        self.print(PrintJob::Text(opts)).await
    }

    pub async fn print_barcode(&self, opts: BarcodeOptions) -> Result<()> {
        self.print(PrintJob::Barcode(opts)).await
    }

    pub async fn print_pdf(&self, opts: PdfOptions) -> Result<()> {
        self.print(PrintJob::Pdf(opts)).await
    }

    /// Encode `job` and send it as one uninterrupted write.
    #[instrument(skip(self, job), fields(job = job.kind()))]
    pub async fn print(&self, job: PrintJob) -> Result<()> {
        self.ensure_initialized()?;
        if self.connection_state() == ConnectionState::Disconnected {
            return Err(BonwerkError::NotConnected);
        }

        let encoded = self.encode(job).await?;

        let mut link = self.link.lock().await;
        if !link.is_connected() {
            return Err(BonwerkError::NotConnected);
        }

        link.set_state(ConnectionState::Printing);
        self.set_state(ConnectionState::Printing);
        let result = link.send(&encoded.bytes).await;

        if link.is_connected() {
            link.set_state(ConnectionState::Connected);
            self.set_state(ConnectionState::Connected);
        } else {
            self.set_state(ConnectionState::Disconnected);
        }

        match &result {
            Ok(()) => info!(
                bytes = encoded.bytes.len(),
                digest = %encoded.digest,
                "job sent to printer"
            ),
            Err(e) => warn!(digest = %encoded.digest, error = %e, "job failed"),
        }
        result
    }

    async fn encode(&self, job: PrintJob) -> Result<EncodedJob> {
        let encoder = self.encoder;
        match job {
            PrintJob::Pdf(_) => tokio::task::spawn_blocking(move || encoder.encode(&job))
                .await
                .map_err(|e| BonwerkError::Io(std::io::Error::other(e)))?
                .map_err(BonwerkError::from),
            other => encoder.encode(&other).map_err(BonwerkError::from),
        }
    }

    // -- Status --------------------------------------------------------------

    /// Query the printer live. Without a session this is the disconnected
    /// snapshot rather than an error.
    pub async fn get_status(&self) -> Result<PrinterStatusSnapshot> {
        self.ensure_initialized()?;
        let mut link = self.link.lock().await;
        if !link.is_connected() {
            return Ok(PrinterStatusSnapshot::disconnected());
        }

        let result = query_status(&mut link, self.config.status_timeout()).await;
        if !link.is_connected() {
            self.set_state(ConnectionState::Disconnected);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> SessionCoordinator {
        SessionCoordinator::new(PrinterConfig::default())
    }

    #[tokio::test]
    async fn everything_needs_initialize() {
        let c = coordinator();
        assert!(!c.is_initialized());
        assert!(matches!(
            c.print_text(TextOptions::new("x")).await,
            Err(BonwerkError::NotInitialized)
        ));
        assert!(matches!(c.get_status().await, Err(BonwerkError::NotInitialized)));
        assert!(matches!(c.disconnect().await, Err(BonwerkError::NotInitialized)));
    }

    #[tokio::test]
    async fn initialize_twice_is_harmless() {
        let c = coordinator();
        c.initialize();
        c.initialize();
        assert!(c.is_initialized());
        assert_eq!(c.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn print_before_connect_is_not_connected() {
        let c = coordinator();
        c.initialize();
        assert!(matches!(
            c.print_text(TextOptions::new("Hello")).await,
            Err(BonwerkError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn status_before_connect_is_disconnected_snapshot() {
        let c = coordinator();
        c.initialize();
        assert_eq!(c.get_status().await.unwrap(), PrinterStatusSnapshot::disconnected());
    }
}
