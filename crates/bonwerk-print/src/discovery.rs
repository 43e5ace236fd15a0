// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded mDNS scan for receipt printers on the local network.
//
// We browse for `_pdl-datastream._tcp.local.` (raw port 9100 printers) and
// `_printer._tcp.local.` (LPD) using the `mdns-sd` crate. A daemon is started
// for each scan and shut down when the scan window closes; nothing keeps
// browsing between calls.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use bonwerk_core::DiscoveredDevice;
use bonwerk_core::error::{BonwerkError, Result};

/// A running browse. Dropping the last sender ends the scan early.
pub trait BrowseSession: Send {
    fn stop(self: Box<Self>);
}

/// Source of resolved printer addresses.
pub trait ServiceBrowser: Send + Sync {
    /// Start browsing `service_types`, pushing each resolved address into
    /// `found` until [`BrowseSession::stop`] is called.
    fn start(
        &self,
        service_types: &[String],
        found: mpsc::UnboundedSender<String>,
    ) -> Result<Box<dyn BrowseSession>>;
}

/// Browses the local segment with a short-lived `mdns-sd` daemon.
#[derive(Debug, Default, Clone, Copy)]
pub struct MdnsBrowser;

struct MdnsSession {
    daemon: ServiceDaemon,
    service_types: Vec<String>,
}

impl ServiceBrowser for MdnsBrowser {
    fn start(
        &self,
        service_types: &[String],
        found: mpsc::UnboundedSender<String>,
    ) -> Result<Box<dyn BrowseSession>> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| BonwerkError::Discovery(format!("failed to start mDNS daemon: {e}")))?;
        let mut session = Box::new(MdnsSession {
            daemon,
            service_types: Vec::with_capacity(service_types.len()),
        });

        for service_type in service_types {
            if let Err(e) = session.browse(service_type, found.clone()) {
                session.stop();
                return Err(e);
            }
        }
        Ok(session)
    }
}

impl MdnsSession {
    fn browse(&mut self, service_type: &str, found: mpsc::UnboundedSender<String>) -> Result<()> {
        let receiver = self
            .daemon
            .browse(service_type)
            .map_err(|e| BonwerkError::Discovery(format!("browse {service_type}: {e}")))?;
        self.service_types.push(service_type.to_owned());
        spawn_listener(service_type.to_owned(), receiver, found)
    }
}

impl BrowseSession for MdnsSession {
    fn stop(self: Box<Self>) {
        for service_type in &self.service_types {
            if let Err(e) = self.daemon.stop_browse(service_type) {
                debug!(service_type = %service_type, error = %e, "stop browse failed");
            }
        }
        if let Err(e) = self.daemon.shutdown() {
            warn!(error = %e, "mDNS daemon shutdown failed");
        }
    }
}

/// Drain one browse receiver on a dedicated thread until the search stops
/// or the daemon goes away.
fn spawn_listener(
    service_type: String,
    receiver: mdns_sd::Receiver<ServiceEvent>,
    found: mpsc::UnboundedSender<String>,
) -> Result<()> {
    std::thread::Builder::new()
        .name(format!("mdns-{service_type}"))
        .spawn(move || {
            while let Ok(event) = receiver.recv() {
                match event {
                    ServiceEvent::SearchStarted(stype) => {
                        debug!(service_type = %stype, "mDNS search started");
                    }
                    ServiceEvent::ServiceFound(stype, fullname) => {
                        debug!(service_type = %stype, name = %fullname, "service found");
                    }
                    ServiceEvent::ServiceResolved(info) => match preferred_address(&info) {
                        Some(ip) => {
                            info!(name = %info.get_fullname(), ip = %ip, "printer resolved");
                            if found.send(ip.to_string()).is_err() {
                                break;
                            }
                        }
                        None => {
                            warn!(name = %info.get_fullname(), "resolved service has no address");
                        }
                    },
                    ServiceEvent::ServiceRemoved(stype, fullname) => {
                        debug!(service_type = %stype, name = %fullname, "service removed");
                    }
                    ServiceEvent::SearchStopped(stype) => {
                        debug!(service_type = %stype, "mDNS search stopped");
                        break;
                    }
                }
            }
        })
        .map(|_| ())
        .map_err(|e| BonwerkError::Discovery(format!("failed to spawn mDNS listener: {e}")))
}

/// Prefer IPv4 for wider printer compatibility.
fn preferred_address(info: &ServiceInfo) -> Option<IpAddr> {
    let addresses = info.get_addresses();
    addresses
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addresses.iter().next())
        .copied()
}

/// Serialised, time-bounded printer discovery.
pub struct DiscoveryScanner {
    browser: Arc<dyn ServiceBrowser>,
    service_types: Vec<String>,
    scan_lock: Mutex<()>,
}

impl DiscoveryScanner {
    pub fn new(browser: Arc<dyn ServiceBrowser>, service_types: Vec<String>) -> Self {
        Self {
            browser,
            service_types,
            scan_lock: Mutex::new(()),
        }
    }

    /// Collect printer addresses for at most `timeout`.
    ///
    /// Results keep discovery order with duplicates removed. Whatever was
    /// found when the window closes is returned; time spent waiting behind
    /// another scan counts against the same window.
    pub async fn discover(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
        let deadline = Instant::now() + timeout;
        let Ok(_guard) = tokio::time::timeout_at(deadline, self.scan_lock.lock()).await else {
            debug!("discovery window closed while waiting for another scan");
            return Ok(Vec::new());
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = self.browser.start(&self.service_types, tx)?;
        info!(timeout_ms = timeout.as_millis() as u64, "printer discovery started");

        let mut seen = HashSet::new();
        let mut devices = Vec::new();
        while let Ok(Some(address)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            if seen.insert(address.clone()) {
                devices.push(DiscoveredDevice(address));
            }
        }

        session.stop();
        info!(found = devices.len(), "printer discovery finished");
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    struct Idle(#[allow(dead_code)] mpsc::UnboundedSender<String>);

    impl BrowseSession for Idle {
        fn stop(self: Box<Self>) {}
    }

    impl ServiceBrowser for Silent {
        fn start(
            &self,
            _service_types: &[String],
            found: mpsc::UnboundedSender<String>,
        ) -> Result<Box<dyn BrowseSession>> {
            Ok(Box::new(Idle(found)))
        }
    }

    #[tokio::test]
    async fn silent_segment_returns_empty_within_window() {
        let scanner = DiscoveryScanner::new(Arc::new(Silent), vec!["_printer._tcp.local.".into()]);
        let started = std::time::Instant::now();
        let devices = scanner.discover(Duration::from_millis(100)).await.unwrap();
        assert!(devices.is_empty());
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn failed_browse_releases_the_daemon() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service_types = vec!["_pdl-datastream._tcp.local.".to_owned(), "bogus".to_owned()];
        let result = MdnsBrowser.start(&service_types, tx);
        assert!(matches!(result, Err(BonwerkError::Discovery(_))));

        // Every listener has exited once the daemon is gone, closing the channel.
        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok());
    }
}
