// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinator behaviour over scripted links and a silent mDNS segment.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use bonwerk_core::error::Result;
use bonwerk_core::{
    BonwerkError, ConnectionState, Endpoint, PaperStatus, PrinterConfig, TextOptions,
    TransportKind,
};
use bonwerk_print::{BrowseSession, Connector, ServiceBrowser, SessionCoordinator, Transport};

// -- Scripted pieces ---------------------------------------------------------

#[derive(Clone, Copy)]
enum Script {
    /// Log each 4-byte chunk with a per-write id, yielding between chunks.
    Slow,
    /// Fail every write.
    Broken,
    /// Answer DLE EOT 2 with `offline` and DLE EOT 4 with `paper`.
    Status { offline: u8, paper: u8 },
    /// Like `Status`, with a `stale` reply from an earlier query already
    /// waiting on the link.
    Late { stale: u8, offline: u8, paper: u8 },
}

struct ScriptedTransport {
    script: Script,
    writes: Arc<AtomicUsize>,
    chunks: Arc<Mutex<Vec<usize>>>,
    replies: VecDeque<u8>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Network
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self.script {
            Script::Broken => Err(BonwerkError::TransportWriteFailure("cable pulled".into())),
            Script::Slow => {
                let id = self.writes.fetch_add(1, Ordering::SeqCst);
                for _ in data.chunks(4) {
                    self.chunks.lock().unwrap().push(id);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                Ok(())
            }
            Script::Status { offline, paper } | Script::Late { offline, paper, .. } => {
                match data {
                    [0x10, 0x04, 2] => self.replies.push_back(offline),
                    [0x10, 0x04, 4] => self.replies.push_back(paper),
                    _ => {}
                }
                Ok(())
            }
        }
    }

    async fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        match self.replies.pop_front() {
            Some(b) => {
                buf[0] = b;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct ScriptedConnector {
    script: Script,
    writes: Arc<AtomicUsize>,
    chunks: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedConnector {
    fn new(script: Script) -> Self {
        Self {
            script,
            writes: Arc::new(AtomicUsize::new(0)),
            chunks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, _endpoint: &Endpoint) -> Result<Box<dyn Transport>> {
        Ok(Box::new(ScriptedTransport {
            script: self.script,
            writes: Arc::clone(&self.writes),
            chunks: Arc::clone(&self.chunks),
            replies: match self.script {
                Script::Late { stale, .. } => VecDeque::from([stale]),
                _ => VecDeque::new(),
            },
        }))
    }
}

struct SilentBrowser;

struct Listening(#[allow(dead_code)] mpsc::UnboundedSender<String>);

impl BrowseSession for Listening {
    fn stop(self: Box<Self>) {}
}

impl ServiceBrowser for SilentBrowser {
    fn start(
        &self,
        _service_types: &[String],
        found: mpsc::UnboundedSender<String>,
    ) -> Result<Box<dyn BrowseSession>> {
        Ok(Box::new(Listening(found)))
    }
}

struct EchoBrowser(Vec<&'static str>);

impl ServiceBrowser for EchoBrowser {
    fn start(
        &self,
        _service_types: &[String],
        found: mpsc::UnboundedSender<String>,
    ) -> Result<Box<dyn BrowseSession>> {
        for address in &self.0 {
            found.send((*address).to_owned()).unwrap();
        }
        Ok(Box::new(Listening(found)))
    }
}

async fn connected(connector: Arc<ScriptedConnector>) -> SessionCoordinator {
    let coordinator =
        SessionCoordinator::with_parts(PrinterConfig::default(), connector, Arc::new(SilentBrowser));
    coordinator.initialize();
    coordinator
        .connect(Endpoint::network("10.0.0.9", 9100), None)
        .await
        .unwrap();
    coordinator
}

// -- Tests -------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_prints_never_interleave() {
    let connector = Arc::new(ScriptedConnector::new(Script::Slow));
    let chunks = Arc::clone(&connector.chunks);
    let coordinator = Arc::new(connected(connector).await);

    let mut handles = Vec::new();
    for i in 0..4 {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            coordinator
                .print_text(TextOptions::new(format!("receipt number {i} of four")))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let log = chunks.lock().unwrap().clone();
    let mut finished = Vec::new();
    for pair in log.windows(2) {
        if pair[0] != pair[1] {
            assert!(!finished.contains(&pair[1]), "write {} resumed: {log:?}", pair[1]);
            finished.push(pair[0]);
        }
    }
    assert_eq!(coordinator.connection_state(), ConnectionState::Connected);
}

#[tokio::test]
async fn write_failure_tears_session_down() {
    let coordinator = connected(Arc::new(ScriptedConnector::new(Script::Broken))).await;

    let err = coordinator
        .print_text(TextOptions::new("doomed"))
        .await
        .unwrap_err();
    assert!(matches!(err, BonwerkError::TransportWriteFailure(_)));
    assert!(err.tears_down_session());
    assert_eq!(coordinator.connection_state(), ConnectionState::Disconnected);

    assert!(matches!(
        coordinator.print_text(TextOptions::new("again")).await,
        Err(BonwerkError::NotConnected)
    ));
}

#[tokio::test]
async fn status_reports_paper_out() {
    let script = Script::Status {
        offline: 0x12,
        paper: 0x72,
    };
    let coordinator = connected(Arc::new(ScriptedConnector::new(script))).await;

    let status = coordinator.get_status().await.unwrap();
    assert!(status.connected);
    assert!(!status.ready);
    assert_eq!(status.paper_status, PaperStatus::Out);
    assert_eq!(status.paper_out, Some(true));
    assert_eq!(status.cover_open, Some(false));
}

#[tokio::test]
async fn status_from_healthy_printer_is_ready() {
    let script = Script::Status {
        offline: 0x12,
        paper: 0x12,
    };
    let coordinator = connected(Arc::new(ScriptedConnector::new(script))).await;

    let status = coordinator.get_status().await.unwrap();
    assert!(status.ready);
    assert_eq!(status.paper_status, PaperStatus::Ok);
}

#[tokio::test]
async fn late_reply_is_not_taken_for_the_next_answer() {
    let script = Script::Late {
        stale: 0x72,
        offline: 0x12,
        paper: 0x12,
    };
    let coordinator = connected(Arc::new(ScriptedConnector::new(script))).await;

    let status = coordinator.get_status().await.unwrap();
    assert!(status.ready);
    assert_eq!(status.paper_status, PaperStatus::Ok);
}

#[tokio::test]
async fn silent_printer_status_is_unknown() {
    let coordinator = connected(Arc::new(ScriptedConnector::new(Script::Slow))).await;

    let status = coordinator.get_status().await.unwrap();
    assert!(status.connected);
    assert!(!status.ready);
    assert_eq!(status.paper_status, PaperStatus::Unknown);
}

#[tokio::test]
async fn silent_segment_discovers_nothing_quickly() {
    let coordinator = SessionCoordinator::with_parts(
        PrinterConfig::default(),
        Arc::new(ScriptedConnector::new(Script::Slow)),
        Arc::new(SilentBrowser),
    );
    coordinator.initialize();

    let started = std::time::Instant::now();
    let devices = coordinator
        .discover(Some(Duration::from_millis(100)))
        .await
        .unwrap();
    assert!(devices.is_empty());
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn discovery_dedups_in_order() {
    let coordinator = SessionCoordinator::with_parts(
        PrinterConfig::default(),
        Arc::new(ScriptedConnector::new(Script::Slow)),
        Arc::new(EchoBrowser(vec!["192.168.1.20", "192.168.1.7", "192.168.1.20"])),
    );
    coordinator.initialize();

    let devices = coordinator
        .discover(Some(Duration::from_millis(100)))
        .await
        .unwrap();
    let addresses: Vec<&str> = devices.iter().map(|d| d.address()).collect();
    assert_eq!(addresses, ["192.168.1.20", "192.168.1.7"]);
    assert_eq!(coordinator.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn discovery_needs_initialize() {
    let coordinator = SessionCoordinator::with_parts(
        PrinterConfig::default(),
        Arc::new(ScriptedConnector::new(Script::Slow)),
        Arc::new(SilentBrowser),
    );
    assert!(matches!(
        coordinator.discover(Some(Duration::from_millis(10))).await,
        Err(BonwerkError::NotInitialized)
    ));
}
