// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Real-time printer status via DLE EOT.
//
// n = 2 reports the offline cause, n = 4 the roll paper sensor. Each reply is
// a single byte shaped 0xx1xx10b; anything else is treated as no reply.

use std::time::Duration;

use tracing::debug;

use bonwerk_core::error::Result;
use bonwerk_core::{PaperStatus, PrinterStatusSnapshot};
use bonwerk_escpos::commands::status_request;

use crate::connection::ConnectionManager;

const OFFLINE_CAUSE: u8 = 2;
const PAPER_SENSOR: u8 = 4;

const COVER_OPEN: u8 = 0x04;
const STOPPED_PAPER_END: u8 = 0x20;
const ERROR_OCCURRED: u8 = 0x40;
const PAPER_END: u8 = 0x60;

/// Reads spent discarding leftovers before a request.
const MAX_DRAIN_READS: usize = 8;

fn is_status_byte(b: u8) -> bool {
    b & 0x93 == 0x12
}

/// Build a snapshot from the two status replies, either of which may be
/// missing.
pub fn parse_status(offline: Option<u8>, paper: Option<u8>) -> PrinterStatusSnapshot {
    let offline = offline.filter(|&b| is_status_byte(b));
    let paper = paper.filter(|&b| is_status_byte(b));
    if offline.is_none() && paper.is_none() {
        return PrinterStatusSnapshot::unknown();
    }

    let cover_open = offline.map(|b| b & COVER_OPEN != 0);
    let error = offline.is_some_and(|b| b & ERROR_OCCURRED != 0);
    let paper_out = paper.is_some_and(|b| b & PAPER_END != 0)
        || offline.is_some_and(|b| b & STOPPED_PAPER_END != 0);

    let paper_status = if paper_out {
        PaperStatus::Out
    } else if cover_open == Some(true) {
        PaperStatus::CoverOpen
    } else {
        PaperStatus::Ok
    };

    // Without both replies we cannot vouch for the printer.
    let ready = offline.is_some() && paper.is_some() && !paper_out && cover_open == Some(false) && !error;

    PrinterStatusSnapshot {
        connected: true,
        ready,
        paper_status,
        paper_out: Some(paper_out),
        cover_open,
    }
}

/// Ask the printer for its current state. Never served from cache.
pub async fn query_status(
    conn: &mut ConnectionManager,
    timeout: Duration,
) -> Result<PrinterStatusSnapshot> {
    let offline = request_byte(conn, OFFLINE_CAUSE, timeout).await?;
    let paper = request_byte(conn, PAPER_SENSOR, timeout).await?;
    let snapshot = parse_status(offline, paper);
    debug!(?offline, ?paper, ready = snapshot.ready, "printer status read");
    conn.record_status(snapshot.clone());
    Ok(snapshot)
}

async fn request_byte(
    conn: &mut ConnectionManager,
    n: u8,
    timeout: Duration,
) -> Result<Option<u8>> {
    drain_stale(conn).await?;
    conn.send(&status_request(n)).await?;
    let mut buf = [0u8; 1];
    let read = conn.receive(&mut buf, timeout).await?;
    Ok((read == 1).then_some(buf[0]))
}

/// Discard replies that arrived after an earlier query gave up on them, so
/// they are not read as the answer to the next request.
async fn drain_stale(conn: &mut ConnectionManager) -> Result<()> {
    let mut stale = [0u8; 16];
    for _ in 0..MAX_DRAIN_READS {
        let n = conn.receive(&mut stale, Duration::ZERO).await?;
        if n == 0 {
            break;
        }
        debug!(bytes = n, "discarded late status reply");
    }
    Ok(())
}
