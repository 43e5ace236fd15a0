// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bonwerk Print: printer transports, the single-link connection manager,
// mDNS discovery, live status queries and the session coordinator that ties
// them to the command encoder in `bonwerk-escpos`.

pub mod connection;
pub mod discovery;
pub mod session;
pub mod status;
pub mod transport;

pub use connection::ConnectionManager;
pub use discovery::{BrowseSession, DiscoveryScanner, MdnsBrowser, ServiceBrowser};
pub use session::SessionCoordinator;
pub use status::parse_status;
pub use transport::{Connector, SystemConnector, Transport};
