//! Driver event routing.
//!
//! The driver delivers [`NetEvent`]s from its own context. The router hands
//! each one to the session that owns the matching state.

use super::connection::ConnectionSession;
use super::radio::ScanResult;
use super::scan::ScanSession;
use log::debug;
use std::sync::Arc;

/// Asynchronous event reported by the radio driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetEvent {
    /// One network found by the running scan.
    ScanResult(ScanResult),
    /// The scan finished. Zero status means success.
    ScanDone { status: i32 },
    /// Outcome of a connect request.
    ConnectResult { status: i32 },
    /// The link went down, or a disconnect request completed.
    DisconnectResult { status: i32 },
    /// Any other driver event.
    Other { code: u32 },
}

/// Dispatches driver events to the scan and connection sessions.
#[derive(Clone)]
pub struct NetworkEventRouter {
    scan: Arc<ScanSession>,
    connection: Arc<ConnectionSession>,
}

impl NetworkEventRouter {
    pub fn new(scan: Arc<ScanSession>, connection: Arc<ConnectionSession>) -> Self {
        Self { scan, connection }
    }

    pub fn dispatch(&self, event: NetEvent) {
        match event {
            NetEvent::ScanResult(result) => self.scan.on_scan_result(&result),
            NetEvent::ScanDone { status } => self.scan.on_scan_done(status),
            NetEvent::ConnectResult { status } => self.connection.on_connect_result(status),
            NetEvent::DisconnectResult { status } => self.connection.on_disconnect_result(status),
            NetEvent::Other { code } => debug!("Ignoring driver event {:#x}", code),
        }
    }
}
