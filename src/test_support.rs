//! Test doubles for the radio driver and the transport.

use crate::gatt::{AttributeKind, AttributeNotifier};
use crate::wifi::{
    ConnectParams, ConnectTimeout, DriverError, DriverSecurity, EventSink, MfpPolicy, NetEvent,
    WifiRadio,
};
use crate::wifi::{Band, Channel};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Owned copy of a connect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedConnect {
    pub ssid: Vec<u8>,
    pub psk: Option<Vec<u8>>,
    pub security: DriverSecurity,
    pub band: Band,
    pub channel: Channel,
    pub timeout: ConnectTimeout,
    pub mfp: MfpPolicy,
}

/// Radio that records requests and can be told to reject them.
#[derive(Default)]
pub struct MockRadio {
    pub missing_interface: AtomicBool,
    pub reject_with: Mutex<Option<i32>>,
    pub scans: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub connects: Mutex<Vec<RecordedConnect>>,
    pub sink: Mutex<Option<EventSink>>,
}

impl MockRadio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reject(&self, code: i32) {
        *self.reject_with.lock().unwrap() = Some(code);
    }

    pub fn accept(&self) {
        *self.reject_with.lock().unwrap() = None;
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    pub fn last_connect(&self) -> Option<RecordedConnect> {
        self.connects.lock().unwrap().last().cloned()
    }

    /// Deliver an event through the registered sink, as the driver would.
    pub fn emit(&self, event: NetEvent) {
        let sink = self.sink.lock().unwrap().clone().expect("no sink registered");
        sink(event);
    }

    fn outcome(&self) -> Result<(), DriverError> {
        match *self.reject_with.lock().unwrap() {
            Some(code) => Err(DriverError(code)),
            None => Ok(()),
        }
    }
}

impl WifiRadio for MockRadio {
    fn has_interface(&self) -> bool {
        !self.missing_interface.load(Ordering::SeqCst)
    }

    fn request_scan(&self) -> Result<(), DriverError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    fn request_connect(&self, params: &ConnectParams<'_>) -> Result<(), DriverError> {
        self.connects.lock().unwrap().push(RecordedConnect {
            ssid: params.ssid.to_vec(),
            psk: params.psk.map(<[u8]>::to_vec),
            security: params.security,
            band: params.band,
            channel: params.channel,
            timeout: params.timeout,
            mfp: params.mfp,
        });
        self.outcome()
    }

    fn request_disconnect(&self) -> Result<(), DriverError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    fn register_events(&self, sink: EventSink) -> Result<(), DriverError> {
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }
}

/// Transport that records every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(AttributeKind, Vec<u8>)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(AttributeKind, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

impl AttributeNotifier for RecordingNotifier {
    fn notify(&self, kind: AttributeKind, value: &[u8]) {
        self.sent.lock().unwrap().push((kind, value.to_vec()));
    }
}
