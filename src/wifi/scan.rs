//! Scan lifecycle.
//!
//! ```text
//! Idle/Done --start_scan (accepted)--> Running --scan done--> Done
//! ```
//!
//! A second start while running is rejected as busy. Discoveries are only
//! recorded while running, up to [`AP_DETAILS_MAX_LEN`] per scan.

use super::radio::{DriverSecurity, ScanResult, WifiRadio};
use crate::error::BridgeError;
use crate::gatt::records::{encode_ap_details, AP_DETAILS_LEN, AP_DETAILS_MAX_LEN};
use crate::gatt::{ApDetail, ApDetailList, AttributeKind, AttributeNotifier, NotificationGate};
use crate::gatt::{ScanMode, Security};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct ScanState {
    mode: ScanMode,
    details: ApDetailList,
    /// Results seen during the current scan, including dropped ones.
    seen: usize,
    /// Bumped on every accepted start.
    generation: u64,
}

/// Owner of the scan state.
pub struct ScanSession {
    state: Mutex<ScanState>,
    radio: Arc<dyn WifiRadio>,
    gate: Arc<NotificationGate>,
    notifier: Arc<dyn AttributeNotifier>,
}

impl ScanSession {
    pub fn new(
        radio: Arc<dyn WifiRadio>,
        gate: Arc<NotificationGate>,
        notifier: Arc<dyn AttributeNotifier>,
    ) -> Self {
        Self {
            state: Mutex::new(ScanState::default()),
            radio,
            gate,
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a scan.
    ///
    /// The session enters `Running` before the driver is asked, so a
    /// concurrent start is rejected as busy. If the driver rejects the
    /// request the previous mode and results are restored, discarding any
    /// results that arrived in the meantime.
    pub fn start_scan(&self) -> Result<(), BridgeError> {
        let (generation, previous_mode, previous_details) = {
            let mut state = self.lock();
            if state.mode == ScanMode::Running {
                return Err(BridgeError::Busy);
            }
            if !self.radio.has_interface() {
                return Err(BridgeError::NoRadio);
            }
            let previous_mode = state.mode;
            let previous_details = std::mem::take(&mut state.details);
            state.mode = ScanMode::Running;
            state.seen = 0;
            state.generation = state.generation.wrapping_add(1);
            (state.generation, previous_mode, previous_details)
        };

        info!("Starting WiFi scan");
        if let Err(e) = self.radio.request_scan() {
            warn!("Scan request rejected: {}", e);
            let mut state = self.lock();
            // Only undo this start; a scan done may already have completed it
            if state.mode == ScanMode::Running && state.generation == generation {
                state.mode = previous_mode;
                state.details = previous_details;
            }
            return Err(BridgeError::Driver(e));
        }
        Ok(())
    }

    /// Record a network reported by the driver.
    pub fn on_scan_result(&self, result: &ScanResult) {
        let mut state = self.lock();
        if state.mode != ScanMode::Running {
            debug!("Dropping scan result for '{}': no scan running", result.ssid);
            return;
        }

        if state.seen == 0 {
            info!(
                "{:<4} | {:<32} {:<5} | {:<13} | {:<4} | {:<15}",
                "Num", "SSID", "(len)", "Channel", "RSSI", "Security"
            );
        }
        info!(
            "{:<4} | {:<32} {:<5} | {:<4} ({:<6}) | {:<4} | {:<15}",
            state.seen,
            result.ssid,
            result.ssid.len(),
            result.channel,
            result.band,
            result.rssi,
            result.security
        );
        state.seen += 1;

        let security = match result.security {
            DriverSecurity::None => Security::Open,
            DriverSecurity::Psk => Security::Wpa,
            other => {
                debug!("Skipping '{}': unsupported security {}", result.ssid, other);
                return;
            }
        };

        let detail = ApDetail {
            security,
            rssi: result.rssi,
            ssid: result.ssid,
        };
        if state.details.push(detail).is_err() {
            debug!(
                "Skipping '{}': AP list full ({} entries)",
                result.ssid, AP_DETAILS_MAX_LEN
            );
        }
    }

    /// Complete the scan. Completion happens whatever the status.
    pub fn on_scan_done(&self, status: i32) {
        if status != 0 {
            warn!("Scan request failed ({})", status);
        } else {
            info!("Scan request done");
        }

        let value = {
            let mut state = self.lock();
            state.mode = ScanMode::Done;
            info!("Scan found {} usable access points", state.details.len());
            state.mode.encode()
        };

        if self.gate.is_open(AttributeKind::ScanMode) {
            self.notifier.notify(AttributeKind::ScanMode, &value);
        }
    }

    pub fn mode(&self) -> ScanMode {
        self.lock().mode
    }

    pub fn ap_count(&self) -> usize {
        self.lock().details.len()
    }

    pub fn ap_details(&self) -> ApDetailList {
        self.lock().details.clone()
    }

    /// Encoded AP details value.
    pub fn encoded_details(&self) -> [u8; AP_DETAILS_LEN] {
        encode_ap_details(&self.lock().details)
    }
}
