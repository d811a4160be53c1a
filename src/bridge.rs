//! Composition root.
//!
//! [`Bridge`] owns the notification gate, both sessions and the event
//! router, registers the router with the radio once, and serves the peer's
//! reads, writes and subscriptions.
//!
//! The radio only holds a weak reference to the router, so dropping the
//! bridge tears the sessions down; later driver events are discarded.

use crate::error::BridgeError;
use crate::gatt::codec::{decode_write, encode_ap_count};
use crate::gatt::{
    read_at, ApParameters, AttributeKind, AttributeNotifier, NotificationGate, WriteRequest,
};
use crate::storage::CredentialStore;
use crate::wifi::{
    ConnectionSession, EventSink, NetEvent, NetworkEventRouter, ScanSession, WifiRadio,
};
use log::{debug, info, warn};
use std::sync::{Arc, Weak};
use zeroize::Zeroizing;

/// The WiFi provisioning bridge.
pub struct Bridge {
    gate: Arc<NotificationGate>,
    scan: Arc<ScanSession>,
    connection: Arc<ConnectionSession>,
    router: Arc<NetworkEventRouter>,
}

impl Bridge {
    /// Build both sessions, load the stored AP parameters and register for
    /// driver events.
    pub fn new(
        radio: Arc<dyn WifiRadio>,
        store: CredentialStore,
        notifier: Arc<dyn AttributeNotifier>,
    ) -> Result<Self, BridgeError> {
        let gate = Arc::new(NotificationGate::new());
        let scan = Arc::new(ScanSession::new(
            radio.clone(),
            gate.clone(),
            notifier.clone(),
        ));
        let connection = Arc::new(ConnectionSession::new(
            radio.clone(),
            store,
            gate.clone(),
            notifier,
        ));
        let router = Arc::new(NetworkEventRouter::new(scan.clone(), connection.clone()));

        let weak: Weak<NetworkEventRouter> = Arc::downgrade(&router);
        let sink: EventSink = Arc::new(move |event: NetEvent| match weak.upgrade() {
            Some(router) => router.dispatch(event),
            None => debug!("Bridge gone, dropping {:?}", event),
        });
        radio.register_events(sink)?;
        info!("Bridge ready");

        Ok(Self {
            gate,
            scan,
            connection,
            router,
        })
    }

    /// Serve a (possibly partial) read of `kind`.
    pub fn read(
        &self,
        kind: AttributeKind,
        offset: usize,
        len: usize,
    ) -> Result<Vec<u8>, BridgeError> {
        match kind {
            AttributeKind::ScanMode => serve(&self.scan.mode().encode(), offset, len),
            AttributeKind::ApCount => serve(&encode_ap_count(self.scan.ap_count()), offset, len),
            AttributeKind::ApDetails => serve(&self.scan.encoded_details(), offset, len),
            AttributeKind::ConnectionState => {
                serve(&self.connection.state().encode(), offset, len)
            }
            AttributeKind::ApParameters => {
                let value = Zeroizing::new(self.connection.encoded_ap_parameters());
                serve(&value[..], offset, len)
            }
        }
    }

    /// Apply a peer write to `kind`. Returns the number of bytes accepted.
    pub fn write(
        &self,
        kind: AttributeKind,
        offset: usize,
        data: &[u8],
    ) -> Result<usize, BridgeError> {
        if !kind.is_writable() {
            warn!("Rejected write to read-only {}", kind);
            return Err(BridgeError::WriteNotPermitted);
        }

        let request = decode_write(kind, offset, data).map_err(|e| {
            warn!("Rejected write to {}: {}", kind, e);
            BridgeError::from(e)
        })?;

        let result = match request {
            WriteRequest::StartScan => self.scan.start_scan(),
            WriteRequest::Connect => self.connection.request_connect(),
            WriteRequest::Disconnect => self.connection.request_disconnect(),
            WriteRequest::ApParameters(bytes) => self.connection.set_ap_parameters(bytes),
        };

        match result {
            Ok(()) => Ok(data.len()),
            Err(e) => {
                warn!("Write to {} failed: {}", kind, e);
                Err(e)
            }
        }
    }

    /// Record a peer (un)subscribing from notifications of `kind`.
    ///
    /// Returns `false` if `kind` does not support notifications.
    pub fn set_subscribed(&self, kind: AttributeKind, enabled: bool) -> bool {
        let accepted = self.gate.set(kind, enabled);
        if accepted {
            info!(
                "Notifications for {} {}",
                kind,
                if enabled { "enabled" } else { "disabled" }
            );
        }
        accepted
    }

    /// Run `f` with the current AP parameters.
    ///
    /// Holds the connection session lock for the duration of `f`.
    pub fn with_ap_parameters<R>(&self, f: impl FnOnce(&ApParameters) -> R) -> R {
        self.connection.with_ap_parameters(f)
    }

    pub fn scan(&self) -> &ScanSession {
        &self.scan
    }

    pub fn connection(&self) -> &ConnectionSession {
        &self.connection
    }

    pub fn router(&self) -> &NetworkEventRouter {
        &self.router
    }
}

fn serve(value: &[u8], offset: usize, len: usize) -> Result<Vec<u8>, BridgeError> {
    Ok(read_at(value, offset, len)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{
        APP_ERR_INVALID_SECURITY, ATT_ERR_INVALID_LENGTH, ATT_ERR_INVALID_OFFSET,
        ATT_ERR_IN_PROGRESS, ATT_ERR_VALUE_NOT_ALLOWED, ATT_ERR_WRITE_NOT_PERMITTED,
    };
    use crate::gatt::codec::{CMD_CONNECT, CMD_DISCONNECT, START_SCAN};
    use crate::gatt::records::{
        decode_ap_details, encode_ap_details, AP_DETAILS_LEN, AP_DETAILS_MAX_LEN,
        AP_PARAMETERS_LEN,
    };
    use crate::gatt::{ConnectionState, ScanMode, Security, Ssid};
    use crate::storage::MemorySettings;
    use crate::test_support::{MockRadio, RecordingNotifier};
    use crate::wifi::{Band, DriverSecurity, ScanResult};
    use std::sync::atomic::Ordering;
    use std::thread;

    struct Fixture {
        radio: Arc<MockRadio>,
        notifier: Arc<RecordingNotifier>,
        bridge: Bridge,
    }

    fn fixture() -> Fixture {
        let radio = MockRadio::new();
        let notifier = RecordingNotifier::new();
        let store = CredentialStore::new(Box::new(Arc::new(MemorySettings::new())));
        let bridge = Bridge::new(radio.clone(), store, notifier.clone()).unwrap();
        Fixture {
            radio,
            notifier,
            bridge,
        }
    }

    fn found(ssid: &str, security: DriverSecurity) -> NetEvent {
        NetEvent::ScanResult(ScanResult {
            ssid: Ssid::new(ssid.as_bytes()).unwrap(),
            channel: 11,
            band: Band::Ghz2_4,
            rssi: -61,
            security,
        })
    }

    #[test]
    fn test_registers_for_events() {
        let f = fixture();
        assert!(f.radio.sink.lock().unwrap().is_some());
    }

    #[test]
    fn test_scan_scenario() {
        let f = fixture();
        assert_eq!(f.bridge.read(AttributeKind::ScanMode, 0, 1).unwrap(), vec![0]);
        assert!(f.bridge.set_subscribed(AttributeKind::ScanMode, true));

        assert_eq!(f.bridge.write(AttributeKind::ScanMode, 0, &[START_SCAN]).unwrap(), 1);
        assert_eq!(f.bridge.scan().mode(), ScanMode::Running);
        assert_eq!(f.radio.scans.load(Ordering::SeqCst), 1);

        f.radio.emit(found("Net1", DriverSecurity::Psk));
        f.radio.emit(found("Net2", DriverSecurity::None));
        f.radio.emit(found("Net3", DriverSecurity::Psk));
        assert_eq!(f.bridge.read(AttributeKind::ApCount, 0, 1).unwrap(), vec![3]);

        f.radio.emit(NetEvent::ScanDone { status: 0 });
        assert_eq!(f.bridge.read(AttributeKind::ScanMode, 0, 1).unwrap(), vec![2]);
        assert_eq!(f.notifier.sent(), vec![(AttributeKind::ScanMode, vec![2])]);
    }

    #[test]
    fn test_ap_details_read_in_fragments() {
        let f = fixture();
        f.bridge.write(AttributeKind::ScanMode, 0, &[START_SCAN]).unwrap();
        f.radio.emit(found("Net1", DriverSecurity::Psk));
        f.radio.emit(found("Net2", DriverSecurity::None));
        f.radio.emit(NetEvent::ScanDone { status: 0 });

        // Peers read long values in MTU-sized pieces
        let mut value = Vec::new();
        while value.len() < AP_DETAILS_LEN {
            let piece = f.bridge.read(AttributeKind::ApDetails, value.len(), 22).unwrap();
            assert!(!piece.is_empty());
            value.extend_from_slice(&piece);
        }
        assert_eq!(value.len(), AP_DETAILS_LEN);
        assert!(f
            .bridge
            .read(AttributeKind::ApDetails, AP_DETAILS_LEN, 22)
            .unwrap()
            .is_empty());

        let details = decode_ap_details(&value, 2).unwrap();
        assert_eq!(details[0].ssid.as_bytes(), b"Net1");
        assert_eq!(details[0].security, Security::Wpa);
        assert_eq!(details[1].ssid.as_bytes(), b"Net2");
        assert_eq!(details[1].rssi, -61);
    }

    #[test]
    fn test_second_scan_is_busy() {
        let f = fixture();
        f.bridge.write(AttributeKind::ScanMode, 0, &[START_SCAN]).unwrap();
        let err = f
            .bridge
            .write(AttributeKind::ScanMode, 0, &[START_SCAN])
            .unwrap_err();
        assert_eq!(err.att_code(), ATT_ERR_IN_PROGRESS);
    }

    #[test]
    fn test_connect_scenario() {
        let f = fixture();
        let params = ApParameters::new(b"Home", Security::Wpa, b"secret123").unwrap();
        assert_eq!(
            f.bridge
                .write(AttributeKind::ApParameters, 0, params.as_bytes())
                .unwrap(),
            AP_PARAMETERS_LEN
        );
        f.bridge.set_subscribed(AttributeKind::ConnectionState, true);

        f.bridge
            .write(AttributeKind::ConnectionState, 0, &[CMD_CONNECT])
            .unwrap();
        assert_eq!(
            f.bridge.read(AttributeKind::ConnectionState, 0, 1).unwrap(),
            vec![ConnectionState::Connecting.as_byte()]
        );
        let connect = f.radio.last_connect().unwrap();
        assert_eq!(connect.security, DriverSecurity::Psk);
        assert_eq!(connect.psk.as_deref(), Some(&b"secret123"[..]));
        // Write-driven transitions do not notify
        assert!(f.notifier.sent().is_empty());

        f.radio.emit(NetEvent::ConnectResult { status: 0 });
        assert_eq!(f.bridge.connection().state(), ConnectionState::Connected);
        assert_eq!(
            f.notifier.sent(),
            vec![(AttributeKind::ConnectionState, vec![2])]
        );

        f.bridge
            .write(AttributeKind::ConnectionState, 0, &[CMD_DISCONNECT])
            .unwrap();
        f.radio.emit(NetEvent::DisconnectResult { status: 0 });
        assert_eq!(f.bridge.connection().state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_invalid_security_scenario() {
        let f = fixture();
        let mut raw = *ApParameters::new(b"Home", Security::Wpa, b"secret123")
            .unwrap()
            .as_bytes();
        raw[33] = 7;
        f.bridge.write(AttributeKind::ApParameters, 0, &raw).unwrap();

        let err = f
            .bridge
            .write(AttributeKind::ConnectionState, 0, &[CMD_CONNECT])
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidSecurity(7)));
        assert_eq!(err.att_code(), APP_ERR_INVALID_SECURITY);
        assert_eq!(f.radio.connect_count(), 0);
    }

    #[test]
    fn test_ap_parameters_read_back() {
        let f = fixture();
        let params = ApParameters::new(b"Lab", Security::Open, b"").unwrap();
        f.bridge
            .write(AttributeKind::ApParameters, 0, params.as_bytes())
            .unwrap();

        let head = f.bridge.read(AttributeKind::ApParameters, 0, 4).unwrap();
        assert_eq!(head, vec![3, b'L', b'a', b'b']);
        let tail = f.bridge.read(AttributeKind::ApParameters, 90, 64).unwrap();
        assert_eq!(tail.len(), AP_PARAMETERS_LEN - 90);
        f.bridge.with_ap_parameters(|p| assert_eq!(p, &params));
    }

    fn rejection(bridge: &Bridge, kind: AttributeKind, offset: usize, data: &[u8]) -> u8 {
        bridge.write(kind, offset, data).unwrap_err().att_code()
    }

    #[test]
    fn test_rejected_writes() {
        let f = fixture();
        let b = &f.bridge;

        assert_eq!(
            rejection(b, AttributeKind::ApCount, 0, &[1]),
            ATT_ERR_WRITE_NOT_PERMITTED
        );
        assert_eq!(
            rejection(b, AttributeKind::ApDetails, 0, &[1]),
            ATT_ERR_WRITE_NOT_PERMITTED
        );
        assert_eq!(
            rejection(b, AttributeKind::ScanMode, 0, &[0]),
            ATT_ERR_VALUE_NOT_ALLOWED
        );
        assert_eq!(
            rejection(b, AttributeKind::ScanMode, 1, &[1]),
            ATT_ERR_INVALID_OFFSET
        );
        assert_eq!(
            rejection(b, AttributeKind::ScanMode, 0, &[]),
            ATT_ERR_INVALID_LENGTH
        );
        assert_eq!(
            rejection(b, AttributeKind::ConnectionState, 0, &[1, 0]),
            ATT_ERR_INVALID_LENGTH
        );
        assert_eq!(
            rejection(b, AttributeKind::ApParameters, 0, &[0; AP_PARAMETERS_LEN + 1]),
            ATT_ERR_INVALID_LENGTH
        );

        assert_eq!(f.bridge.scan().mode(), ScanMode::Idle);
        assert_eq!(f.radio.scans.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_read_past_end() {
        let f = fixture();
        assert!(f.bridge.read(AttributeKind::ScanMode, 1, 1).unwrap().is_empty());
        let err = f.bridge.read(AttributeKind::ScanMode, 2, 1).unwrap_err();
        assert_eq!(err.att_code(), ATT_ERR_INVALID_OFFSET);
    }

    #[test]
    fn test_subscribe_to_non_notifiable() {
        let f = fixture();
        assert!(!f.bridge.set_subscribed(AttributeKind::ApCount, true));
    }

    #[test]
    fn test_events_after_drop_are_discarded() {
        let f = fixture();
        drop(f.bridge);
        f.radio.emit(NetEvent::ScanDone { status: 0 });
        assert!(f.notifier.sent().is_empty());
    }

    #[test]
    fn test_driver_and_transport_contexts_interleave() {
        const ROUNDS: usize = 200;
        let f = fixture();
        let params = ApParameters::new(b"Home", Security::Wpa, b"secret123").unwrap();
        f.bridge.set_subscribed(AttributeKind::ScanMode, true);
        f.bridge.set_subscribed(AttributeKind::ConnectionState, true);

        thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..ROUNDS {
                    for n in 0..3 {
                        f.radio
                            .emit(found(&format!("Net{}-{}", i, n), DriverSecurity::Psk));
                    }
                    f.radio.emit(NetEvent::ScanDone { status: 0 });
                    f.radio.emit(NetEvent::ConnectResult { status: 0 });
                    f.radio.emit(NetEvent::DisconnectResult { status: 0 });
                }
            });

            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    let _ = f.bridge.write(AttributeKind::ScanMode, 0, &[START_SCAN]);
                    let _ = f.bridge.write(AttributeKind::ConnectionState, 0, &[CMD_CONNECT]);
                    f.bridge
                        .write(AttributeKind::ApParameters, 0, params.as_bytes())
                        .unwrap();

                    let mode = f.bridge.read(AttributeKind::ScanMode, 0, 1).unwrap();
                    ScanMode::from_byte(mode[0]).unwrap();
                    let state = f.bridge.read(AttributeKind::ConnectionState, 0, 1).unwrap();
                    ConnectionState::from_byte(state[0]).unwrap();

                    let count = f.bridge.read(AttributeKind::ApCount, 0, 1).unwrap()[0];
                    assert!(count as usize <= AP_DETAILS_MAX_LEN);
                    let details = f.bridge.scan().ap_details();
                    let encoded = encode_ap_details(&details);
                    assert_eq!(
                        decode_ap_details(&encoded, details.len()).unwrap(),
                        details
                    );
                }
            });
        });

        // Both sessions settle once the driver catches up
        f.radio.emit(NetEvent::ScanDone { status: 0 });
        f.radio.emit(NetEvent::DisconnectResult { status: 0 });
        assert_eq!(f.bridge.scan().mode(), ScanMode::Done);
        assert_eq!(f.bridge.connection().state(), ConnectionState::Disconnected);
        f.bridge.with_ap_parameters(|p| assert_eq!(p, &params));

        // Every notification carried a valid value
        for (kind, value) in f.notifier.sent() {
            assert_eq!(value.len(), 1);
            match kind {
                AttributeKind::ScanMode => assert_eq!(value, vec![ScanMode::Done.as_byte()]),
                AttributeKind::ConnectionState => {
                    ConnectionState::from_byte(value[0]).unwrap();
                }
                other => panic!("Unexpected notification for {}", other),
            }
        }
    }
}
