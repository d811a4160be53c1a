//! Simulated WiFi radio for host builds and tests.
//!
//! Requests are queued to a [`SimDriver`] task which answers them after a
//! fixed delay with the events a real driver would report.

use super::events::NetEvent;
use super::radio::{
    Band, ConnectParams, DriverError, DriverSecurity, EventSink, ScanResult, WifiRadio,
};
use crate::gatt::{CodecError, Ssid};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

/// Returned once the driver task has stopped.
pub const SIM_ERR_SHUTDOWN: i32 = -108;
/// Returned when an event sink is already registered.
pub const SIM_ERR_ALREADY: i32 = -114;
/// Connect result status: no network with that SSID.
pub const SIM_STATUS_NOT_FOUND: i32 = -2;
/// Connect result status: wrong passphrase or security type.
pub const SIM_STATUS_AUTH_FAILED: i32 = -13;

/// An access point visible to the simulated radio.
#[derive(Debug, Clone)]
pub struct SimNetwork {
    pub ssid: Ssid,
    pub channel: u8,
    pub rssi: i8,
    pub security: DriverSecurity,
    pub passphrase: Vec<u8>,
}

impl SimNetwork {
    /// Fails if `ssid` does not fit an SSID.
    pub fn new(
        ssid: &str,
        channel: u8,
        rssi: i8,
        security: DriverSecurity,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            ssid: Ssid::new(ssid.as_bytes())?,
            channel,
            rssi,
            security,
            passphrase: Vec::new(),
        })
    }

    pub fn with_passphrase(mut self, passphrase: &str) -> Self {
        self.passphrase = passphrase.as_bytes().to_vec();
        self
    }

    fn band(&self) -> Band {
        if self.channel > 14 {
            Band::Ghz5
        } else {
            Band::Ghz2_4
        }
    }
}

enum SimCommand {
    Scan,
    Connect {
        ssid: Vec<u8>,
        psk: Option<Zeroizing<Vec<u8>>>,
        security: DriverSecurity,
    },
    Disconnect,
}

/// Request side of the simulated radio.
pub struct SimulatedRadio {
    commands: mpsc::UnboundedSender<SimCommand>,
    sink: Arc<OnceLock<EventSink>>,
    interface: AtomicBool,
}

impl SimulatedRadio {
    /// Create the radio and the driver task that serves it.
    pub fn new(networks: Vec<SimNetwork>, delay: Duration) -> (Arc<Self>, SimDriver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(OnceLock::new());
        let radio = Arc::new(Self {
            commands: tx,
            sink: sink.clone(),
            interface: AtomicBool::new(true),
        });
        let driver = SimDriver {
            commands: rx,
            sink,
            networks,
            delay,
        };
        (radio, driver)
    }

    /// Add or remove the simulated network interface.
    pub fn set_interface(&self, present: bool) {
        self.interface.store(present, Ordering::SeqCst);
    }

    fn send(&self, command: SimCommand) -> Result<(), DriverError> {
        self.commands
            .send(command)
            .map_err(|_| DriverError(SIM_ERR_SHUTDOWN))
    }
}

impl WifiRadio for SimulatedRadio {
    fn has_interface(&self) -> bool {
        self.interface.load(Ordering::SeqCst)
    }

    fn request_scan(&self) -> Result<(), DriverError> {
        self.send(SimCommand::Scan)
    }

    fn request_connect(&self, params: &ConnectParams<'_>) -> Result<(), DriverError> {
        self.send(SimCommand::Connect {
            ssid: params.ssid.to_vec(),
            psk: params.psk.map(|psk| Zeroizing::new(psk.to_vec())),
            security: params.security,
        })
    }

    fn request_disconnect(&self) -> Result<(), DriverError> {
        self.send(SimCommand::Disconnect)
    }

    fn register_events(&self, sink: EventSink) -> Result<(), DriverError> {
        self.sink
            .set(sink)
            .map_err(|_| DriverError(SIM_ERR_ALREADY))
    }
}

/// Driver task of the simulated radio.
pub struct SimDriver {
    commands: mpsc::UnboundedReceiver<SimCommand>,
    sink: Arc<OnceLock<EventSink>>,
    networks: Vec<SimNetwork>,
    delay: Duration,
}

impl SimDriver {
    /// Serve requests until cancelled or the radio is dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Simulated radio up with {} networks", self.networks.len());
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Simulated radio shutting down");
                    break;
                }

                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("Simulated radio shutting down with a request pending");
                            break;
                        }
                        _ = tokio::time::sleep(self.delay) => self.handle(command),
                    }
                }
            }
        }
    }

    fn handle(&self, command: SimCommand) {
        match command {
            SimCommand::Scan => {
                for network in &self.networks {
                    self.emit(NetEvent::ScanResult(ScanResult {
                        ssid: network.ssid,
                        channel: network.channel,
                        band: network.band(),
                        rssi: network.rssi,
                        security: network.security,
                    }));
                }
                self.emit(NetEvent::ScanDone { status: 0 });
            }
            SimCommand::Connect {
                ssid,
                psk,
                security,
            } => {
                let status = self.authenticate(&ssid, psk.as_deref().map(Vec::as_slice), security);
                self.emit(NetEvent::ConnectResult { status });
            }
            SimCommand::Disconnect => {
                self.emit(NetEvent::DisconnectResult { status: 0 });
            }
        }
    }

    fn authenticate(&self, ssid: &[u8], psk: Option<&[u8]>, security: DriverSecurity) -> i32 {
        let network = match self.networks.iter().find(|n| n.ssid.as_bytes() == ssid) {
            Some(network) => network,
            None => return SIM_STATUS_NOT_FOUND,
        };
        if network.security != security {
            return SIM_STATUS_AUTH_FAILED;
        }
        match security {
            DriverSecurity::None => 0,
            _ if psk == Some(network.passphrase.as_slice()) => 0,
            _ => SIM_STATUS_AUTH_FAILED,
        }
    }

    fn emit(&self, event: NetEvent) {
        match self.sink.get() {
            Some(sink) => sink(event),
            None => warn!("No event sink registered, dropping {:?}", event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::{Channel, ConnectTimeout, MfpPolicy};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn networks() -> Vec<SimNetwork> {
        vec![
            SimNetwork::new("Home", 6, -42, DriverSecurity::Psk)
                .unwrap()
                .with_passphrase("secret123"),
            SimNetwork::new("Cafe", 36, -70, DriverSecurity::None).unwrap(),
        ]
    }

    fn start() -> (Arc<SimulatedRadio>, UnboundedReceiver<NetEvent>, CancellationToken) {
        let (radio, driver) = SimulatedRadio::new(networks(), Duration::ZERO);
        let (tx, rx) = mpsc::unbounded_channel();
        radio
            .register_events(Arc::new(move |event: NetEvent| {
                let _ = tx.send(event);
            }))
            .unwrap();
        let cancel = CancellationToken::new();
        tokio::spawn(driver.run(cancel.clone()));
        (radio, rx, cancel)
    }

    fn connect_params<'a>(
        ssid: &'a [u8],
        psk: Option<&'a [u8]>,
        security: DriverSecurity,
    ) -> ConnectParams<'a> {
        ConnectParams {
            ssid,
            psk,
            security,
            band: Band::Ghz2_4,
            channel: Channel::Any,
            timeout: ConnectTimeout::Forever,
            mfp: MfpPolicy::Optional,
        }
    }

    #[tokio::test]
    async fn test_scan_reports_every_network() {
        let (radio, mut events, cancel) = start();
        radio.request_scan().unwrap();

        let mut found = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                NetEvent::ScanResult(result) => found.push(result),
                NetEvent::ScanDone { status } => {
                    assert_eq!(status, 0);
                    break;
                }
                other => panic!("Unexpected event {:?}", other),
            }
        }
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].ssid.as_bytes(), b"Home");
        assert_eq!(found[1].band, Band::Ghz5);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_connect_outcomes() {
        let (radio, mut events, cancel) = start();

        radio
            .request_connect(&connect_params(b"Home", Some(&b"secret123"[..]), DriverSecurity::Psk))
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            NetEvent::ConnectResult { status: 0 }
        );

        radio
            .request_connect(&connect_params(b"Home", Some(&b"wrong"[..]), DriverSecurity::Psk))
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            NetEvent::ConnectResult {
                status: SIM_STATUS_AUTH_FAILED
            }
        );

        radio
            .request_connect(&connect_params(b"Nowhere", None, DriverSecurity::None))
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            NetEvent::ConnectResult {
                status: SIM_STATUS_NOT_FOUND
            }
        );

        radio.request_disconnect().unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            NetEvent::DisconnectResult { status: 0 }
        );
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_second_sink_rejected() {
        let (radio, _events, cancel) = start();
        let result = radio.register_events(Arc::new(|_: NetEvent| {}));
        assert_eq!(result, Err(DriverError(SIM_ERR_ALREADY)));
        cancel.cancel();
    }

    #[test]
    fn test_oversized_ssid_rejected() {
        let ssid = "x".repeat(33);
        assert!(matches!(
            SimNetwork::new(&ssid, 1, -50, DriverSecurity::None),
            Err(CodecError::SsidTooLong(33))
        ));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_request() {
        let (radio, driver) = SimulatedRadio::new(networks(), Duration::from_secs(3600));
        let (tx, mut events) = mpsc::unbounded_channel();
        radio
            .register_events(Arc::new(move |event: NetEvent| {
                let _ = tx.send(event);
            }))
            .unwrap();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(driver.run(cancel.clone()));

        radio.request_scan().unwrap();
        tokio::task::yield_now().await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("driver kept sleeping after cancel")
            .unwrap();
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_requests_fail_after_shutdown() {
        let (radio, driver) = SimulatedRadio::new(networks(), Duration::ZERO);
        let cancel = CancellationToken::new();
        cancel.cancel();
        driver.run(cancel).await;

        assert_eq!(radio.request_scan(), Err(DriverError(SIM_ERR_SHUTDOWN)));
    }
}
