//! Connection lifecycle.
//!
//! ```text
//! Disconnected --request_connect (accepted)--> Connecting --connect result--> Connected
//! Connecting/Connected --disconnect result--> Disconnected
//! ```
//!
//! Disconnect requests are always forwarded; only the driver's disconnect
//! result moves the state back to `Disconnected`.
//!
//! # Lock Ordering
//!
//! 1. `store` - serialises credential saves
//! 2. `inner` - state and AP parameters
//!
//! Neither lock is held while calling the radio or the notifier.

use super::radio::{
    Band, Channel, ConnectParams, ConnectTimeout, DriverSecurity, MfpPolicy, WifiRadio,
};
use crate::error::BridgeError;
use crate::gatt::records::AP_PARAMETERS_LEN;
use crate::gatt::{ApParameters, AttributeKind, AttributeNotifier, NotificationGate};
use crate::gatt::{ConnectionState, Security};
use crate::storage::CredentialStore;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct ConnectionInner {
    state: ConnectionState,
    ap_parameters: ApParameters,
}

/// Owner of the connection state and the stored AP parameters.
pub struct ConnectionSession {
    inner: Mutex<ConnectionInner>,
    store: Mutex<CredentialStore>,
    radio: Arc<dyn WifiRadio>,
    gate: Arc<NotificationGate>,
    notifier: Arc<dyn AttributeNotifier>,
}

impl ConnectionSession {
    /// Create the session, loading AP parameters from `store`.
    pub fn new(
        radio: Arc<dyn WifiRadio>,
        store: CredentialStore,
        gate: Arc<NotificationGate>,
        notifier: Arc<dyn AttributeNotifier>,
    ) -> Self {
        let ap_parameters = match store.load() {
            Ok(Some(params)) => {
                info!(
                    "Loaded AP parameters for '{}'",
                    String::from_utf8_lossy(params.ssid())
                );
                params
            }
            Ok(None) => {
                debug!("No stored AP parameters");
                ApParameters::default()
            }
            Err(e) => {
                warn!("Failed to load AP parameters: {}", e);
                ApParameters::default()
            }
        };

        Self {
            inner: Mutex::new(ConnectionInner {
                state: ConnectionState::Disconnected,
                ap_parameters,
            }),
            store: Mutex::new(store),
            radio,
            gate,
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect to the access point described by the stored parameters.
    ///
    /// The state moves to `Connecting` before the driver is asked and back
    /// to `Disconnected` if the driver rejects the request.
    pub fn request_connect(&self) -> Result<(), BridgeError> {
        let (params, security) = {
            let mut inner = self.lock();
            if inner.state != ConnectionState::Disconnected {
                return Err(BridgeError::InvalidState);
            }
            let security = match inner.ap_parameters.security() {
                Some(Security::Open) => DriverSecurity::None,
                Some(Security::Wpa) => DriverSecurity::Psk,
                None => {
                    return Err(BridgeError::InvalidSecurity(
                        inner.ap_parameters.security_byte(),
                    ))
                }
            };
            if !self.radio.has_interface() {
                return Err(BridgeError::NoRadio);
            }
            inner.state = ConnectionState::Connecting;
            (inner.ap_parameters.clone(), security)
        };

        let request = ConnectParams {
            ssid: params.ssid(),
            psk: (security != DriverSecurity::None).then(|| params.passphrase()),
            security,
            band: Band::Ghz2_4,
            channel: Channel::Any,
            timeout: ConnectTimeout::Forever,
            mfp: MfpPolicy::Optional,
        };

        info!(
            "Connecting to '{}' ({})",
            String::from_utf8_lossy(request.ssid),
            security
        );
        if let Err(e) = self.radio.request_connect(&request) {
            warn!("Connect request rejected: {}", e);
            let mut inner = self.lock();
            if inner.state == ConnectionState::Connecting {
                inner.state = ConnectionState::Disconnected;
            }
            return Err(BridgeError::Driver(e));
        }
        Ok(())
    }

    /// Ask the driver to drop the link, whatever the current state.
    pub fn request_disconnect(&self) -> Result<(), BridgeError> {
        if !self.radio.has_interface() {
            return Err(BridgeError::NoRadio);
        }
        info!("Disconnect requested");
        self.radio.request_disconnect().map_err(|e| {
            warn!("Disconnect request rejected: {}", e);
            BridgeError::Driver(e)
        })
    }

    /// Driver reported the outcome of a connect request.
    ///
    /// The state becomes `Connected` whatever the status.
    pub fn on_connect_result(&self, status: i32) {
        if status != 0 {
            warn!("Connection request failed ({})", status);
        } else {
            info!("Connected");
        }

        let value = {
            let mut inner = self.lock();
            inner.state = ConnectionState::Connected;
            inner.state.encode()
        };
        self.notify_state(&value);
    }

    /// Driver reported that the link is down.
    pub fn on_disconnect_result(&self, status: i32) {
        let value = {
            let mut inner = self.lock();
            if inner.state == ConnectionState::Connecting {
                info!(
                    "Disconnection request {} ({})",
                    if status != 0 { "failed" } else { "done" },
                    status
                );
            } else {
                info!("Disconnected");
            }
            inner.state = ConnectionState::Disconnected;
            inner.state.encode()
        };
        self.notify_state(&value);
    }

    fn notify_state(&self, value: &[u8]) {
        if self.gate.is_open(AttributeKind::ConnectionState) {
            self.notifier.notify(AttributeKind::ConnectionState, value);
        }
    }

    /// Overwrite the leading bytes of the AP parameters and persist them.
    ///
    /// Runs on the caller's context. The in-memory record stays updated if
    /// the save fails.
    pub fn set_ap_parameters(&self, data: &[u8]) -> Result<(), BridgeError> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);

        // Snapshot under the store lock so the last save always carries the
        // latest record.
        let snapshot = {
            let mut inner = self.lock();
            inner.ap_parameters.overwrite(data)?;
            inner.ap_parameters.clone()
        };
        info!(
            "AP parameters set for '{}'",
            String::from_utf8_lossy(snapshot.ssid())
        );

        store.save(&snapshot).map_err(|e| {
            warn!("Failed to persist AP parameters: {}", e);
            BridgeError::Persist(e)
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Run `f` with the current AP parameters while holding the session lock.
    pub fn with_ap_parameters<R>(&self, f: impl FnOnce(&ApParameters) -> R) -> R {
        f(&self.lock().ap_parameters)
    }

    /// Encoded AP parameters value.
    pub fn encoded_ap_parameters(&self) -> [u8; AP_PARAMETERS_LEN] {
        *self.lock().ap_parameters.as_bytes()
    }
}
