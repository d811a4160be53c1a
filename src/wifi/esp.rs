//! ESP-IDF WiFi driver adapter.
//!
//! Requests map onto the non-blocking `EspWifi` calls; completions arrive
//! on the system event loop and are forwarded as [`NetEvent`]s.

use super::events::NetEvent;
use super::radio::{
    Band, Channel, ConnectParams, DriverError, DriverSecurity, EventSink, ScanResult, WifiRadio,
};
use crate::gatt::Ssid;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::config::ScanConfig;
use esp_idf_svc::wifi::{
    AccessPointInfo, AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent,
};
use esp_idf_sys::{wifi_err_reason_t_WIFI_REASON_ASSOC_LEAVE, EspError, ESP_ERR_INVALID_ARG};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn driver_error(e: EspError) -> DriverError {
    DriverError(e.code())
}

fn lock_wifi(wifi: &Mutex<EspWifi<'static>>) -> MutexGuard<'_, EspWifi<'static>> {
    wifi.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Station-mode WiFi radio.
pub struct EspRadio {
    wifi: Arc<Mutex<EspWifi<'static>>>,
    sysloop: EspSystemEventLoop,
    subscription: Mutex<Option<EspSubscription<'static, System>>>,
}

impl EspRadio {
    /// Bring up the WiFi driver in station mode.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, EspError> {
        let mut wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
        wifi.start()?;
        info!("WiFi station started");

        Ok(Self {
            wifi: Arc::new(Mutex::new(wifi)),
            sysloop,
            subscription: Mutex::new(None),
        })
    }
}

fn security_of(ap: &AccessPointInfo) -> DriverSecurity {
    match ap.auth_method {
        Some(AuthMethod::None) => DriverSecurity::None,
        Some(AuthMethod::WEP) => DriverSecurity::Wep,
        Some(AuthMethod::WPA) => DriverSecurity::WpaPsk,
        Some(AuthMethod::WPA2Personal | AuthMethod::WPAWPA2Personal) => DriverSecurity::Psk,
        Some(AuthMethod::WPA3Personal | AuthMethod::WPA2WPA3Personal) => DriverSecurity::Sae,
        Some(AuthMethod::WPA2Enterprise) => DriverSecurity::Eap,
        _ => DriverSecurity::Unknown,
    }
}

fn scan_result_of(ap: &AccessPointInfo) -> Option<ScanResult> {
    let ssid = Ssid::new(ap.ssid.as_bytes()).ok()?;
    Some(ScanResult {
        ssid,
        channel: ap.channel,
        band: if ap.channel > 14 {
            Band::Ghz5
        } else {
            Band::Ghz2_4
        },
        rssi: ap.signal_strength,
        security: security_of(ap),
    })
}

/// Disconnect result status for a station disconnect `reason`.
///
/// Leaving on our own request reports success; any other reason code is
/// passed through.
fn disconnect_status(reason: i32) -> i32 {
    if reason == wifi_err_reason_t_WIFI_REASON_ASSOC_LEAVE as i32 {
        0
    } else {
        reason
    }
}

fn report_scan(wifi: &Mutex<EspWifi<'static>>, sink: &EventSink) {
    let results = lock_wifi(wifi).get_scan_result();
    let status = match results {
        Ok(aps) => {
            for result in aps.iter().filter_map(scan_result_of) {
                sink(NetEvent::ScanResult(result));
            }
            0
        }
        Err(e) => {
            warn!("Failed to fetch scan results: {:?}", e);
            e.code()
        }
    };
    sink(NetEvent::ScanDone { status });
}

impl WifiRadio for EspRadio {
    fn has_interface(&self) -> bool {
        lock_wifi(&self.wifi).is_started().unwrap_or(false)
    }

    fn request_scan(&self) -> Result<(), DriverError> {
        lock_wifi(&self.wifi)
            .start_scan(&ScanConfig::default(), false)
            .map_err(driver_error)
    }

    fn request_connect(&self, params: &ConnectParams<'_>) -> Result<(), DriverError> {
        let invalid = || DriverError(ESP_ERR_INVALID_ARG as i32);
        let ssid = core::str::from_utf8(params.ssid).map_err(|_| invalid())?;
        let password = core::str::from_utf8(params.psk.unwrap_or_default())
            .map_err(|_| invalid())?;
        let auth_method = match params.security {
            DriverSecurity::None => AuthMethod::None,
            DriverSecurity::Psk => AuthMethod::WPA2Personal,
            other => {
                warn!("Unsupported security {} for connect", other);
                return Err(invalid());
            }
        };

        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| invalid())?,
            password: password.try_into().map_err(|_| invalid())?,
            auth_method,
            channel: match params.channel {
                Channel::Any => None,
                Channel::Fixed(channel) => Some(channel),
            },
            ..Default::default()
        });

        let mut wifi = lock_wifi(&self.wifi);
        wifi.set_configuration(&config).map_err(driver_error)?;
        wifi.connect().map_err(driver_error)
    }

    fn request_disconnect(&self) -> Result<(), DriverError> {
        lock_wifi(&self.wifi).disconnect().map_err(driver_error)
    }

    fn register_events(&self, sink: EventSink) -> Result<(), DriverError> {
        let wifi = self.wifi.clone();
        let subscription = self
            .sysloop
            .subscribe::<WifiEvent, _>(move |event| match event {
                WifiEvent::ScanDone { .. } => report_scan(&wifi, &sink),
                WifiEvent::StaConnected { .. } => sink(NetEvent::ConnectResult { status: 0 }),
                WifiEvent::StaDisconnected(disconnected) => {
                    let status = disconnect_status(i32::from(disconnected.reason()));
                    sink(NetEvent::DisconnectResult { status })
                }
                _ => debug!("Unhandled WiFi event"),
            })
            .map_err(driver_error)?;

        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
        Ok(())
    }
}
