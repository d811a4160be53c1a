//! Request interface to the WiFi radio driver.
//!
//! Requests are fire-and-forget: the driver accepts or rejects them
//! synchronously and reports the outcome later as a [`NetEvent`].
//!
//! [`NetEvent`]: super::events::NetEvent

use super::events::NetEvent;
use crate::gatt::Ssid;
use std::fmt;
use std::sync::Arc;

/// Callback the driver uses to deliver events, from its own context.
pub type EventSink = Arc<dyn Fn(NetEvent) + Send + Sync>;

/// Error code returned by the driver when it rejects a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverError(pub i32);

impl DriverError {
    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "driver error {}", self.0)
    }
}

impl std::error::Error for DriverError {}

/// Security types reported or accepted by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverSecurity {
    None,
    Psk,
    PskSha256,
    Sae,
    Wep,
    WpaPsk,
    Eap,
    Unknown,
}

impl DriverSecurity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "OPEN",
            Self::Psk => "WPA2-PSK",
            Self::PskSha256 => "WPA2-PSK-SHA256",
            Self::Sae => "WPA3-SAE",
            Self::Wep => "WEP",
            Self::WpaPsk => "WPA-PSK",
            Self::Eap => "EAP",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DriverSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Frequency band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Ghz2_4,
    Ghz5,
    Ghz6,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Ghz2_4 => "2.4GHz",
            Self::Ghz5 => "5GHz",
            Self::Ghz6 => "6GHz",
        })
    }
}

/// Channel selection for a connect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Any,
    Fixed(u8),
}

/// How long the driver may take before reporting a connect result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectTimeout {
    /// Wait for the driver's own asynchronous result.
    Forever,
    Millis(u32),
}

/// Management frame protection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfpPolicy {
    Disabled,
    Optional,
    Required,
}

/// Parameters of a connect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectParams<'a> {
    pub ssid: &'a [u8],
    /// Pre-shared key, `None` for open networks.
    pub psk: Option<&'a [u8]>,
    pub security: DriverSecurity,
    pub band: Band,
    pub channel: Channel,
    pub timeout: ConnectTimeout,
    pub mfp: MfpPolicy,
}

/// A network found by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    pub ssid: Ssid,
    pub channel: u8,
    pub band: Band,
    pub rssi: i8,
    pub security: DriverSecurity,
}

/// WiFi radio driver.
///
/// Implementations must not deliver events synchronously from inside a
/// request call.
pub trait WifiRadio: Send + Sync {
    /// Whether a WiFi network interface is present.
    fn has_interface(&self) -> bool;

    fn request_scan(&self) -> Result<(), DriverError>;

    fn request_connect(&self, params: &ConnectParams<'_>) -> Result<(), DriverError>;

    fn request_disconnect(&self) -> Result<(), DriverError>;

    /// Install the event callback. Called once at startup.
    fn register_events(&self, sink: EventSink) -> Result<(), DriverError>;
}
