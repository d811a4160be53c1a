//! WiFi side of the bridge.
//!
//! # Components
//!
//! - [`radio`] - request interface to the WiFi driver
//! - [`events`] - driver events and their routing
//! - [`scan`] - scan state machine
//! - [`connection`] - connection state machine and AP parameters
//! - [`sim`] - simulated radio
//! - `esp` - ESP-IDF driver adapter (ESP32 only)

pub mod connection;
pub mod events;
pub mod radio;
pub mod scan;
pub mod sim;

#[cfg(feature = "esp32")]
mod esp;

pub use connection::ConnectionSession;
#[cfg(feature = "esp32")]
pub use esp::EspRadio;
pub use events::{NetEvent, NetworkEventRouter};
pub use radio::{
    Band, Channel, ConnectParams, ConnectTimeout, DriverError, DriverSecurity, EventSink,
    MfpPolicy, ScanResult, WifiRadio,
};
pub use scan::ScanSession;
pub use sim::{SimDriver, SimNetwork, SimulatedRadio};
