//! BLE GATT bridge for WiFi scan and connect.
//!
//! A remote peer drives a WiFi scan, reads back the discovered access
//! points, stores credentials and asks the device to join a network, all
//! through five attribute values on two services.
//!
//! Everything except the NimBLE server, the ESP-IDF WiFi adapter and the
//! NVS backend builds and tests on the host.

pub mod bridge;
pub mod console;
pub mod error;
pub mod gatt;
pub mod storage;
#[cfg(test)]
mod test_support;
pub mod wifi;

// Re-export commonly used items
pub use bridge::Bridge;
pub use error::BridgeError;
pub use gatt::{
    ApDetail, ApParameters, AttributeKind, AttributeNotifier, ConnectionState, ScanMode, Security,
    Ssid,
};
pub use storage::{CredentialStore, MemorySettings, SettingsBackend, StoreError};
pub use wifi::{NetEvent, SimNetwork, SimulatedRadio, WifiRadio};
