//! Attribute surface of the bridge.
//!
//! # Components
//!
//! - [`codec`] - Wire encoding and offset reads of each value
//! - [`records`] - AP detail and AP parameters records
//! - [`table`] - Static attribute table (UUIDs, properties, descriptors)
//! - [`gate`] - Notification subscription flags
//! - `server` - NimBLE GATT server (ESP32 only)

pub mod codec;
mod gate;
pub mod records;
pub mod table;

#[cfg(feature = "esp32")]
mod server;

pub use codec::{read_at, CodecError, ConnectionState, ScanMode, WriteRequest};
pub use gate::NotificationGate;
pub use records::{ApDetail, ApDetailList, ApParameters, Security, Ssid};
pub use table::AttributeKind;

#[cfg(feature = "esp32")]
pub use server::GattServer;

/// Transport hook for pushing a value to subscribed peers.
///
/// Called without any session lock held; implementations may block.
pub trait AttributeNotifier: Send + Sync {
    fn notify(&self, kind: AttributeKind, value: &[u8]);
}
