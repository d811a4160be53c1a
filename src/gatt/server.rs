//! NimBLE GATT server.
//!
//! Registers both services from the attribute table and forwards reads,
//! writes and subscriptions to the [`Bridge`].
//!
//! ```text
//! Scan service
//! ├── Scanning Mode     (Read, Write, Notify) + Valid Range
//! ├── AP Count          (Read)                + Presentation Format
//! └── AP Details        (Read)                + Presentation Format
//! Connect service
//! ├── Connection State  (Read, Write, Notify)
//! └── AP Parameters     (Read, Write; encrypted + authenticated) + Presentation Format
//! ```
//!
//! Every value also carries a User Description descriptor.

use super::table::{
    scan_mode_valid_range, Access, AttributeSpec, Service, ATTRIBUTES, PRESENTATION_FORMAT_UUID,
    SCAN_SERVICE_UUID, USER_DESCRIPTION_UUID, VALID_RANGE_UUID,
};
use super::{AttributeKind, AttributeNotifier};
use crate::bridge::Bridge;
use esp32_nimble::utilities::mutex::Mutex;
use esp32_nimble::utilities::BleUuid;
use esp32_nimble::{
    enums::{AuthReq, SecurityIOCap},
    BLEAdvertisementData, BLECharacteristic, BLEDevice, BLEError, BLEServer, DescriptorProperties,
    NimbleProperties, NimbleSub,
};
use log::{info, warn};
use std::sync::Arc;
use zeroize::Zeroizing;

/// BLE advertisement name.
pub const DEVICE_NAME: &str = "WiFi Bridge";

/// GATT characteristics of the bridge.
pub struct GattServer {
    characteristics: Vec<(AttributeKind, Arc<Mutex<BLECharacteristic>>)>,
}

fn properties_of(spec: &AttributeSpec) -> NimbleProperties {
    let secured = spec.access == Access::EncryptedAuthenticated;
    let mut properties = NimbleProperties::empty();
    if spec.properties.read {
        properties |= NimbleProperties::READ;
        if secured {
            properties |= NimbleProperties::READ_ENC | NimbleProperties::READ_AUTHEN;
        }
    }
    if spec.properties.write {
        properties |= NimbleProperties::WRITE;
        if secured {
            properties |= NimbleProperties::WRITE_ENC | NimbleProperties::WRITE_AUTHEN;
        }
    }
    if spec.properties.notify {
        properties |= NimbleProperties::NOTIFY;
    }
    properties
}

impl GattServer {
    /// Create both services and their characteristics and descriptors.
    pub fn register(server: &mut BLEServer) -> Arc<Self> {
        let scan_service = server.create_service(BleUuid::from_uuid128(
            Service::Scan.uuid().to_le_bytes(),
        ));
        let connect_service = server.create_service(BleUuid::from_uuid128(
            Service::Connect.uuid().to_le_bytes(),
        ));

        let mut characteristics = Vec::with_capacity(ATTRIBUTES.len());
        for spec in ATTRIBUTES.iter() {
            let service = match spec.service {
                Service::Scan => &scan_service,
                Service::Connect => &connect_service,
            };
            let characteristic = service.lock().create_characteristic(
                BleUuid::from_uuid128(spec.uuid.to_le_bytes()),
                properties_of(spec),
            );

            {
                let mut chr = characteristic.lock();
                chr.create_descriptor(
                    BleUuid::from_uuid16(USER_DESCRIPTION_UUID),
                    DescriptorProperties::READ,
                )
                .lock()
                .set_value(spec.description.as_bytes());

                if let Some(format) = spec.format {
                    chr.create_descriptor(
                        BleUuid::from_uuid16(PRESENTATION_FORMAT_UUID),
                        DescriptorProperties::READ,
                    )
                    .lock()
                    .set_value(&format.to_bytes());
                }

                if spec.kind == AttributeKind::ScanMode {
                    chr.create_descriptor(
                        BleUuid::from_uuid16(VALID_RANGE_UUID),
                        DescriptorProperties::READ,
                    )
                    .lock()
                    .set_value(&scan_mode_valid_range());
                }
            }

            characteristics.push((spec.kind, characteristic));
        }

        info!("GATT services registered");
        Arc::new(Self { characteristics })
    }

    /// Route characteristic callbacks to `bridge`.
    pub fn attach(&self, bridge: Arc<Bridge>) {
        for (kind, characteristic) in &self.characteristics {
            let kind = *kind;
            let mut chr = characteristic.lock();

            let reader = bridge.clone();
            chr.on_read(move |value, _desc| {
                match reader.read(kind, 0, kind.max_len()) {
                    Ok(bytes) => value.set_value(&Zeroizing::new(bytes)),
                    Err(e) => warn!("Read of {} failed: {}", kind, e),
                }
            });

            if kind.is_writable() {
                let writer = bridge.clone();
                chr.on_write(move |args| {
                    let result = writer.write(kind, 0, args.recv_data());
                    if let Err(e) = result {
                        args.reject_with_error_code(e.att_code());
                    }
                });
            }

            if kind.is_notifiable() {
                let subscriber = bridge.clone();
                chr.on_subscribe(move |_chr, _desc, sub| {
                    subscriber.set_subscribed(kind, sub.contains(NimbleSub::NOTIFY));
                });
            }
        }
    }

    /// Configure pairing and start advertising the scan service.
    pub fn start_advertising(device: &mut BLEDevice) -> Result<(), BLEError> {
        device
            .security()
            .set_auth(AuthReq::Bond | AuthReq::Mitm | AuthReq::Sc)
            .set_io_cap(SecurityIOCap::DisplayOnly);

        let advertising = device.get_advertising();
        advertising.lock().set_data(
            BLEAdvertisementData::new()
                .name(DEVICE_NAME)
                .add_service_uuid(BleUuid::from_uuid128(SCAN_SERVICE_UUID.to_le_bytes())),
        )?;
        advertising.lock().start()?;
        info!("Advertising as '{}'", DEVICE_NAME);
        Ok(())
    }
}

impl AttributeNotifier for GattServer {
    fn notify(&self, kind: AttributeKind, value: &[u8]) {
        match self.characteristics.iter().find(|(k, _)| *k == kind) {
            Some((_, characteristic)) => {
                characteristic.lock().set_value(value).notify();
            }
            None => warn!("No characteristic for {}", kind),
        }
    }
}
