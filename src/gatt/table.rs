//! Attribute table for the WiFi scan and WiFi connect services.
//!
//! # GATT Service Structure
//!
//! ```text
//! Service: WiFi Scan (fb8c0001-...)
//! ├── Scanning Mode (Read, Write, Notify) + valid range descriptor
//! ├── AP Count (Read)
//! └── AP Details (Read)
//!
//! Service: WiFi Connect (77880001-...)
//! ├── Connection State (Read, Write, Notify)
//! └── AP Parameters (Read, Write; encrypted + authenticated link)
//! ```
//!
//! The table is built once as a static and is the single source for the
//! properties, permissions and descriptors of each value.

use super::records::{AP_DETAILS_LEN, AP_DETAILS_MAX_LEN, AP_PARAMETERS_LEN};
use std::fmt;

/// WiFi Scan Service UUID.
pub const SCAN_SERVICE_UUID: u128 = 0xfb8c0001_d224_11e4_85a1_0002a5d5c51b;

/// WiFi Connect Service UUID.
pub const CONNECT_SERVICE_UUID: u128 = 0x77880001_d229_11e4_8689_0002a5d5c51b;

/// Valid Range descriptor UUID.
pub const VALID_RANGE_UUID: u16 = 0x2906;

/// Characteristic Presentation Format descriptor UUID.
pub const PRESENTATION_FORMAT_UUID: u16 = 0x2904;

/// Characteristic User Description descriptor UUID.
pub const USER_DESCRIPTION_UUID: u16 = 0x2901;

/// Values exposed over the attribute protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    ScanMode,
    ApCount,
    ApDetails,
    ConnectionState,
    ApParameters,
}

impl AttributeKind {
    /// All values in declaration order.
    pub const ALL: [AttributeKind; 5] = [
        Self::ScanMode,
        Self::ApCount,
        Self::ApDetails,
        Self::ConnectionState,
        Self::ApParameters,
    ];

    /// Table entry for this value.
    pub fn spec(self) -> &'static AttributeSpec {
        match self {
            Self::ScanMode => &ATTRIBUTES[0],
            Self::ApCount => &ATTRIBUTES[1],
            Self::ApDetails => &ATTRIBUTES[2],
            Self::ConnectionState => &ATTRIBUTES[3],
            Self::ApParameters => &ATTRIBUTES[4],
        }
    }

    pub fn max_len(self) -> usize {
        self.spec().max_len
    }

    pub fn is_writable(self) -> bool {
        self.spec().properties.write
    }

    pub fn is_notifiable(self) -> bool {
        self.spec().properties.notify
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec().description)
    }
}

/// Services grouping the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Scan,
    Connect,
}

impl Service {
    pub fn uuid(self) -> u128 {
        match self {
            Self::Scan => SCAN_SERVICE_UUID,
            Self::Connect => CONNECT_SERVICE_UUID,
        }
    }
}

/// Characteristic properties advertised to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Properties {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
    /// Authenticated signed writes / extended auth flag.
    pub auth: bool,
}

/// Link requirements for accessing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any connected peer.
    Open,
    /// Link must be encrypted and authenticated (paired with MITM protection).
    EncryptedAuthenticated,
}

/// Characteristic Presentation Format descriptor contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationFormat {
    pub format: u8,
    pub exponent: i8,
    pub unit: u16,
    pub namespace: u8,
    pub description: u16,
}

/// Presentation format code for an unsigned 8-bit value.
pub const FORMAT_UINT8: u8 = 0x04;

/// Presentation format code for an opaque structure.
pub const FORMAT_STRUCT: u8 = 0x1b;

/// Unitless unit code.
const UNIT_UNITLESS: u16 = 0x2700;

/// Bluetooth SIG namespace.
const NAMESPACE_BTSIG: u8 = 0x01;

impl PresentationFormat {
    const fn unitless(format: u8) -> Self {
        Self {
            format,
            exponent: 0,
            unit: UNIT_UNITLESS,
            namespace: NAMESPACE_BTSIG,
            description: 0,
        }
    }

    /// Descriptor value: `[format][exponent][unit:2 LE][namespace][description:2 LE]`.
    pub fn to_bytes(&self) -> [u8; 7] {
        let unit = self.unit.to_le_bytes();
        let description = self.description.to_le_bytes();
        [
            self.format,
            self.exponent as u8,
            unit[0],
            unit[1],
            self.namespace,
            description[0],
            description[1],
        ]
    }
}

/// One row of the attribute table.
#[derive(Debug)]
pub struct AttributeSpec {
    pub kind: AttributeKind,
    pub service: Service,
    pub uuid: u128,
    pub properties: Properties,
    pub access: Access,
    pub max_len: usize,
    /// User description string.
    pub description: &'static str,
    pub format: Option<PresentationFormat>,
}

/// The attribute table.
pub static ATTRIBUTES: [AttributeSpec; 5] = [
    AttributeSpec {
        kind: AttributeKind::ScanMode,
        service: Service::Scan,
        uuid: 0xfb8c0002_d224_11e4_85a1_0002a5d5c51b,
        properties: Properties {
            read: true,
            write: true,
            notify: true,
            auth: false,
        },
        access: Access::Open,
        max_len: 1,
        description: "Scanning Mode",
        format: None,
    },
    AttributeSpec {
        kind: AttributeKind::ApCount,
        service: Service::Scan,
        uuid: 0xfb8c0003_d224_11e4_85a1_0002a5d5c51b,
        properties: Properties {
            read: true,
            write: false,
            notify: false,
            auth: false,
        },
        access: Access::Open,
        max_len: 1,
        description: "AP Count",
        format: Some(PresentationFormat::unitless(FORMAT_UINT8)),
    },
    AttributeSpec {
        kind: AttributeKind::ApDetails,
        service: Service::Scan,
        uuid: 0xfb8c0100_d224_11e4_85a1_0002a5d5c51b,
        properties: Properties {
            read: true,
            write: false,
            notify: false,
            auth: false,
        },
        access: Access::Open,
        max_len: AP_DETAILS_LEN,
        description: "AP Details",
        format: Some(PresentationFormat::unitless(FORMAT_STRUCT)),
    },
    AttributeSpec {
        kind: AttributeKind::ConnectionState,
        service: Service::Connect,
        uuid: 0x77880002_d229_11e4_8689_0002a5d5c51b,
        properties: Properties {
            read: true,
            write: true,
            notify: true,
            auth: false,
        },
        access: Access::Open,
        max_len: 1,
        description: "Connection State",
        format: None,
    },
    AttributeSpec {
        kind: AttributeKind::ApParameters,
        service: Service::Connect,
        uuid: 0x77880003_d229_11e4_8689_0002a5d5c51b,
        properties: Properties {
            read: true,
            write: true,
            notify: false,
            auth: true,
        },
        access: Access::EncryptedAuthenticated,
        max_len: AP_PARAMETERS_LEN,
        description: "AP Parameters",
        format: Some(PresentationFormat::unitless(FORMAT_STRUCT)),
    },
];

/// Valid Range descriptor on the scanning mode value.
///
/// Advertises `[0, AP_DETAILS_MAX_LEN - 1]` as two little-endian u16 values.
/// The bound describes the AP list, not the mode enumeration.
pub const fn scan_mode_valid_range() -> [u8; 4] {
    let lower = 0u16.to_le_bytes();
    let upper = ((AP_DETAILS_MAX_LEN - 1) as u16).to_le_bytes();
    [lower[0], lower[1], upper[0], upper[1]]
}
