//! Errors reported to the peer on a read or write.

use crate::gatt::CodecError;
use crate::storage::StoreError;
use crate::wifi::DriverError;
use std::fmt;

/// ATT error: Write Not Permitted.
pub const ATT_ERR_WRITE_NOT_PERMITTED: u8 = 0x03;
/// ATT error: Invalid Offset.
pub const ATT_ERR_INVALID_OFFSET: u8 = 0x07;
/// ATT error: Invalid Attribute Value Length.
pub const ATT_ERR_INVALID_LENGTH: u8 = 0x0d;
/// ATT error: Value Not Allowed.
pub const ATT_ERR_VALUE_NOT_ALLOWED: u8 = 0x13;
/// Common profile error: Procedure Already in Progress.
pub const ATT_ERR_IN_PROGRESS: u8 = 0xfe;

/// Application error: connect requested while not disconnected.
pub const APP_ERR_INVALID_STATE: u8 = 0x80;
/// Application error: stored security byte is neither OPEN nor WPA.
pub const APP_ERR_INVALID_SECURITY: u8 = 0x81;
/// Application error: no WiFi interface.
pub const APP_ERR_NO_RADIO: u8 = 0x82;
/// Application error: the radio driver rejected the request.
pub const APP_ERR_DRIVER: u8 = 0x83;
/// Application error: the credential store failed to save.
pub const APP_ERR_PERSIST: u8 = 0x84;

/// Failure of a single bridge operation. None of these are fatal.
#[derive(Debug)]
pub enum BridgeError {
    /// Malformed, undersized or oversized wire value.
    Codec(CodecError),
    /// Value cannot be written.
    WriteNotPermitted,
    /// A scan is already running.
    Busy,
    /// Connect requested while connecting or connected.
    InvalidState,
    /// Stored security byte does not map to a driver security type.
    InvalidSecurity(u8),
    /// No WiFi interface present.
    NoRadio,
    /// The radio driver rejected the request.
    Driver(DriverError),
    /// The credential store failed; the in-memory value was still updated.
    Persist(StoreError),
}

impl BridgeError {
    /// ATT error code reported to the peer.
    pub fn att_code(&self) -> u8 {
        match self {
            Self::Codec(CodecError::InvalidOffset { .. }) => ATT_ERR_INVALID_OFFSET,
            Self::Codec(
                CodecError::TooShort { .. }
                | CodecError::TooLong { .. }
                | CodecError::SsidTooLong(_)
                | CodecError::PassphraseTooLong(_),
            ) => ATT_ERR_INVALID_LENGTH,
            Self::Codec(CodecError::InvalidValue(_)) => ATT_ERR_VALUE_NOT_ALLOWED,
            Self::Codec(CodecError::ReadOnly(_)) | Self::WriteNotPermitted => {
                ATT_ERR_WRITE_NOT_PERMITTED
            }
            Self::Busy => ATT_ERR_IN_PROGRESS,
            Self::InvalidState => APP_ERR_INVALID_STATE,
            Self::InvalidSecurity(_) => APP_ERR_INVALID_SECURITY,
            Self::NoRadio => APP_ERR_NO_RADIO,
            Self::Driver(_) => APP_ERR_DRIVER,
            Self::Persist(_) => APP_ERR_PERSIST,
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "protocol violation: {}", e),
            Self::WriteNotPermitted => write!(f, "write not permitted"),
            Self::Busy => write!(f, "scan already running"),
            Self::InvalidState => write!(f, "invalid connection state"),
            Self::InvalidSecurity(byte) => write!(f, "invalid security type {}", byte),
            Self::NoRadio => write!(f, "no WiFi interface"),
            Self::Driver(e) => write!(f, "{}", e),
            Self::Persist(e) => write!(f, "persist failed: {}", e),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Driver(e) => Some(e),
            Self::Persist(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for BridgeError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<DriverError> for BridgeError {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

impl From<StoreError> for BridgeError {
    fn from(e: StoreError) -> Self {
        Self::Persist(e)
    }
}
