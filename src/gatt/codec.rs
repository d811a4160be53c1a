//! Wire encoding of the exposed attribute values.
//!
//! Every value has a fixed maximum size. Reads go through [`read_at`], which
//! serves the byte range a peer asks for when the link layer fragments long
//! values. Writes are decoded into a [`WriteRequest`] before any session
//! state is touched.
//!
//! # Values
//!
//! ```text
//! Scanning Mode     [mode:1]             0=idle 1=running 2=done
//! AP Count          [count:1]
//! AP Details        [record:35] x 14     see records::ApDetail
//! Connection State  [state:1]            0=disconnected 1=connecting 2=connected
//! AP Parameters     [record:99]          see records::ApParameters
//! ```

use super::records::AP_PARAMETERS_LEN;
use super::table::AttributeKind;
use std::fmt;

/// Command byte written to the scanning mode value to start a scan.
pub const START_SCAN: u8 = 1;

/// Command byte written to the connection state value to disconnect.
pub const CMD_DISCONNECT: u8 = 0;

/// Command byte written to the connection state value to connect.
pub const CMD_CONNECT: u8 = 1;

/// Largest value the attribute protocol can carry.
pub const MAX_ATTR_VALUE_LEN: usize = 512;

/// Scan lifecycle as exposed on the scanning mode value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ScanMode {
    /// No scan has been requested since boot.
    #[default]
    Idle = 0,
    /// A scan request is in flight.
    Running = 1,
    /// The last scan completed (successfully or not).
    Done = 2,
}

impl ScanMode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Running),
            2 => Ok(Self::Done),
            other => Err(CodecError::InvalidValue(other)),
        }
    }

    pub fn encode(self) -> [u8; 1] {
        [self.as_byte()]
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Connection lifecycle as exposed on the connection state value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0 => Ok(Self::Disconnected),
            1 => Ok(Self::Connecting),
            2 => Ok(Self::Connected),
            other => Err(CodecError::InvalidValue(other)),
        }
    }

    pub fn encode(self) -> [u8; 1] {
        [self.as_byte()]
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Encode the access point count value.
pub fn encode_ap_count(count: usize) -> [u8; 1] {
    [count.min(u8::MAX as usize) as u8]
}

/// Decode the access point count value.
pub fn decode_ap_count(bytes: &[u8]) -> Result<u8, CodecError> {
    single_byte(bytes)
}

/// A decoded peer write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRequest<'a> {
    /// Start a scan (scanning mode value).
    StartScan,
    /// Connect with the stored parameters (connection state value).
    Connect,
    /// Drop the current link (connection state value).
    Disconnect,
    /// Overwrite the leading bytes of the AP parameters record.
    ApParameters(&'a [u8]),
}

/// Decode a write to `kind`.
///
/// Writes are whole-value only: `offset` must be zero. Command values are
/// exactly one byte.
pub fn decode_write(
    kind: AttributeKind,
    offset: usize,
    data: &[u8],
) -> Result<WriteRequest<'_>, CodecError> {
    if offset != 0 {
        return Err(CodecError::InvalidOffset {
            offset,
            len: kind.max_len(),
        });
    }

    match kind {
        AttributeKind::ScanMode => match single_byte(data)? {
            START_SCAN => Ok(WriteRequest::StartScan),
            other => Err(CodecError::InvalidValue(other)),
        },
        AttributeKind::ConnectionState => match single_byte(data)? {
            CMD_CONNECT => Ok(WriteRequest::Connect),
            CMD_DISCONNECT => Ok(WriteRequest::Disconnect),
            other => Err(CodecError::InvalidValue(other)),
        },
        AttributeKind::ApParameters => {
            if data.len() > AP_PARAMETERS_LEN {
                return Err(CodecError::TooLong {
                    len: data.len(),
                    max: AP_PARAMETERS_LEN,
                });
            }
            Ok(WriteRequest::ApParameters(data))
        }
        AttributeKind::ApCount | AttributeKind::ApDetails => Err(CodecError::ReadOnly(kind)),
    }
}

/// Serve `len` bytes of `value` starting at `offset`.
///
/// Returns exactly `min(len, value.len() - offset)` bytes. An offset equal
/// to the value length yields an empty slice; anything past it is an error.
pub fn read_at(value: &[u8], offset: usize, len: usize) -> Result<&[u8], CodecError> {
    if offset > value.len() {
        return Err(CodecError::InvalidOffset {
            offset,
            len: value.len(),
        });
    }
    let end = offset + len.min(value.len() - offset);
    Ok(&value[offset..end])
}

fn single_byte(bytes: &[u8]) -> Result<u8, CodecError> {
    match bytes {
        [byte] => Ok(*byte),
        [] => Err(CodecError::TooShort { len: 0, min: 1 }),
        _ => Err(CodecError::TooLong {
            len: bytes.len(),
            max: 1,
        }),
    }
}

/// Malformed wire values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Read or write offset past the end of the value.
    InvalidOffset { offset: usize, len: usize },
    /// Value shorter than its fixed layout.
    TooShort { len: usize, min: usize },
    /// Value longer than its declared maximum size.
    TooLong { len: usize, max: usize },
    /// SSID length field exceeds the record's SSID buffer.
    SsidTooLong(usize),
    /// Passphrase length field exceeds the record's passphrase buffer.
    PassphraseTooLong(usize),
    /// Byte outside the value's enumeration.
    InvalidValue(u8),
    /// Value is not writable.
    ReadOnly(AttributeKind),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOffset { offset, len } => {
                write!(f, "offset {} past end of {}-byte value", offset, len)
            }
            Self::TooShort { len, min } => {
                write!(f, "value too short: {} bytes (min {})", len, min)
            }
            Self::TooLong { len, max } => write!(f, "value too long: {} bytes (max {})", len, max),
            Self::SsidTooLong(len) => write!(f, "SSID length {} out of bounds", len),
            Self::PassphraseTooLong(len) => write!(f, "passphrase length {} out of bounds", len),
            Self::InvalidValue(byte) => write!(f, "invalid value 0x{:02x}", byte),
            Self::ReadOnly(kind) => write!(f, "{} is read-only", kind),
        }
    }
}

impl std::error::Error for CodecError {}
