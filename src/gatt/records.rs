//! Fixed-capacity records carried by the AP details and AP parameters values.
//!
//! # AP Detail Record
//!
//! ```text
//! [security:1][rssi:1 signed][ssid_len:1][ssid:32]
//! ```
//!
//! # AP Parameters Record
//!
//! ```text
//! [ssid_len:1][ssid:32][security:1][passphrase_len:1][passphrase:64]
//! ```
//!
//! The AP parameters record is kept in its raw wire layout. The same 99 bytes
//! are served to readers and written to the credential store.

use super::codec::CodecError;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum SSID length per IEEE 802.11 standard.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum WPA passphrase length.
pub const MAX_PASSPHRASE_LEN: usize = 64;

/// Number of access point records exposed after a scan.
/// 14 records of 35 bytes is the most that fits in one attribute value.
pub const AP_DETAILS_MAX_LEN: usize = 14;

/// Size of one encoded AP detail record.
pub const AP_DETAIL_LEN: usize = 3 + MAX_SSID_LEN;

/// Size of the encoded AP details value.
pub const AP_DETAILS_LEN: usize = AP_DETAILS_MAX_LEN * AP_DETAIL_LEN;

/// Size of the AP parameters record.
pub const AP_PARAMETERS_LEN: usize = 1 + MAX_SSID_LEN + 1 + 1 + MAX_PASSPHRASE_LEN;

const SSID_LEN_OFFSET: usize = 0;
const SSID_OFFSET: usize = 1;
const SECURITY_OFFSET: usize = SSID_OFFSET + MAX_SSID_LEN;
const PASSPHRASE_LEN_OFFSET: usize = SECURITY_OFFSET + 1;
const PASSPHRASE_OFFSET: usize = PASSPHRASE_LEN_OFFSET + 1;

/// Access point security as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Security {
    Open = 0,
    Wpa = 1,
}

impl Security {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Map a wire byte, `None` for anything but OPEN or WPA.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Open),
            1 => Some(Self::Wpa),
            _ => None,
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Wpa => write!(f, "wpa"),
        }
    }
}

/// Network name in a fixed 32-byte buffer.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Ssid {
    bytes: [u8; MAX_SSID_LEN],
    len: u8,
}

impl Ssid {
    /// Copy `bytes` into a new SSID. Fails rather than truncating.
    pub fn new(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() > MAX_SSID_LEN {
            return Err(CodecError::SsidTooLong(bytes.len()));
        }
        let mut ssid = Self::default();
        ssid.bytes[..bytes.len()].copy_from_slice(bytes);
        ssid.len = bytes.len() as u8;
        Ok(ssid)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ssid({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Display for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&String::from_utf8_lossy(self.as_bytes()))
    }
}

/// One discovered access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApDetail {
    pub security: Security,
    pub rssi: i8,
    pub ssid: Ssid,
}

impl ApDetail {
    /// Write the record into `out`, which must hold [`AP_DETAIL_LEN`] bytes.
    pub fn encode_into(&self, out: &mut [u8]) {
        out[0] = self.security.as_byte();
        out[1] = self.rssi as u8;
        out[2] = self.ssid.len;
        out[3..AP_DETAIL_LEN].copy_from_slice(&self.ssid.bytes);
    }

    pub fn decode(record: &[u8]) -> Result<Self, CodecError> {
        if record.len() < AP_DETAIL_LEN {
            return Err(CodecError::TooShort {
                len: record.len(),
                min: AP_DETAIL_LEN,
            });
        }
        let security = Security::from_byte(record[0]).ok_or(CodecError::InvalidValue(record[0]))?;
        let ssid_len = record[2] as usize;
        if ssid_len > MAX_SSID_LEN {
            return Err(CodecError::SsidTooLong(ssid_len));
        }
        Ok(Self {
            security,
            rssi: record[1] as i8,
            ssid: Ssid::new(&record[3..3 + ssid_len])?,
        })
    }
}

/// Access points found by the current scan, in discovery order.
pub type ApDetailList = heapless::Vec<ApDetail, AP_DETAILS_MAX_LEN>;

/// Encode the full AP details value. Slots past the list are zero.
pub fn encode_ap_details(details: &[ApDetail]) -> [u8; AP_DETAILS_LEN] {
    let mut out = [0u8; AP_DETAILS_LEN];
    for (detail, slot) in details.iter().zip(out.chunks_exact_mut(AP_DETAIL_LEN)) {
        detail.encode_into(slot);
    }
    out
}

/// Decode the first `count` records of an AP details value.
pub fn decode_ap_details(bytes: &[u8], count: usize) -> Result<ApDetailList, CodecError> {
    if count > AP_DETAILS_MAX_LEN {
        return Err(CodecError::TooLong {
            len: count,
            max: AP_DETAILS_MAX_LEN,
        });
    }
    if bytes.len() < count * AP_DETAIL_LEN {
        return Err(CodecError::TooShort {
            len: bytes.len(),
            min: count * AP_DETAIL_LEN,
        });
    }

    let mut list = ApDetailList::new();
    for record in bytes.chunks_exact(AP_DETAIL_LEN).take(count) {
        // Capacity checked above.
        let _ = list.push(ApDetail::decode(record)?);
    }
    Ok(list)
}

/// Credentials for the access point to join.
///
/// Held in raw wire layout so partial overwrites keep whatever trailing
/// bytes the record already had. The security byte is not validated here;
/// an unknown value is only rejected when a connect is requested.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApParameters {
    raw: [u8; AP_PARAMETERS_LEN],
}

impl Default for ApParameters {
    fn default() -> Self {
        Self {
            raw: [0; AP_PARAMETERS_LEN],
        }
    }
}

impl ApParameters {
    /// Build a record from its fields.
    pub fn new(ssid: &[u8], security: Security, passphrase: &[u8]) -> Result<Self, CodecError> {
        if ssid.len() > MAX_SSID_LEN {
            return Err(CodecError::SsidTooLong(ssid.len()));
        }
        if passphrase.len() > MAX_PASSPHRASE_LEN {
            return Err(CodecError::PassphraseTooLong(passphrase.len()));
        }

        let mut params = Self::default();
        params.raw[SSID_LEN_OFFSET] = ssid.len() as u8;
        params.raw[SSID_OFFSET..SSID_OFFSET + ssid.len()].copy_from_slice(ssid);
        params.raw[SECURITY_OFFSET] = security.as_byte();
        params.raw[PASSPHRASE_LEN_OFFSET] = passphrase.len() as u8;
        params.raw[PASSPHRASE_OFFSET..PASSPHRASE_OFFSET + passphrase.len()]
            .copy_from_slice(passphrase);
        Ok(params)
    }

    /// Decode a record, treating bytes past `bytes.len()` as zero.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut params = Self::default();
        params.overwrite(bytes)?;
        Ok(params)
    }

    /// Overwrite the leading `data.len()` bytes of the record.
    ///
    /// The record is left untouched if the result would carry an SSID or
    /// passphrase length larger than its buffer.
    pub fn overwrite(&mut self, data: &[u8]) -> Result<(), CodecError> {
        if data.len() > AP_PARAMETERS_LEN {
            return Err(CodecError::TooLong {
                len: data.len(),
                max: AP_PARAMETERS_LEN,
            });
        }

        let mut candidate = self.raw;
        candidate[..data.len()].copy_from_slice(data);
        let checked = validate(&candidate);
        if checked.is_ok() {
            self.raw = candidate;
        }
        candidate.zeroize();
        checked
    }

    /// Raw record bytes, as served to readers and persisted.
    pub fn as_bytes(&self) -> &[u8; AP_PARAMETERS_LEN] {
        &self.raw
    }

    pub fn ssid(&self) -> &[u8] {
        let len = self.raw[SSID_LEN_OFFSET] as usize;
        &self.raw[SSID_OFFSET..SSID_OFFSET + len]
    }

    /// Security byte exactly as written by the peer.
    pub fn security_byte(&self) -> u8 {
        self.raw[SECURITY_OFFSET]
    }

    pub fn security(&self) -> Option<Security> {
        Security::from_byte(self.security_byte())
    }

    pub fn passphrase(&self) -> &[u8] {
        let len = self.raw[PASSPHRASE_LEN_OFFSET] as usize;
        &self.raw[PASSPHRASE_OFFSET..PASSPHRASE_OFFSET + len]
    }
}

fn validate(raw: &[u8; AP_PARAMETERS_LEN]) -> Result<(), CodecError> {
    let ssid_len = raw[SSID_LEN_OFFSET] as usize;
    if ssid_len > MAX_SSID_LEN {
        return Err(CodecError::SsidTooLong(ssid_len));
    }
    let passphrase_len = raw[PASSPHRASE_LEN_OFFSET] as usize;
    if passphrase_len > MAX_PASSPHRASE_LEN {
        return Err(CodecError::PassphraseTooLong(passphrase_len));
    }
    Ok(())
}

impl fmt::Debug for ApParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApParameters")
            .field("ssid", &String::from_utf8_lossy(self.ssid()))
            .field("security", &self.security_byte())
            .field("passphrase_len", &self.passphrase().len())
            .finish_non_exhaustive()
    }
}
