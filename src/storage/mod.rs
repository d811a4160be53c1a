//! Persistent settings.
//!
//! The AP parameters record is stored as one raw blob under
//! [`AP_PARAMETERS_KEY`] in the [`NAMESPACE`] namespace. Backends:
//!
//! - [`NvsSettings`] - ESP32 Non-Volatile Storage (ESP32 only)
//! - [`FileSettings`] - one file per key under `~/.winc-bridge` (host only)
//! - [`MemorySettings`] - in-process map

#[cfg(not(feature = "esp32"))]
mod host;
#[cfg(feature = "esp32")]
mod nvs;

#[cfg(not(feature = "esp32"))]
pub use host::FileSettings;
#[cfg(feature = "esp32")]
pub use nvs::NvsSettings;

use crate::gatt::records::AP_PARAMETERS_LEN;
use crate::gatt::ApParameters;
use log::{debug, error, warn};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use zeroize::{Zeroize, Zeroizing};

/// Settings namespace owned by the bridge.
pub const NAMESPACE: &str = "bt_winc";

/// Key of the AP parameters blob.
pub const AP_PARAMETERS_KEY: &str = "ap_parameters";

/// Key/value blob storage.
pub trait SettingsBackend: Send {
    /// Copy the value stored under `key` into `buf`.
    ///
    /// Returns the stored length, which may exceed `buf.len()`; only the
    /// first `buf.len()` bytes are copied in that case. `None` if the key
    /// does not exist.
    fn load(&self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StoreError>;

    fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;
}

impl<T: SettingsBackend + Sync> SettingsBackend for Arc<T> {
    fn load(&self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        (**self).load(key, buf)
    }

    fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        (**self).save(key, data)
    }
}

/// Storage of the AP parameters record.
pub struct CredentialStore {
    backend: Box<dyn SettingsBackend>,
}

impl CredentialStore {
    pub fn new(backend: Box<dyn SettingsBackend>) -> Self {
        Self { backend }
    }

    /// Load the stored AP parameters.
    ///
    /// A blob that does not decode is logged and treated as absent.
    pub fn load(&self) -> Result<Option<ApParameters>, StoreError> {
        let mut buf = Zeroizing::new([0u8; AP_PARAMETERS_LEN + 1]);
        let len = match self.backend.load(AP_PARAMETERS_KEY, &mut buf[..])? {
            Some(len) => len,
            None => return Ok(None),
        };

        if len > AP_PARAMETERS_LEN {
            warn!(
                "Stored AP parameters have unexpected size {} (max {})",
                len, AP_PARAMETERS_LEN
            );
            return Ok(None);
        }

        match ApParameters::from_bytes(&buf[..len]) {
            Ok(params) => Ok(Some(params)),
            Err(e) => {
                warn!("Stored AP parameters are corrupted: {}", e);
                Ok(None)
            }
        }
    }

    /// Save the AP parameters with read-back verification.
    pub fn save(&self, params: &ApParameters) -> Result<(), StoreError> {
        let bytes = params.as_bytes();
        self.backend.save(AP_PARAMETERS_KEY, bytes)?;

        // Read back to catch silent write failures
        let mut verify = Zeroizing::new([0u8; AP_PARAMETERS_LEN + 1]);
        let len = self
            .backend
            .load(AP_PARAMETERS_KEY, &mut verify[..])?
            .ok_or_else(|| {
                error!("AP parameters not found after save");
                StoreError::VerifyFailed
            })?;
        if len != bytes.len() || verify[..len] != bytes[..] {
            error!("AP parameters verification failed: data mismatch after save");
            return Err(StoreError::VerifyFailed);
        }

        debug!("AP parameters saved and verified");
        Ok(())
    }
}

/// Settings held in memory.
#[derive(Default)]
pub struct MemorySettings {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_saves: AtomicBool,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Replace the raw value under `key`.
    pub fn insert(&self, key: &str, value: &[u8]) {
        self.lock().insert(key.to_string(), value.to_vec());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsBackend for MemorySettings {
    fn load(&self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        Ok(self.lock().get(key).map(|value| {
            let n = value.len().min(buf.len());
            buf[..n].copy_from_slice(&value[..n]);
            value.len()
        }))
    }

    fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                "settings storage unavailable",
            )));
        }
        if let Some(mut old) = self.lock().insert(key.to_string(), data.to_vec()) {
            old.zeroize();
        }
        Ok(())
    }
}

impl Drop for MemorySettings {
    fn drop(&mut self) {
        for value in self.lock().values_mut() {
            value.zeroize();
        }
    }
}

/// Settings storage failure.
#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
    /// The value read back after a save differs from the one written.
    VerifyFailed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "NVS error: {:?}", e),
            Self::VerifyFailed => write!(f, "verification failed after save"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for StoreError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}
