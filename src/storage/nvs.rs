//! NVS-backed settings for ESP32 builds.
//!
//! For production devices enable NVS encryption; development builds store
//! the AP parameters in plain text.

use super::{SettingsBackend, StoreError};
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_sys::EspError;
use log::{debug, info};
use std::sync::{Mutex, PoisonError};

/// Settings stored in one NVS namespace.
pub struct NvsSettings {
    nvs: Mutex<EspNvs<NvsDefault>>,
}

impl NvsSettings {
    /// Open `namespace` on the default NVS partition, creating it if needed.
    pub fn new(partition: EspDefaultNvsPartition, namespace: &str) -> Result<Self, EspError> {
        let nvs = EspNvs::new(partition, namespace, true)?;
        info!("NVS namespace '{}' opened", namespace);
        Ok(Self {
            nvs: Mutex::new(nvs),
        })
    }
}

impl SettingsBackend for NvsSettings {
    fn load(&self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        let nvs = self.nvs.lock().unwrap_or_else(PoisonError::into_inner);

        let len = match nvs.blob_len(key)? {
            Some(len) => len,
            None => {
                debug!("No '{}' entry in NVS", key);
                return Ok(None);
            }
        };
        if len > buf.len() {
            return Ok(Some(len));
        }

        Ok(nvs.get_raw(key, buf)?.map(|bytes| bytes.len()))
    }

    fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let mut nvs = self.nvs.lock().unwrap_or_else(PoisonError::into_inner);
        nvs.set_raw(key, data)?;
        Ok(())
    }
}
