//! File-backed settings for host builds.
//!
//! Each key is one file under `~/.winc-bridge/<namespace>/` by default.

use super::{SettingsBackend, StoreError};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Settings stored as one file per key in a directory.
pub struct FileSettings {
    dir: PathBuf,
}

impl FileSettings {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Settings under `~/.winc-bridge/<namespace>`.
    pub fn open_default(namespace: &str) -> io::Result<Self> {
        Ok(Self::new(default_settings_dir()?.join(namespace)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

/// Returns `~/.winc-bridge`.
pub fn default_settings_dir() -> io::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home).join(".winc-bridge"))
}

impl SettingsBackend for FileSettings {
    fn load(&self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        let path = self.path(key);
        let data = match fs::read(&path) {
            Ok(data) => zeroize::Zeroizing::new(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No settings file at {:?}", path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(Some(data.len()))
    }

    fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        fs::write(&path, data)?;
        info!("Settings '{}' saved to {:?}", key, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::{ApParameters, Security};
    use crate::storage::{CredentialStore, AP_PARAMETERS_KEY};
    use std::env;
    use std::sync::atomic::{AtomicU32, Ordering};

    // Counter to keep test directories unique under parallel execution
    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn unique_settings_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let pid = std::process::id();
        env::temp_dir().join(format!("winc-bridge-test-{}-{}", pid, id))
    }

    #[test]
    fn test_missing_key() {
        let settings = FileSettings::new(unique_settings_dir());
        let mut buf = [0u8; 8];
        assert_eq!(settings.load("absent", &mut buf).unwrap(), None);
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = unique_settings_dir();
        let settings = FileSettings::new(dir.join("nested"));
        settings.save("key", b"value").unwrap();

        let mut buf = [0u8; 3];
        assert_eq!(settings.load("key", &mut buf).unwrap(), Some(5));
        assert_eq!(&buf, b"val");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_credentials_survive_reopen() {
        let dir = unique_settings_dir();
        let params = ApParameters::new(b"Home", Security::Wpa, b"secret123").unwrap();

        CredentialStore::new(Box::new(FileSettings::new(&dir)))
            .save(&params)
            .expect("Failed to save");
        assert!(dir.join(AP_PARAMETERS_KEY).exists());

        let loaded = CredentialStore::new(Box::new(FileSettings::new(&dir)))
            .load()
            .expect("Failed to load")
            .expect("Nothing stored");
        assert_eq!(loaded.as_bytes(), params.as_bytes());

        let _ = fs::remove_dir_all(&dir);
    }
}
