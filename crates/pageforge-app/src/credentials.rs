//! Persisted API key record
//!
//! One flat JSON object in `<data_home>/credentials.json`, stored as-is.
//! Writes hold an exclusive lock on a sidecar `.lock` file and go through a
//! temp file plus rename, so readers never see a partial record.

use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use pageforge_core::prelude::*;
use pageforge_core::{ApiKeys, Provider};

pub const CREDENTIALS_FILENAME: &str = "credentials.json";

/// Owns the key record and its on-disk copy.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    keys: ApiKeys,
}

impl CredentialStore {
    /// Open the store in `data_dir`, loading whatever is there.
    pub fn open(data_dir: &Path) -> Self {
        let path = data_dir.join(CREDENTIALS_FILENAME);
        let keys = load(&path);
        Self { path, keys }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// In-memory copy of the record.
    pub fn keys(&self) -> &ApiKeys {
        &self.keys
    }

    pub fn get(&self, provider: Provider) -> &str {
        self.keys.get(provider)
    }

    /// Replace the record on disk, then in memory.
    ///
    /// On error neither copy changes.
    pub fn save(&mut self, keys: ApiKeys) -> Result<()> {
        write_record(&self.path, &keys)?;
        self.keys = keys;
        Ok(())
    }
}

/// Read a key record; absent or unparseable data yields all-empty keys.
pub fn load(path: &Path) -> ApiKeys {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No credential record at {:?}", path);
            return ApiKeys::default();
        }
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            return ApiKeys::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(keys) => keys,
        Err(e) => {
            warn!("Failed to parse credential record {:?}: {}", path, e);
            ApiKeys::default()
        }
    }
}

fn write_record(path: &Path, keys: &ApiKeys) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::config(format!("Invalid credential path: {:?}", path)))?;
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::config(format!("Failed to create data dir: {}", e)))?;

    let lock_path = path.with_extension("json.lock");
    let lock = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| Error::config(format!("Failed to open credential lock: {}", e)))?;
    lock.lock_exclusive()
        .map_err(|e| Error::config(format!("Failed to lock credentials: {}", e)))?;

    let content = serde_json::to_string_pretty(keys)?;
    let temp_path = path.with_extension("json.tmp");
    let mut file = std::fs::File::create(&temp_path)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    drop(file);

    std::fs::rename(&temp_path, path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    // Lock is released when `lock` is dropped
    info!("Saved credential record to {:?}", path);
    Ok(())
}
