//! JSON-file token store.
//!
//! The file is a single JSON object keyed by [`lookup_key`]. Every mutation
//! rewrites the whole file through a temp file in the same directory, and one
//! mutex per vault serialises those read-modify-write cycles. Reads go
//! straight to disk without the lock.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use super::crypto::{self, EncryptedToken};
use super::error::EncryptionError;

const REQUIRED_ENTRY_FIELDS: [&str; 4] =
    ["confluence_url", "username", "encrypted_token_data", "created_at"];
const REQUIRED_CRYPTO_FIELDS: [&str; 4] = ["encrypted_token", "salt", "algorithm", "iterations"];

/// One stored credential as it appears in the backing file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub confluence_url: String,
    pub username: String,
    pub encrypted_token_data: EncryptedToken,
    pub created_at: String,
    pub last_used: Option<String>,
}

/// Credential metadata safe to show to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
    pub confluence_url: String,
    pub username: String,
    pub created_at: String,
    pub last_used: Option<String>,
}

/// Fixed-width index for a (url, username) pair.
pub fn lookup_key(confluence_url: &str, username: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", confluence_url, username).as_bytes());
    let hex = format!("{:x}", digest);
    hex[..16].to_string()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub struct TokenVault {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TokenVault {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Token vault initialized at {:?}", path);
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encrypt `token` and store it for (url, username), replacing any
    /// previous entry. Returns false if anything went wrong.
    pub fn save(&self, token: &str, password: &str, confluence_url: &str, username: &str) -> bool {
        match self.try_save(token, password, confluence_url, username) {
            Ok(()) => {
                info!("Token saved for {}@{}", username, confluence_url);
                true
            }
            Err(e) => {
                error!("Failed to save token for {}@{}: {}", username, confluence_url, e);
                false
            }
        }
    }

    fn try_save(
        &self,
        token: &str,
        password: &str,
        confluence_url: &str,
        username: &str,
    ) -> Result<(), EncryptionError> {
        // Key derivation is slow; keep it outside the lock.
        let encrypted = crypto::encrypt(token, password)?;
        let entry = StoredCredential {
            confluence_url: confluence_url.to_string(),
            username: username.to_string(),
            encrypted_token_data: encrypted,
            created_at: timestamp(),
            last_used: None,
        };
        let value = serde_json::to_value(entry)?;

        let _guard = self.lock();
        let mut entries = self.read_entries();
        entries.insert(lookup_key(confluence_url, username), value);
        self.write_entries(&entries)
    }

    /// Decrypt the token stored for (url, username).
    ///
    /// Returns None both when nothing is stored and when decryption fails, so
    /// callers cannot probe for existing entries with a wrong password.
    pub fn load(&self, password: &str, confluence_url: &str, username: &str) -> Option<String> {
        let key = lookup_key(confluence_url, username);
        let entries = self.read_entries();

        let Some(raw) = entries.get(&key) else {
            warn!("No token stored for {}@{}", username, confluence_url);
            return None;
        };

        let entry: StoredCredential = match serde_json::from_value(raw.clone()) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Malformed token entry for {}@{}: {}", username, confluence_url, e);
                return None;
            }
        };

        let token = match crypto::decrypt(&entry.encrypted_token_data, password) {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to load token for {}@{}: {}", username, confluence_url, e);
                return None;
            }
        };

        if let Err(e) = self.touch_last_used(&key) {
            warn!("Failed to record token use for {}@{}: {}", username, confluence_url, e);
        }

        info!("Token loaded for {}@{}", username, confluence_url);
        Some(token)
    }

    fn touch_last_used(&self, key: &str) -> Result<(), EncryptionError> {
        let _guard = self.lock();
        let mut entries = self.read_entries();
        if let Some(Value::Object(entry)) = entries.get_mut(key) {
            entry.insert("last_used".to_string(), Value::String(timestamp()));
            self.write_entries(&entries)?;
        }
        Ok(())
    }

    /// Remove the entry for (url, username). True only if one was removed.
    pub fn delete(&self, confluence_url: &str, username: &str) -> bool {
        let _guard = self.lock();
        let mut entries = self.read_entries();

        if entries.remove(&lookup_key(confluence_url, username)).is_none() {
            warn!("No token to delete for {}@{}", username, confluence_url);
            return false;
        }

        match self.write_entries(&entries) {
            Ok(()) => {
                info!("Token deleted for {}@{}", username, confluence_url);
                true
            }
            Err(e) => {
                error!("Failed to delete token for {}@{}: {}", username, confluence_url, e);
                false
            }
        }
    }

    /// Metadata for every well-formed entry. Never includes secrets.
    pub fn list(&self) -> Vec<CredentialSummary> {
        self.read_entries()
            .into_iter()
            .filter_map(|(key, raw)| match serde_json::from_value::<StoredCredential>(raw) {
                Ok(entry) => Some(CredentialSummary {
                    confluence_url: entry.confluence_url,
                    username: entry.username,
                    created_at: entry.created_at,
                    last_used: entry.last_used,
                }),
                Err(e) => {
                    warn!("Skipping malformed token entry {}: {}", key, e);
                    None
                }
            })
            .collect()
    }

    /// Check that the store parses and every entry carries the required
    /// fields. A store that does not exist yet is valid.
    pub fn validate_store_integrity(&self) -> bool {
        if !self.path.exists() {
            return true;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to read token store {:?}: {}", self.path, e);
                return false;
            }
        };

        let data: Value = match serde_json::from_str(&content) {
            Ok(data) => data,
            Err(e) => {
                error!("Token store {:?} is not valid JSON: {}", self.path, e);
                return false;
            }
        };

        let Value::Object(entries) = data else {
            error!("Token store {:?} is not a JSON object", self.path);
            return false;
        };

        entries.iter().all(|(key, entry)| {
            let valid = entry_is_complete(entry);
            if !valid {
                error!("Token entry {} is missing required fields", key);
            }
            valid
        })
    }

    fn read_entries(&self) -> BTreeMap<String, Value> {
        if !self.path.exists() {
            return BTreeMap::new();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to read token store {:?}: {}", self.path, e);
                return BTreeMap::new();
            }
        };

        match serde_json::from_str::<Map<String, Value>>(&content) {
            Ok(map) => map.into_iter().collect(),
            Err(e) => {
                error!("Failed to parse token store {:?}: {}", self.path, e);
                BTreeMap::new()
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, Value>) -> Result<(), EncryptionError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let content = serde_json::to_string_pretty(entries)?;
        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;
        restrict_permissions(file.as_file())?;

        file.persist(&self.path)
            .map_err(|e| EncryptionError::Store(e.error.to_string()))?;

        debug!("Wrote {} token entries to {:?}", entries.len(), self.path);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn entry_is_complete(entry: &Value) -> bool {
    let Value::Object(fields) = entry else {
        return false;
    };
    if !REQUIRED_ENTRY_FIELDS.iter().all(|f| fields.contains_key(*f)) {
        return false;
    }
    match fields.get("encrypted_token_data") {
        Some(Value::Object(crypto_fields)) => REQUIRED_CRYPTO_FIELDS
            .iter()
            .all(|f| crypto_fields.contains_key(*f)),
        _ => false,
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}
