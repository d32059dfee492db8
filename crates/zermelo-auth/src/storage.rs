use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Default cache file name, relative to the working directory
pub const DEFAULT_CACHE_FILE: &str = "cache.json";

/// Persistent mapping of user ids to access tokens
pub trait TokenStore: Send + Sync {
    /// Look up the token cached for `user`
    fn get(&self, user: &str) -> Result<String, StorageError>;

    /// Cache `token` for `user`, replacing any previous token
    fn save(&self, user: &str, token: &str) -> Result<(), StorageError>;

    /// Drop the token cached for `user`. Returns whether one was present.
    fn remove(&self, user: &str) -> Result<bool, StorageError>;

    /// Clear every cached token. Does nothing unless `confirm` is true.
    fn reset(&self, confirm: bool) -> Result<(), StorageError>;
}

/// On-disk shape of the token cache: `{ "tokens": { "<user>": "<token>" } }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,

    /// Unrelated top-level keys are kept so a rewrite does not drop them
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Token store backed by a single JSON document on disk.
///
/// Every write re-serializes the whole document (read-modify-write) without
/// any locking. Two processes saving into the same file concurrently can
/// lose each other's updates; the last writer wins.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    location: PathBuf,
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self {
            location: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }
}

impl FileTokenStore {
    /// Create a store using `path` if a file already exists there,
    /// otherwise the default `cache.json`
    pub fn new(path: impl AsRef<Path>) -> Self {
        let mut store = Self::default();
        store.set_location(path);
        store
    }

    /// Create an empty cache document at `path` (unless one exists) and use it.
    ///
    /// # Errors
    /// Fails when the file or its parent directory cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            write_document(path, &TokenCache::default())?;
            tracing::info!("Created token cache at {:?}", path);
        }

        Ok(Self {
            location: path.to_path_buf(),
        })
    }

    /// Switch to `path`, but only if a file already exists there.
    ///
    /// Returns whether the location changed.
    pub fn set_location(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if path.is_file() {
            self.location = path.to_path_buf();
            true
        } else {
            tracing::warn!(
                "Token cache {:?} does not exist, keeping {:?}",
                path,
                self.location
            );
            false
        }
    }

    /// The cache file currently in use
    pub fn location(&self) -> &Path {
        &self.location
    }

    fn read_document(&self) -> Result<TokenCache, StorageError> {
        let json = fs::read_to_string(&self.location)?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn write_document(path: &Path, document: &TokenCache) -> Result<(), StorageError> {
    let json = serde_json::to_string(document)?;
    fs::write(path, json)?;
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn get(&self, user: &str) -> Result<String, StorageError> {
        let document = self.read_document().map_err(|e| {
            tracing::debug!("Token cache {:?} unreadable: {}", self.location, e);
            StorageError::TokenNotFound(user.to_string())
        })?;

        document
            .tokens
            .get(user)
            .cloned()
            .ok_or_else(|| StorageError::TokenNotFound(user.to_string()))
    }

    fn save(&self, user: &str, token: &str) -> Result<(), StorageError> {
        let mut document = self.read_document().unwrap_or_default();
        document.tokens.insert(user.to_string(), token.to_string());
        write_document(&self.location, &document)?;

        tracing::info!("Stored token for user {}", user);
        Ok(())
    }

    fn remove(&self, user: &str) -> Result<bool, StorageError> {
        let mut document = match self.read_document() {
            Ok(document) => document,
            Err(_) => return Ok(false),
        };

        let existed = document.tokens.remove(user).is_some();
        if existed {
            write_document(&self.location, &document)?;
            tracing::info!("Removed token for user {}", user);
        }
        Ok(existed)
    }

    fn reset(&self, confirm: bool) -> Result<(), StorageError> {
        if !confirm {
            tracing::warn!("Token cache reset requested without confirmation, ignoring");
            return Ok(());
        }

        write_document(&self.location, &TokenCache::default())?;
        tracing::info!("Cleared token cache {:?}", self.location);
        Ok(())
    }
}
