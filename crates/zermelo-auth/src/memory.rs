use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::StorageError;
use crate::storage::TokenStore;

/// Token store kept in process memory. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-filled with `(user, token)` pairs.
    pub fn with_tokens<I, U, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (U, T)>,
        U: Into<String>,
        T: Into<String>,
    {
        Self {
            tokens: Mutex::new(
                tokens
                    .into_iter()
                    .map(|(user, token)| (user.into(), token.into()))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, user: &str) -> Result<String, StorageError> {
        self.tokens
            .lock()
            .get(user)
            .cloned()
            .ok_or_else(|| StorageError::TokenNotFound(user.to_string()))
    }

    fn save(&self, user: &str, token: &str) -> Result<(), StorageError> {
        self.tokens
            .lock()
            .insert(user.to_string(), token.to_string());
        Ok(())
    }

    fn remove(&self, user: &str) -> Result<bool, StorageError> {
        Ok(self.tokens.lock().remove(user).is_some())
    }

    fn reset(&self, confirm: bool) -> Result<(), StorageError> {
        if confirm {
            self.tokens.lock().clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let store = MemoryTokenStore::new();
        store.save("12345", "abc").unwrap();
        assert_eq!(store.get("12345").unwrap(), "abc");
    }

    #[test]
    fn test_miss() {
        let store = MemoryTokenStore::new();
        assert!(matches!(
            store.get("unknown-user"),
            Err(StorageError::TokenNotFound(_))
        ));
    }

    #[test]
    fn test_with_tokens_and_reset() {
        let store = MemoryTokenStore::with_tokens([("a", "1"), ("b", "2")]);
        assert_eq!(store.len(), 2);

        store.reset(false).unwrap();
        assert_eq!(store.len(), 2);

        store.reset(true).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove() {
        let store = MemoryTokenStore::with_tokens([("a", "1")]);
        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
    }
}
