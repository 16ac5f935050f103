//! Persisted GitHub token.
//!
//! The token is XOR-ed with a fixed salt and hex encoded before it is stored.
//! This is NOT encryption: anyone who can read the storage file and this
//! source can recover the token. It only keeps the plaintext token out of a
//! casual grep of the data directory.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::TokenError;

const SALT: &str = "kanban-app-";
pub const STORAGE_KEY: &str = "gh_auth";

const fn salt_key() -> u8 {
    let bytes = SALT.as_bytes();
    let mut key = 0u8;
    let mut i = 0;
    while i < bytes.len() {
        key ^= bytes[i];
        i += 1;
    }
    key
}

const KEY: u8 = salt_key();

/// Obfuscate a token for storage. Reversible with [`reveal`].
pub fn obfuscate(text: &str) -> String {
    hex::encode(text.bytes().map(|b| b ^ KEY).collect::<Vec<u8>>())
}

/// Undo [`obfuscate`].
pub fn reveal(encoded: &str) -> Result<String, TokenError> {
    let bytes = hex::decode(encoded).map_err(|e| TokenError::Decode(e.to_string()))?;
    String::from_utf8(bytes.into_iter().map(|b| b ^ KEY).collect())
        .map_err(|e| TokenError::Decode(e.to_string()))
}

/// String key/value persistence, the local-storage seam.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> std::io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;
    fn remove(&self, key: &str) -> std::io::Result<()>;
}

/// JSON object on disk, one entry per key.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the gitboard data directory.
    pub fn open_default() -> Self {
        Self::new(crate::config::data_dir().join("storage.json"))
    }

    fn load(&self) -> std::io::Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents).unwrap_or_default())
    }

    fn save(&self, data: &Map<String, Value>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, json)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        Ok(self
            .load()?
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from))
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut data = self.load()?;
        data.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&data)
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        let mut data = self.load()?;
        if data.remove(key).is_some() {
            self.save(&data)?;
        }
        Ok(())
    }
}

/// Process-local store, mostly for tests.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

pub struct TokenStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> TokenStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn save(&self, token: &str) -> Result<(), TokenError> {
        self.store.set(STORAGE_KEY, &obfuscate(token))?;
        Ok(())
    }

    /// `Ok(None)` when nothing is stored.
    pub fn get(&self) -> Result<Option<String>, TokenError> {
        match self.store.get(STORAGE_KEY)? {
            Some(encoded) if !encoded.is_empty() => reveal(&encoded).map(Some),
            _ => Ok(None),
        }
    }

    /// Like [`TokenStore::get`], but a malformed or unreadable entry counts
    /// as no token.
    pub fn current(&self) -> Option<String> {
        match self.get() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Ignoring stored token: {e}");
                None
            }
        }
    }

    pub fn clear(&self) -> Result<(), TokenError> {
        self.store.remove(STORAGE_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obfuscation_is_reversible() {
        let token = "ghp_abcdefABCDEF0123456789";
        let encoded = obfuscate(token);
        assert_ne!(encoded, token);
        assert_eq!(encoded.len(), token.len() * 2);
        assert!(encoded.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(reveal(&encoded).unwrap(), token);
    }

    #[test]
    fn obfuscation_handles_non_ascii() {
        let token = "tøkén";
        assert_eq!(reveal(&obfuscate(token)).unwrap(), token);
    }

    #[test]
    fn reveal_rejects_malformed_input() {
        assert!(matches!(reveal("abc"), Err(TokenError::Decode(_))));
        assert!(matches!(reveal("zz"), Err(TokenError::Decode(_))));
        let err = reveal("0g").unwrap_err();
        assert!(err.to_string().contains("Invalid character"), "{err}");
    }

    #[test]
    fn obfuscated_form_is_lowercase_hex_of_xored_bytes() {
        assert_eq!(obfuscate("A"), format!("{:02x}", b'A' ^ KEY));
        assert_eq!(reveal(&obfuscate("A").to_uppercase()).unwrap(), "A");
    }

    #[test]
    fn get_returns_none_when_empty() {
        let tokens = TokenStore::new(MemoryStore::new());
        assert_eq!(tokens.get().unwrap(), None);
    }

    #[test]
    fn token_is_not_stored_in_plaintext() {
        let store = MemoryStore::new();
        let tokens = TokenStore::new(store);
        tokens.save("ghp_secret").unwrap();
        let raw = tokens.store.get(STORAGE_KEY).unwrap().unwrap();
        assert!(!raw.contains("secret"));
        assert_eq!(tokens.get().unwrap().as_deref(), Some("ghp_secret"));
    }

    #[test]
    fn get_after_clear_returns_none() {
        let tokens = TokenStore::new(MemoryStore::new());
        tokens.save("ghp_first").unwrap();
        tokens.clear().unwrap();
        assert_eq!(tokens.get().unwrap(), None);
        assert_eq!(tokens.current(), None);
    }

    #[test]
    fn malformed_entry_is_treated_as_missing() {
        let store = MemoryStore::new();
        store.set(STORAGE_KEY, "not-hex!").unwrap();
        let tokens = TokenStore::new(store);
        assert!(matches!(tokens.get(), Err(TokenError::Decode(_))));
        assert_eq!(tokens.current(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        TokenStore::new(FileStore::new(&path)).save("ghp_disk").unwrap();
        let reopened = TokenStore::new(FileStore::new(&path));
        assert_eq!(reopened.get().unwrap().as_deref(), Some("ghp_disk"));

        reopened.clear().unwrap();
        assert_eq!(TokenStore::new(FileStore::new(&path)).get().unwrap(), None);
    }

    #[test]
    fn file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("storage.json"));
        store.set("theme", "dark").unwrap();
        let tokens = TokenStore::new(store);
        tokens.save("ghp_x").unwrap();
        tokens.clear().unwrap();
        assert_eq!(tokens.store.get("theme").unwrap().as_deref(), Some("dark"));
    }
}
