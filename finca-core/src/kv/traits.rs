//! Key-value store abstraction
//!
//! This module defines the trait every persistence backend implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::KvError;

/// Types of key-value backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// One JSON file per key inside a directory
    File,
    /// A single SQLite database file
    Sqlite,
    /// Process memory only, nothing survives a restart
    Memory,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::File => write!(f, "file"),
            BackendType::Sqlite => write!(f, "SQLite"),
            BackendType::Memory => write!(f, "memory"),
        }
    }
}

/// Core trait for key-value backends
///
/// Values are opaque strings; the collection layer decides what they contain.
/// A `set` replaces the whole value for a key. Readers never observe a
/// half-written value, and concurrent `set` calls on the same key are
/// applied one after the other.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    /// Reads the value for `key`, `None` if it was never written or was removed
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Overwrites the value for `key`
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Removes `key`; removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<(), KvError>;

    /// Lists the keys currently stored, sorted
    async fn keys(&self) -> Result<Vec<String>, KvError>;

    /// Returns true if a value is stored under `key`
    async fn contains(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Keys become file names in the file backend, so they are restricted
/// to ASCII letters, digits, `_` and `-`
pub(crate) fn check_key(key: &str) -> Result<(), KvError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(KvError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key() {
        assert!(check_key("fincas").is_ok());
        assert!(check_key("rememberedEmail").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("../etc").is_err());
        assert!(check_key("a b").is_err());
    }
}
