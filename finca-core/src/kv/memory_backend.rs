use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::traits::{check_key, BackendType, KeyValueStore};
use crate::error::KvError;

/// In-memory backend, used by tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        check_key(key)?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        check_key(key)?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        check_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}
