use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{SetOptions, StorageError, StorageService};
use crate::lock;

/// Session-scoped storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, (Value, Option<DateTime<Utc>>)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageService for MemoryStorage {
    async fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut entries = lock(&self.entries);
        let expired = matches!(entries.get(key), Some((_, Some(at))) if *at <= Utc::now());
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn set_value(&self, key: &str, value: Value, options: &SetOptions) -> Result<(), StorageError> {
        let expires_at = options.expires.map(|e| e.resolve(Utc::now()));
        lock(&self.entries).insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        lock(&self.entries).clear();
        Ok(())
    }
}
