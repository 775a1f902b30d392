use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache entry could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Unbounded string store, the backing of every [`TimedCache`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a directory. Writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        self.root.join(format!("{}.json", file_name))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root).await?;

        let path = self.path_for(key);
        let temp_path = self.root.join(format!(".{}.tmp", Uuid::new_v4()));

        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await?;
        file.write_all(value.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        if let Err(err) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err.into());
        }

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(key)).await {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// Milliseconds since the epoch at write time.
    timestamp: i64,
    value: T,
}

/// Typed values with a time-to-live measured from write time.
pub struct TimedCache<T> {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for TimedCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ttl: self.ttl,
            _value: PhantomData,
        }
    }
}

impl<T> TimedCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            _value: PhantomData,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn read(&self, key: &str) -> Option<T> {
        self.read_at(key, Utc::now()).await
    }

    /// Missing, expired and unreadable entries all read as `None`.
    pub async fn read_at(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("Cache read of '{}' failed: {}", key, err);
                return None;
            }
        };

        let entry = match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Discarding unreadable cache entry '{}': {}", key, err);
                return None;
            }
        };

        let age = now.timestamp_millis() - entry.timestamp;
        if age >= self.ttl.num_milliseconds() {
            debug!("Cache entry '{}' expired ({} ms old)", key, age);
            return None;
        }

        Some(entry.value)
    }

    pub async fn write(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.write_at(key, value, Utc::now()).await
    }

    pub async fn write_at(&self, key: &str, value: &T, now: DateTime<Utc>) -> Result<(), CacheError> {
        let entry = CacheEntry {
            timestamp: now.timestamp_millis(),
            value,
        };

        self.store.set(key, serde_json::to_string(&entry)?).await
    }

    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.store.remove(key).await
    }
}
