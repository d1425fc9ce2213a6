use std::{collections::BTreeMap, path::PathBuf};

use serde_json::Value;

use crate::error::StorageError;

/// A small key-value store of JSON values.
///
/// File-backed stores are written through on every change, so a value saved
/// before the process exits is there on the next start. In-memory stores are
/// used by tests.
#[derive(Debug, Clone, Default)]
pub struct Storage {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Value>,
}

impl Storage {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store at `path`. A missing or empty file is an empty store.
    ///
    /// The file and its parent directories are created on the first write.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Io`] when the file exists but cannot be read
    /// - [`StorageError::Serde`] when it does not hold a JSON object
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// let mut durable = Storage::open(config.durable_store_path()).await?;
    /// durable.save("verifier", json!(code_verifier)).await?;
    /// ```
    pub async fn open(path: PathBuf) -> Result<Self, StorageError> {
        let entries = match async_fs::read_to_string(&path).await {
            Ok(json) if json.trim().is_empty() => BTreeMap::new(),
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::Io(e)),
        };

        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn load(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    /// Loads a value stored as a JSON string.
    pub fn load_str(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub async fn save(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.persist().await
    }

    /// Removes `key`, returning its previous value.
    pub async fn remove(&mut self, key: &str) -> Result<Option<Value>, StorageError> {
        let previous = self.entries.remove(key);
        if previous.is_some() {
            self.persist().await?;
        }
        Ok(previous)
    }

    /// Removes `key` and returns it if it held a string.
    pub async fn take_str(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .remove(key)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    pub async fn clear(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        match &self.path {
            Some(path) => match async_fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StorageError::Io(e)),
            },
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn persist(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        async_fs::write(path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/durable.json");

        let mut store = Storage::open(path.clone()).await.unwrap();
        assert!(store.is_empty());
        store.save("verifier", json!("abc")).await.unwrap();

        let reopened = Storage::open(path).await.unwrap();
        assert_eq!(reopened.load_str("verifier").as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn take_str_removes_the_entry() {
        let mut store = Storage::in_memory();
        store.save("verifier", json!("abc")).await.unwrap();

        assert_eq!(store.take_str("verifier").await.unwrap().as_deref(), Some("abc"));
        assert!(!store.has("verifier"));
        assert_eq!(store.take_str("verifier").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache/session.json");

        let mut store = Storage::open(path.clone()).await.unwrap();
        store.save("userData", json!({"id": "u1"})).await.unwrap();
        assert!(path.is_file());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert_eq!(store.len(), 0);

        // clearing twice is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            Storage::open(path).await,
            Err(StorageError::Serde(_))
        ));
    }
}
