use std::collections::HashMap;
use std::sync::Mutex;

use super::{BlobError, BlobStore};

/// In-process blob store keyed by `(container, key)`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .ok()?
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored keys in `container`, sorted.
    pub fn keys(&self, container: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|m| {
                m.keys()
                    .filter(|(c, _)| c == container)
                    .map(|(_, k)| k.clone())
                    .collect()
            })
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        container: &str,
        key: &str,
        bytes: Vec<u8>,
        overwrite: bool,
    ) -> Result<(), BlobError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| BlobError::Unavailable(format!("memory store lock poisoned: {e}")))?;
        let id = (container.to_string(), key.to_string());
        if !overwrite && objects.contains_key(&id) {
            return Err(BlobError::AlreadyExists {
                container: id.0,
                key: id.1,
            });
        }
        objects.insert(id, bytes);
        Ok(())
    }
}
