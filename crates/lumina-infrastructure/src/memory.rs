//! JSON-file memory store.

use crate::storage::atomic_json::AtomicJsonFile;
use async_trait::async_trait;
use lumina_core::LuminaError;
use lumina_core::error::Result;
use lumina_core::memory::{MemoryItem, MemoryRepository};
use std::path::PathBuf;

/// Memory facts backed by a single JSON file, in insertion order.
pub struct JsonMemoryRepository {
    file: AtomicJsonFile<Vec<MemoryItem>>,
}

impl JsonMemoryRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    fn load_all(&self) -> Result<Vec<MemoryItem>> {
        Ok(self.file.load().map_err(LuminaError::from)?.unwrap_or_default())
    }
}

#[async_trait]
impl MemoryRepository for JsonMemoryRepository {
    async fn list_all(&self) -> Result<Vec<MemoryItem>> {
        self.load_all()
    }

    async fn add(&self, item: &MemoryItem) -> Result<()> {
        let item = item.clone();
        self.file.update(Vec::new(), move |items| {
            items.push(item);
            Ok(())
        })?;
        Ok(())
    }

    async fn update_fact(&self, id: &str, fact: &str) -> Result<()> {
        // Existence is checked inside the locked update so a concurrent
        // writer cannot invalidate it between check and modification.
        let mut found = false;
        self.file.update(Vec::new(), |items| {
            if let Some(item) = items.iter_mut().find(|i| i.id == id) {
                item.fact = fact.to_string();
                found = true;
            }
            Ok(())
        })?;
        if !found {
            return Err(LuminaError::not_found("memory item", id));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut found = false;
        self.file.update(Vec::new(), |items| {
            let before = items.len();
            items.retain(|i| i.id != id);
            found = items.len() != before;
            Ok(())
        })?;
        if !found {
            return Err(LuminaError::not_found("memory item", id));
        }
        Ok(())
    }
}
