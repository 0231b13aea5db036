//! Long-term memory facts.
//!
//! Memory items are short free-text facts the assistant has learned about
//! the user, grouped by a category label. They are owned by the front-end
//! layer (plain CRUD) and summarized into the system instruction each turn.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single remembered fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique identifier (UUID format)
    pub id: String,
    /// The remembered fact, free text
    pub fact: String,
    /// Category label for display grouping
    pub category: String,
}

impl MemoryItem {
    /// Creates a new memory item with a generated ID.
    pub fn new(fact: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fact: fact.into(),
            category: category.into(),
        }
    }
}

/// An abstract repository for memory item persistence.
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    /// Lists all memory items in insertion order.
    async fn list_all(&self) -> Result<Vec<MemoryItem>>;

    /// Appends a memory item.
    async fn add(&self, item: &MemoryItem) -> Result<()>;

    /// Replaces the fact text of an existing item.
    ///
    /// Returns `NotFound` if no item with the given ID exists.
    async fn update_fact(&self, id: &str, fact: &str) -> Result<()>;

    /// Deletes a memory item.
    ///
    /// Returns `NotFound` if no item with the given ID exists.
    async fn delete(&self, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_has_unique_id() {
        let a = MemoryItem::new("likes rust", "preferences");
        let b = MemoryItem::new("likes rust", "preferences");
        assert_ne!(a.id, b.id);
        assert_eq!(a.fact, "likes rust");
        assert_eq!(a.category, "preferences");
    }
}
