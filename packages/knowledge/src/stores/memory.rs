//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{KnowledgeError, Result};
use crate::traits::store::KnowledgeStore;
use crate::types::knowledge::{KnowledgeItem, KnowledgeKey, KnowledgeStatus};

/// In-memory knowledge store.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
pub struct MemoryStore {
    items: RwLock<HashMap<Uuid, KnowledgeItem>>,
    reconciled: RwLock<HashSet<Uuid>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            reconciled: RwLock::new(HashSet::new()),
        }
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.items.write().unwrap().clear();
        self.reconciled.write().unwrap().clear();
    }

    /// Total number of stored items, any status.
    pub fn item_count(&self) -> usize {
        self.items.read().unwrap().len()
    }

    /// Fetch an item by id.
    pub fn get(&self, id: Uuid) -> Option<KnowledgeItem> {
        self.items.read().unwrap().get(&id).cloned()
    }

    /// All items with a given status.
    pub fn items_with_status(&self, status: KnowledgeStatus) -> Vec<KnowledgeItem> {
        self.items
            .read()
            .unwrap()
            .values()
            .filter(|item| item.status == status)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn find_by_source(
        &self,
        document_id: Uuid,
        field_path: &str,
    ) -> Result<Option<KnowledgeItem>> {
        let items = self.items.read().unwrap();
        let mut matches: Vec<_> = items
            .values()
            .filter(|item| {
                item.source_document_id == document_id && item.field_path == field_path
            })
            .collect();
        // Prefer the active row when the same document also has a
        // superseded one for this path
        matches.sort_by_key(|item| item.status != KnowledgeStatus::Active);
        Ok(matches.first().map(|item| (*item).clone()))
    }

    async fn find_active(&self, key: &KnowledgeKey) -> Result<Option<KnowledgeItem>> {
        Ok(self
            .items
            .read()
            .unwrap()
            .values()
            .find(|item| item.is_active() && item.key() == *key)
            .cloned())
    }

    async fn insert(&self, item: &KnowledgeItem) -> Result<()> {
        self.items.write().unwrap().insert(item.id, item.clone());
        Ok(())
    }

    async fn update(&self, item: &KnowledgeItem) -> Result<()> {
        let mut items = self.items.write().unwrap();
        if !items.contains_key(&item.id) {
            return Err(KnowledgeError::ItemNotFound { id: item.id });
        }
        items.insert(item.id, item.clone());
        Ok(())
    }

    async fn mark_superseded(&self, id: Uuid, superseded_by: Uuid) -> Result<()> {
        let mut items = self.items.write().unwrap();
        let item = items
            .get_mut(&id)
            .ok_or(KnowledgeError::ItemNotFound { id })?;
        item.status = KnowledgeStatus::Superseded;
        item.superseded_by = Some(superseded_by);
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn active_for_document(&self, document_id: Uuid) -> Result<Vec<KnowledgeItem>> {
        Ok(self
            .items
            .read()
            .unwrap()
            .values()
            .filter(|item| item.is_active() && item.source_document_id == document_id)
            .cloned()
            .collect())
    }

    async fn active_for_client(&self, client_id: Uuid) -> Result<Vec<KnowledgeItem>> {
        Ok(self
            .items
            .read()
            .unwrap()
            .values()
            .filter(|item| item.is_active() && item.client_id == Some(client_id))
            .cloned()
            .collect())
    }

    async fn active_for_project(&self, project_id: Uuid) -> Result<Vec<KnowledgeItem>> {
        Ok(self
            .items
            .read()
            .unwrap()
            .values()
            .filter(|item| item.is_active() && item.project_id == Some(project_id))
            .cloned()
            .collect())
    }

    async fn mark_document_reconciled(&self, document_id: Uuid) -> Result<()> {
        self.reconciled.write().unwrap().insert(document_id);
        Ok(())
    }

    async fn is_document_reconciled(&self, document_id: Uuid) -> Result<bool> {
        Ok(self.reconciled.read().unwrap().contains(&document_id))
    }
}
