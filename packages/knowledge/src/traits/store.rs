//! Storage trait for knowledge items - the persistence boundary.
//!
//! The reconciler is generic over this trait; [`crate::stores`] ships a
//! memory implementation and an optional SQLite one. Collaborators
//! query active (non-superseded) items by source document, client, or
//! project; no other query patterns are required.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::knowledge::{KnowledgeItem, KnowledgeKey};

/// Durable store of knowledge items.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Find the item a given source document wrote for a field path,
    /// regardless of status. When both an active and a superseded item
    /// exist for the pair, the active one is returned.
    async fn find_by_source(
        &self,
        document_id: Uuid,
        field_path: &str,
    ) -> Result<Option<KnowledgeItem>>;

    /// Find the current active item for a reconciliation key.
    async fn find_active(&self, key: &KnowledgeKey) -> Result<Option<KnowledgeItem>>;

    /// Find the current active item for a project and field path.
    async fn find_active_for_project_field(
        &self,
        project_id: Uuid,
        field_path: &str,
    ) -> Result<Option<KnowledgeItem>> {
        self.find_active(&KnowledgeKey::for_project(project_id, field_path))
            .await
    }

    /// Insert a new item.
    async fn insert(&self, item: &KnowledgeItem) -> Result<()>;

    /// Patch an existing item in place, matched by id.
    async fn update(&self, item: &KnowledgeItem) -> Result<()>;

    /// Flip an item to superseded, linking its replacement. The row is
    /// immutable afterwards.
    async fn mark_superseded(&self, id: Uuid, superseded_by: Uuid) -> Result<()>;

    /// Active items contributed by a source document.
    async fn active_for_document(&self, document_id: Uuid) -> Result<Vec<KnowledgeItem>>;

    /// Active items for a client.
    async fn active_for_client(&self, client_id: Uuid) -> Result<Vec<KnowledgeItem>>;

    /// Active items for a project.
    async fn active_for_project(&self, project_id: Uuid) -> Result<Vec<KnowledgeItem>>;

    /// Record that a document has contributed to the knowledge store.
    /// Idempotent.
    async fn mark_document_reconciled(&self, document_id: Uuid) -> Result<()>;

    /// Whether a document has contributed to the knowledge store.
    async fn is_document_reconciled(&self, document_id: Uuid) -> Result<bool>;
}
