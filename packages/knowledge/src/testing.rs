//! Testing utilities.
//!
//! Deterministic fixtures and a failure-injecting store wrapper for
//! testing applications that use the engine without a real backend.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{KnowledgeError, Result};
use crate::traits::store::KnowledgeStore;
use crate::types::{
    analysis::{DocumentAnalysis, ExtractedEntities},
    knowledge::{KnowledgeItem, KnowledgeKey},
};

/// A representative document analysis: amounts, dates, entities, and
/// narrative sections all populated.
pub fn sample_analysis() -> DocumentAnalysis {
    DocumentAnalysis::new()
        .with_key_amount("Loan Amount: £2,500,000")
        .with_key_amount("LTV: 65%")
        .with_key_amount("GDV: £4.2m")
        .with_key_date("Completion Date: 25/12/2024")
        .with_key_date("Start Date: March 2024")
        .with_key_terms(["first charge", "personal guarantee"])
        .with_entities(
            ExtractedEntities::new()
                .with_company("Acme Developments Ltd")
                .with_person("Jane Smith")
                .with_location("1 High Street, Leeds"),
        )
        .with_executive_summary(
            "Ground-up development of 24 apartments in central Leeds, \
             funded by a senior facility to practical completion.",
        )
}

/// Store wrapper that fails writes for selected field paths.
///
/// Wraps any [`KnowledgeStore`] and returns a storage error from
/// `insert`/`update` when the item's field path has been marked with
/// [`FlakyStore::fail_on`]. Reads and all other paths pass through,
/// which makes partial-failure behavior observable in tests.
pub struct FlakyStore<S> {
    inner: S,
    failing_paths: RwLock<HashSet<String>>,
}

impl<S> FlakyStore<S> {
    /// Wrap a store with no failures armed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_paths: RwLock::new(HashSet::new()),
        }
    }

    /// Arm a failure for writes of the given field path.
    pub fn fail_on(&self, field_path: impl Into<String>) {
        self.failing_paths.write().unwrap().insert(field_path.into());
    }

    /// Disarm all failures.
    pub fn heal(&self) {
        self.failing_paths.write().unwrap().clear();
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, field_path: &str) -> Result<()> {
        if self.failing_paths.read().unwrap().contains(field_path) {
            return Err(KnowledgeError::Storage(
                format!("injected failure for `{field_path}`").into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: KnowledgeStore> KnowledgeStore for FlakyStore<S> {
    async fn find_by_source(
        &self,
        document_id: Uuid,
        field_path: &str,
    ) -> Result<Option<KnowledgeItem>> {
        self.inner.find_by_source(document_id, field_path).await
    }

    async fn find_active(&self, key: &KnowledgeKey) -> Result<Option<KnowledgeItem>> {
        self.inner.find_active(key).await
    }

    async fn insert(&self, item: &KnowledgeItem) -> Result<()> {
        self.check(&item.field_path)?;
        self.inner.insert(item).await
    }

    async fn update(&self, item: &KnowledgeItem) -> Result<()> {
        self.check(&item.field_path)?;
        self.inner.update(item).await
    }

    async fn mark_superseded(&self, id: Uuid, superseded_by: Uuid) -> Result<()> {
        self.inner.mark_superseded(id, superseded_by).await
    }

    async fn active_for_document(&self, document_id: Uuid) -> Result<Vec<KnowledgeItem>> {
        self.inner.active_for_document(document_id).await
    }

    async fn active_for_client(&self, client_id: Uuid) -> Result<Vec<KnowledgeItem>> {
        self.inner.active_for_client(client_id).await
    }

    async fn active_for_project(&self, project_id: Uuid) -> Result<Vec<KnowledgeItem>> {
        self.inner.active_for_project(project_id).await
    }

    async fn mark_document_reconciled(&self, document_id: Uuid) -> Result<()> {
        self.inner.mark_document_reconciled(document_id).await
    }

    async fn is_document_reconciled(&self, document_id: Uuid) -> Result<bool> {
        self.inner.is_document_reconciled(document_id).await
    }
}
