//! Knowledge reconciler - merges extracted fields into the store.
//!
//! For every incoming field the reconciler decides, in order: patch the
//! same source document's earlier item in place, supersede another
//! source's active item when the new confidence is strictly higher,
//! insert fresh, or discard. Superseded items keep a `superseded_by`
//! link, so history is never lost.
//!
//! Fields are independent: a store failure on one field is logged and
//! the rest proceed. Each field's read-decide-write runs under a
//! per-key async lock, so two documents reconciling the same
//! `(client | project, field_path)` concurrently cannot both supersede
//! one active item.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{KnowledgeError, Result};
use crate::traits::store::KnowledgeStore;
use crate::types::{
    field::{ExtractedField, FieldScope},
    knowledge::{KnowledgeItem, KnowledgeKey, SourceDocument},
};

/// Counts reported back to the caller after a reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Fields that created a brand-new knowledge item
    pub added: usize,
    /// Fields that patched or superseded an existing item
    pub updated: usize,
}

impl ReconcileOutcome {
    /// Total fields that changed the store.
    pub fn total(&self) -> usize {
        self.added + self.updated
    }
}

enum FieldAction {
    Added,
    Updated,
    Discarded,
}

/// Merges extracted fields into a [`KnowledgeStore`].
pub struct Reconciler<S> {
    store: S,
    key_locks: Mutex<HashMap<KnowledgeKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: KnowledgeStore> Reconciler<S> {
    /// Create a reconciler over a store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconcile one document's extracted fields into the store.
    ///
    /// Per-field failures are logged and skipped; the returned counts
    /// reflect only the fields that succeeded. Afterwards the document
    /// is flagged as having contributed to the knowledge store.
    pub async fn reconcile(
        &self,
        document: &SourceDocument,
        fields: &[ExtractedField],
    ) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();

        for field in fields {
            match self.reconcile_field(document, field).await {
                Ok(FieldAction::Added) => outcome.added += 1,
                Ok(FieldAction::Updated) => outcome.updated += 1,
                Ok(FieldAction::Discarded) => {}
                Err(error) => warn!(
                    field_path = %field.field_path,
                    document_id = %document.id,
                    %error,
                    "failed to reconcile field"
                ),
            }
        }

        self.store.mark_document_reconciled(document.id).await?;
        info!(
            document_id = %document.id,
            added = outcome.added,
            updated = outcome.updated,
            "reconciled document into knowledge store"
        );
        Ok(outcome)
    }

    async fn reconcile_field(
        &self,
        document: &SourceDocument,
        field: &ExtractedField,
    ) -> Result<FieldAction> {
        let key = resolve_key(document, field)?;

        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        // Same source re-extracted: idempotent patch, not a new fact
        if let Some(mut existing) = self
            .store
            .find_by_source(document.id, &field.field_path)
            .await?
        {
            existing.apply_field(field);
            self.store.update(&existing).await?;
            return Ok(FieldAction::Updated);
        }

        match self.store.find_active(&key).await? {
            Some(active) if field.confidence > active.normalization_confidence => {
                let replacement = KnowledgeItem::from_extracted(document, &key, field);
                self.store.insert(&replacement).await?;
                self.store.mark_superseded(active.id, replacement.id).await?;
                debug!(
                    field_path = %key.field_path,
                    old = active.normalization_confidence,
                    new = field.confidence,
                    "superseded knowledge item"
                );
                Ok(FieldAction::Updated)
            }
            Some(active) => {
                debug!(
                    field_path = %key.field_path,
                    existing = active.normalization_confidence,
                    incoming = field.confidence,
                    "discarding lower-confidence field"
                );
                Ok(FieldAction::Discarded)
            }
            None => {
                let item = KnowledgeItem::from_extracted(document, &key, field);
                self.store.insert(&item).await?;
                Ok(FieldAction::Added)
            }
        }
    }

    fn key_lock(&self, key: &KnowledgeKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap();
        locks.entry(key.clone()).or_default().clone()
    }
}

/// Resolve the reconciliation key for a field against its document.
fn resolve_key(document: &SourceDocument, field: &ExtractedField) -> Result<KnowledgeKey> {
    match field.scope {
        FieldScope::Client => document
            .client_id
            .map(|id| KnowledgeKey::for_client(id, &field.field_path))
            .ok_or_else(|| KnowledgeError::MissingScopeTarget {
                field_path: field.field_path.clone(),
                scope: "client",
            }),
        FieldScope::Project => document
            .project_id
            .map(|id| KnowledgeKey::for_project(id, &field.field_path))
            .ok_or_else(|| KnowledgeError::MissingScopeTarget {
                field_path: field.field_path.clone(),
                scope: "project",
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::types::field::FieldValue;
    use crate::types::knowledge::KnowledgeStatus;

    fn currency_field(path: &str, label: &str, amount: f64, confidence: f32) -> ExtractedField {
        ExtractedField::new(path, label, FieldValue::Currency(amount))
            .with_canonical(true)
            .with_confidence(confidence)
            .with_scope(FieldScope::Project)
            .with_source_text(format!("{label}: £{amount}"))
    }

    fn project_document(name: &str, project_id: Uuid) -> SourceDocument {
        SourceDocument::new(Uuid::new_v4(), name).with_project(project_id)
    }

    #[tokio::test]
    async fn first_save_adds() {
        let reconciler = Reconciler::new(MemoryStore::new());
        let project_id = Uuid::new_v4();
        let doc = project_document("appraisal.pdf", project_id);
        let fields = vec![currency_field("financials.gdv", "GDV", 4_200_000.0, 0.95)];

        let outcome = reconciler.reconcile(&doc, &fields).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome { added: 1, updated: 0 });

        let active = reconciler
            .store()
            .active_for_project(project_id)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].source_document_id, doc.id);
        assert!(reconciler.store().is_document_reconciled(doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn same_source_resave_updates_in_place() {
        let reconciler = Reconciler::new(MemoryStore::new());
        let project_id = Uuid::new_v4();
        let doc = project_document("appraisal.pdf", project_id);

        let first = vec![currency_field("financials.gdv", "GDV", 4_200_000.0, 0.95)];
        reconciler.reconcile(&doc, &first).await.unwrap();

        let revised = vec![currency_field("financials.gdv", "GDV", 4_500_000.0, 0.95)];
        let outcome = reconciler.reconcile(&doc, &revised).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome { added: 0, updated: 1 });

        let active = reconciler
            .store()
            .active_for_project(project_id)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].value, FieldValue::Currency(4_500_000.0));
        assert_eq!(reconciler.store().item_count(), 1);
    }

    #[tokio::test]
    async fn higher_confidence_from_new_source_supersedes() {
        let reconciler = Reconciler::new(MemoryStore::new());
        let project_id = Uuid::new_v4();

        let draft = project_document("draft-appraisal.pdf", project_id);
        reconciler
            .reconcile(&draft, &[currency_field("financials.gdv", "GDV", 4_000_000.0, 0.8)])
            .await
            .unwrap();

        let valuation = project_document("red-book-valuation.pdf", project_id);
        let outcome = reconciler
            .reconcile(
                &valuation,
                &[currency_field("financials.gdv", "GDV", 4_350_000.0, 0.95)],
            )
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome { added: 0, updated: 1 });

        let active = reconciler
            .store()
            .active_for_project(project_id)
            .await
            .unwrap();
        assert_eq!(active.len(), 1, "at most one active item per key");
        assert_eq!(active[0].value, FieldValue::Currency(4_350_000.0));

        let superseded = reconciler
            .store()
            .items_with_status(KnowledgeStatus::Superseded);
        assert_eq!(superseded.len(), 1);
        assert_eq!(superseded[0].superseded_by, Some(active[0].id));
    }

    #[tokio::test]
    async fn lower_or_equal_confidence_is_discarded() {
        let reconciler = Reconciler::new(MemoryStore::new());
        let project_id = Uuid::new_v4();

        let valuation = project_document("red-book-valuation.pdf", project_id);
        reconciler
            .reconcile(
                &valuation,
                &[currency_field("financials.gdv", "GDV", 4_350_000.0, 0.95)],
            )
            .await
            .unwrap();

        // Lower confidence from a third document: no row, no count
        let note = project_document("call-note.pdf", project_id);
        let outcome = reconciler
            .reconcile(&note, &[currency_field("financials.gdv", "GDV", 5_000_000.0, 0.6)])
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::default());
        assert_eq!(reconciler.store().item_count(), 1);

        // Equal confidence is also discarded
        let outcome = reconciler
            .reconcile(&note, &[currency_field("financials.gdv", "GDV", 5_000_000.0, 0.95)])
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::default());
    }

    #[tokio::test]
    async fn scope_without_target_is_skipped_not_fatal() {
        let reconciler = Reconciler::new(MemoryStore::new());
        let project_id = Uuid::new_v4();
        // Document has a project but no client
        let doc = project_document("appraisal.pdf", project_id);

        let client_scoped = ExtractedField::new(
            "company.name",
            "Company Name",
            FieldValue::String("Acme".into()),
        )
        .with_scope(FieldScope::Client)
        .with_confidence(0.7);

        let fields = vec![
            client_scoped,
            currency_field("financials.gdv", "GDV", 4_200_000.0, 0.95),
        ];
        let outcome = reconciler.reconcile(&doc, &fields).await.unwrap();

        // The client-scoped field is skipped, the rest proceed
        assert_eq!(outcome, ReconcileOutcome { added: 1, updated: 0 });
        assert_eq!(reconciler.store().item_count(), 1);
    }

    #[tokio::test]
    async fn client_and_project_keys_do_not_collide() {
        let reconciler = Reconciler::new(MemoryStore::new());
        let client_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let doc = SourceDocument::new(Uuid::new_v4(), "kyc.pdf")
            .with_client(client_id)
            .with_project(project_id);

        let client_field = ExtractedField::new(
            "extracted.net_position",
            "Net Position",
            FieldValue::Number(1.0),
        )
        .with_scope(FieldScope::Client)
        .with_confidence(0.5);
        let project_field = ExtractedField::new(
            "extracted.net_position",
            "Net Position",
            FieldValue::Number(2.0),
        )
        .with_scope(FieldScope::Project)
        .with_confidence(0.5);

        // Same path, different scope targets: two separate keys. The
        // same-source rule keys on (document, path), so write them from
        // two documents to observe both inserts.
        reconciler.reconcile(&doc, &[client_field]).await.unwrap();
        let doc2 = SourceDocument::new(Uuid::new_v4(), "appraisal.pdf")
            .with_client(client_id)
            .with_project(project_id);
        reconciler.reconcile(&doc2, &[project_field]).await.unwrap();

        assert_eq!(
            reconciler.store().active_for_client(client_id).await.unwrap().len(),
            1
        );
        assert_eq!(
            reconciler.store().active_for_project(project_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn concurrent_reconciliation_keeps_one_active_item() {
        let reconciler = Arc::new(Reconciler::new(MemoryStore::new()));
        let project_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for i in 0..8u32 {
            let reconciler = Arc::clone(&reconciler);
            let doc = project_document(&format!("doc-{i}.pdf"), project_id);
            let confidence = 0.6 + (i as f32) * 0.04;
            handles.push(tokio::spawn(async move {
                let fields = vec![currency_field(
                    "financials.gdv",
                    "GDV",
                    1_000_000.0 + f64::from(i),
                    confidence,
                )];
                reconciler.reconcile(&doc, &fields).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let active = reconciler
            .store()
            .active_for_project(project_id)
            .await
            .unwrap();
        assert_eq!(active.len(), 1, "exactly one active item per key");

        // Supersession is monotonic: each link points to an item with
        // confidence >= its own
        for item in reconciler.store().items_with_status(KnowledgeStatus::Superseded) {
            let successor = reconciler.store().get(item.superseded_by.unwrap()).unwrap();
            assert!(successor.normalization_confidence >= item.normalization_confidence);
        }
    }
}
