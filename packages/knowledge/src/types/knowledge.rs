//! Persisted knowledge model.
//!
//! A [`KnowledgeItem`] is a durable, provenance-tracked fact keyed by
//! `(client | project, field_path)`. Items are never hard-deleted:
//! a higher-confidence fact from a different source supersedes the old
//! item (status flip plus a `superseded_by` link), preserving a
//! traceable chain of supersession.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field::{ExtractedField, FieldScope, FieldValue};

/// Lifecycle status of a knowledge item.
///
/// `Superseded` is terminal: once flipped, the row is immutable except
/// for the `superseded_by` link written at flip time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeStatus {
    Active,
    Superseded,
}

impl KnowledgeStatus {
    /// Stable string form, used by the persistence backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeStatus::Active => "active",
            KnowledgeStatus::Superseded => "superseded",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(KnowledgeStatus::Active),
            "superseded" => Some(KnowledgeStatus::Superseded),
            _ => None,
        }
    }
}

/// Reconciliation key: exactly one of `client_id` / `project_id` is set,
/// per the producing field's scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnowledgeKey {
    pub client_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub field_path: String,
}

impl KnowledgeKey {
    /// Key for a client-scoped fact.
    pub fn for_client(client_id: Uuid, field_path: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id),
            project_id: None,
            field_path: field_path.into(),
        }
    }

    /// Key for a project-scoped fact.
    pub fn for_project(project_id: Uuid, field_path: impl Into<String>) -> Self {
        Self {
            client_id: None,
            project_id: Some(project_id),
            field_path: field_path.into(),
        }
    }
}

/// The source document a batch of fields was extracted from.
///
/// Carries the client/project context the reconciler resolves scope
/// targets against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    pub id: Uuid,
    pub name: String,
    pub client_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

impl SourceDocument {
    /// Create a document with no client or project context.
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            client_id: None,
            project_id: None,
        }
    }

    /// Attach the owning client.
    pub fn with_client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Attach the owning project.
    pub fn with_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }
}

/// A persisted, provenance-tracked fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    pub id: Uuid,

    // Reconciliation key
    pub client_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub field_path: String,

    // Payload
    pub value: FieldValue,
    pub label: String,
    pub category: String,
    pub is_canonical: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub status: KnowledgeStatus,

    // Provenance
    pub source_document_id: Uuid,
    pub source_document_name: String,
    pub source_text: String,
    pub original_label: String,
    pub normalization_confidence: f32,

    /// Set only when status flips to superseded; points at the
    /// replacing item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<Uuid>,

    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeItem {
    /// Build an active item from an extracted field and its source.
    pub fn from_extracted(
        document: &SourceDocument,
        key: &KnowledgeKey,
        field: &ExtractedField,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id: key.client_id,
            project_id: key.project_id,
            field_path: key.field_path.clone(),
            value: field.value.clone(),
            label: field.label.clone(),
            category: field.category.clone(),
            is_canonical: field.is_canonical,
            tags: field.tags.clone(),
            status: KnowledgeStatus::Active,
            source_document_id: document.id,
            source_document_name: document.name.clone(),
            source_text: field.source_text.clone(),
            original_label: field.label.clone(),
            normalization_confidence: field.confidence,
            superseded_by: None,
            added_at: now,
            updated_at: now,
        }
    }

    /// The reconciliation key of this item.
    pub fn key(&self) -> KnowledgeKey {
        KnowledgeKey {
            client_id: self.client_id,
            project_id: self.project_id,
            field_path: self.field_path.clone(),
        }
    }

    /// The scope implied by the key.
    pub fn scope(&self) -> FieldScope {
        if self.project_id.is_some() {
            FieldScope::Project
        } else {
            FieldScope::Client
        }
    }

    /// Patch this item in place from a re-extraction of the same
    /// source document. Identity, provenance source, and status are
    /// untouched.
    pub fn apply_field(&mut self, field: &ExtractedField) {
        self.value = field.value.clone();
        self.label = field.label.clone();
        self.source_text = field.source_text.clone();
        self.normalization_confidence = field.confidence;
        self.tags = field.tags.clone();
        self.updated_at = Utc::now();
    }

    /// Check whether this item is the active one for its key.
    pub fn is_active(&self) -> bool {
        self.status == KnowledgeStatus::Active
    }
}
