//! Extraction options.

use serde::{Deserialize, Serialize};

/// Context the orchestrator resolves scope against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    /// Whether the document is attached to a project. Project-scoped
    /// mappings fall back to client scope when this is false.
    pub has_project_context: bool,

    /// Document category (e.g. "KYC", "Valuation Report"). Used to
    /// resolve context-dependent scope for unmapped labels.
    pub document_category: Option<String>,
}

impl ExtractOptions {
    /// Options with no project context and no category.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the project-context flag.
    pub fn with_project_context(mut self, has_project_context: bool) -> Self {
        self.has_project_context = has_project_context;
        self
    }

    /// Set the document category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.document_category = Some(category.into());
        self
    }

    /// The category as a borrowed str, if set.
    pub fn category(&self) -> Option<&str> {
        self.document_category.as_deref()
    }
}
