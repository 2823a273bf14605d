//! Document analysis payload - the engine's input.
//!
//! Produced by the surrounding system's document-analysis collaborator
//! (LLM/OCR extraction is out of scope here). The payload is
//! loosely structured on purpose: `key_amounts` and `key_dates` are
//! free-text `"<label>: <value>"` strings, and every section is optional.

use serde::{Deserialize, Serialize};

/// AI-derived analysis of a single document.
///
/// External shape is camelCase (`keyAmounts`, `executiveSummary`, ...)
/// to match the analysis collaborator's payload. Missing sections
/// deserialize to empty and contribute zero facts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    /// Raw amount strings, e.g. `"Loan Amount: £2,500,000"`
    #[serde(default)]
    pub key_amounts: Vec<String>,

    /// Raw date strings, e.g. `"Completion Date: 25/12/2024"`
    #[serde(default)]
    pub key_dates: Vec<String>,

    /// Key terms mentioned in the document
    #[serde(default)]
    pub key_terms: Vec<String>,

    /// Named entities found in the document
    #[serde(default)]
    pub entities: ExtractedEntities,

    /// Executive summary of the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
}

impl DocumentAnalysis {
    /// Create an empty analysis.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw key-amount string.
    pub fn with_key_amount(mut self, raw: impl Into<String>) -> Self {
        self.key_amounts.push(raw.into());
        self
    }

    /// Add a raw key-date string.
    pub fn with_key_date(mut self, raw: impl Into<String>) -> Self {
        self.key_dates.push(raw.into());
        self
    }

    /// Add key terms.
    pub fn with_key_terms(mut self, terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.key_terms.extend(terms.into_iter().map(Into::into));
        self
    }

    /// Set the entity lists.
    pub fn with_entities(mut self, entities: ExtractedEntities) -> Self {
        self.entities = entities;
        self
    }

    /// Set the executive summary.
    pub fn with_executive_summary(mut self, summary: impl Into<String>) -> Self {
        self.executive_summary = Some(summary.into());
        self
    }

    /// Check whether the analysis carries anything to extract.
    pub fn is_empty(&self) -> bool {
        self.key_amounts.is_empty()
            && self.key_dates.is_empty()
            && self.key_terms.is_empty()
            && self.entities.is_empty()
            && self.executive_summary.is_none()
    }
}

/// Named entities recognized in a document.
///
/// Only the first entry of each list produces a fact; the remainder
/// survives in the fact's `source_text` for audit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEntities {
    #[serde(default)]
    pub companies: Vec<String>,

    #[serde(default)]
    pub people: Vec<String>,

    #[serde(default)]
    pub locations: Vec<String>,

    #[serde(default)]
    pub projects: Vec<String>,
}

impl ExtractedEntities {
    /// Create empty entity lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a company.
    pub fn with_company(mut self, name: impl Into<String>) -> Self {
        self.companies.push(name.into());
        self
    }

    /// Add a person.
    pub fn with_person(mut self, name: impl Into<String>) -> Self {
        self.people.push(name.into());
        self
    }

    /// Add a location.
    pub fn with_location(mut self, name: impl Into<String>) -> Self {
        self.locations.push(name.into());
        self
    }

    /// Add a project.
    pub fn with_project(mut self, name: impl Into<String>) -> Self {
        self.projects.push(name.into());
        self
    }

    /// Check whether all lists are empty.
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
            && self.people.is_empty()
            && self.locations.is_empty()
            && self.projects.is_empty()
    }
}
