//! Extracted field types with confidence and provenance.
//!
//! An [`ExtractedField`] is the transient output of the extraction
//! pipeline: a typed value under a canonical dot-delimited path, scoped
//! to a client or project, carrying the raw source text it was parsed
//! from. Fields are not persisted directly; the reconciler turns them
//! into [`super::knowledge::KnowledgeItem`]s.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The level at which a fact applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldScope {
    /// Fact about the client entity (KYC, company, contact details)
    Client,
    /// Fact about a specific project (financials, timeline, site)
    Project,
}

/// A typed field value.
///
/// Serializes as a `{"type": ..., "value": ...}` pair so the stored
/// shape carries an explicit value-type tag
/// (`string|number|currency|date|percentage|array|text|boolean`).
/// Dates render as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    /// Raw text that could not be parsed into anything more specific
    String(String),
    /// Plain number
    Number(f64),
    /// Currency amount, already scaled to whole units
    Currency(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Percentage on the 0-100 scale
    Percentage(f64),
    /// List of strings (e.g. key terms)
    Array(Vec<String>),
    /// Free-form narrative text
    Text(String),
    /// Boolean flag
    Boolean(bool),
}

impl FieldValue {
    /// The value-type tag for this payload.
    pub fn value_type(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Number(_) => "number",
            FieldValue::Currency(_) => "currency",
            FieldValue::Date(_) => "date",
            FieldValue::Percentage(_) => "percentage",
            FieldValue::Array(_) => "array",
            FieldValue::Text(_) => "text",
            FieldValue::Boolean(_) => "boolean",
        }
    }

    /// Numeric payload, if this value is numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) | FieldValue::Currency(n) | FieldValue::Percentage(n) => Some(*n),
            _ => None,
        }
    }

    /// Text payload, if this value is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) | FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Date payload, if this value is a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// A typed, scoped, labeled fact extracted from one document analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedField {
    /// Dot-delimited canonical path (`financials.gdv`), or
    /// `extracted.<slug>` for labels the schema does not know
    pub field_path: String,

    /// Original human-readable label text
    pub label: String,

    /// Typed payload
    pub value: FieldValue,

    /// Whether `field_path` matched a known schema field
    pub is_canonical: bool,

    /// Normalization confidence in [0, 1]
    pub confidence: f32,

    /// Raw string the field was parsed from (for audit)
    pub source_text: String,

    /// Resolved level at which this fact applies
    pub scope: FieldScope,

    /// First path segment, used for grouping and display
    pub category: String,

    /// Provenance tags (`entity`, `narrative`, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ExtractedField {
    /// Create a field with a path, label, and value.
    ///
    /// Defaults: not canonical, confidence 0.5, client scope, source
    /// text empty. The category is derived from the first path segment.
    pub fn new(
        field_path: impl Into<String>,
        label: impl Into<String>,
        value: FieldValue,
    ) -> Self {
        let field_path = field_path.into();
        let category = field_path
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();

        Self {
            field_path,
            label: label.into(),
            value,
            is_canonical: false,
            confidence: 0.5,
            source_text: String::new(),
            scope: FieldScope::Client,
            category,
            tags: Vec::new(),
        }
    }

    /// Mark the path as canonical (or not).
    pub fn with_canonical(mut self, is_canonical: bool) -> Self {
        self.is_canonical = is_canonical;
        self
    }

    /// Set the confidence score, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the raw source text.
    pub fn with_source_text(mut self, source_text: impl Into<String>) -> Self {
        self.source_text = source_text.into();
        self
    }

    /// Set the resolved scope.
    pub fn with_scope(mut self, scope: FieldScope) -> Self {
        self.scope = scope;
        self
    }

    /// Add a provenance tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// The value-type tag of the payload.
    pub fn value_type(&self) -> &'static str {
        self.value.value_type()
    }

    /// Check if this field meets a confidence threshold.
    pub fn is_high_confidence(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}
