//! Extraction and reconciliation pipeline - the core of the library.
//!
//! The pipeline turns a document analysis payload into persisted
//! knowledge facts:
//! - Value parsing (currency magnitudes, percentages, UK/ISO dates)
//! - Label canonicalization (free text to canonical field paths)
//! - Extraction orchestration (typed, scoped, deduplicated fields)
//! - Reconciliation (confidence-aware supersession into the store)

pub mod canonical;
pub mod extract;
pub mod reconcile;
pub mod values;

pub use canonical::{
    canonicalize_label, resolve_scope, CanonicalLabel, LabelMapping, MappingScope,
    CLIENT_LEVEL_CATEGORIES, LABEL_MAPPINGS,
};
pub use extract::extract_fields;
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use values::{
    has_magnitude_suffix, parse_currency_value, parse_date_value, parse_percentage_value,
};
