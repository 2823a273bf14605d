//! Document Intelligence & Knowledge Reconciliation Library
//!
//! Turns loosely-structured AI-derived document analysis (free-text
//! key-amount/key-date strings, entity lists, summaries) into canonical,
//! typed, provenance-tracked facts about a client or a project, and
//! merges those facts into a shared knowledge store without losing
//! history or overwriting higher-confidence information.
//!
//! # Design Philosophy
//!
//! - Parse failure is a normal branch, not an error: every value
//!   degrades gracefully to its raw string
//! - Every fact is traceable to the document and raw text it came from
//! - Nothing is ever hard-deleted: higher-confidence facts supersede
//!   older ones through a linked chain
//! - Library handles mechanics, app handles persistence choice
//!
//! # Usage
//!
//! ```rust,ignore
//! use knowledge::{
//!     extract_fields, DocumentAnalysis, ExtractOptions, MemoryStore,
//!     Reconciler, SourceDocument,
//! };
//!
//! let analysis = DocumentAnalysis::new()
//!     .with_key_amount("Loan Amount: £2,500,000")
//!     .with_key_amount("LTV: 65%");
//! let options = ExtractOptions::new().with_project_context(true);
//! let fields = extract_fields(&analysis, &options);
//!
//! let reconciler = Reconciler::new(MemoryStore::new());
//! let document = SourceDocument::new(document_id, "term-sheet.pdf")
//!     .with_project(project_id);
//! let outcome = reconciler.reconcile(&document, &fields).await?;
//! println!("{} added, {} updated", outcome.added, outcome.updated);
//! ```
//!
//! # Modules
//!
//! - [`types`] - Input payload, extracted fields, persisted knowledge model
//! - [`pipeline`] - Value parsers, label canonicalizer, orchestrator, reconciler
//! - [`traits`] - The `KnowledgeStore` persistence boundary
//! - [`stores`] - Storage implementations (`MemoryStore`, optional `SqliteStore`)
//! - [`testing`] - Fixtures and a failure-injecting store wrapper

pub mod error;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{KnowledgeError, Result};
pub use traits::store::KnowledgeStore;
pub use types::{
    analysis::{DocumentAnalysis, ExtractedEntities},
    field::{ExtractedField, FieldScope, FieldValue},
    knowledge::{KnowledgeItem, KnowledgeKey, KnowledgeStatus, SourceDocument},
    options::ExtractOptions,
};

// Re-export pipeline components
pub use pipeline::{
    canonicalize_label, extract_fields, has_magnitude_suffix, parse_currency_value,
    parse_date_value, parse_percentage_value, resolve_scope, CanonicalLabel, MappingScope,
    ReconcileOutcome, Reconciler,
};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;
