//! Data types for the knowledge engine.

pub mod analysis;
pub mod field;
pub mod knowledge;
pub mod options;

pub use analysis::{DocumentAnalysis, ExtractedEntities};
pub use field::{ExtractedField, FieldScope, FieldValue};
pub use knowledge::{KnowledgeItem, KnowledgeKey, KnowledgeStatus, SourceDocument};
pub use options::ExtractOptions;
