//! Typed errors for the knowledge engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Value parsing never
//! appears here: parse failure is a normal branch (`Option`), not an error.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during knowledge operations.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON (de)serialization error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A field resolved to a scope the source document cannot satisfy
    /// (e.g. a client-scoped field on a document with no client).
    #[error("field `{field_path}` is {scope}-scoped but the document has no {scope} id")]
    MissingScopeTarget {
        field_path: String,
        scope: &'static str,
    },

    /// Knowledge item not found in the store
    #[error("knowledge item not found: {id}")]
    ItemNotFound { id: Uuid },
}

/// Result type alias for knowledge operations.
pub type Result<T> = std::result::Result<T, KnowledgeError>;
