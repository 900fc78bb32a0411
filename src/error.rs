//! Error taxonomy for repository operations.
//!
//! Expected "absent" outcomes are not errors: reads return `Option` or an
//! empty `Vec`, `update` returns `Ok(None)` for an unknown id, and `delete`
//! returns `Ok(false)`. This type covers the failures a caller must
//! distinguish or propagate.

use thiserror::Error;

/// Failures surfaced by the repository layer.
#[derive(Debug, Error)]
pub enum RepoError {
    /// A supplied foreign key does not resolve to an existing row. Unlike
    /// an unknown primary id, this is a caller mistake and fails loudly.
    #[error("referenced {entity} does not exist: {id}")]
    InvalidReference { entity: &'static str, id: String },

    /// The underlying store failed. Propagated unmodified; retry policy
    /// belongs to the caller.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Schema migration failed while opening the database.
    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),

    /// A persisted audit value failed to decode. Indicates a corrupt row.
    #[error("audit value decode error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl RepoError {
    pub fn invalid_reference(entity: &'static str, id: impl Into<String>) -> Self {
        Self::InvalidReference {
            entity,
            id: id.into(),
        }
    }

    /// True when the error is an unresolved foreign key.
    pub fn is_invalid_reference(&self) -> bool {
        matches!(self, Self::InvalidReference { .. })
    }
}

/// Result type for repository operations.
pub type RepoResult<T> = std::result::Result<T, RepoError>;
