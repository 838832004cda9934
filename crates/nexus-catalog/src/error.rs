//! Error types for the catalog model.

use thiserror::Error;

/// Errors raised while building, parsing, merging or resolving catalogs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// An identifier, period, kind or data type failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A resource path does not follow the path grammar.
    #[error("invalid resource path '{path}': {reason}")]
    PathSyntax { path: String, reason: String },

    /// The catalog named by a path is not known.
    #[error("catalog not found: {0}")]
    CatalogNotFound(String),

    /// The resource named by a path does not exist in its catalog.
    #[error("resource '{resource_id}' not found in catalog '{catalog_id}'")]
    ResourceNotFound {
        catalog_id: String,
        resource_id: String,
    },

    /// The representation named by a path does not exist on its resource.
    #[error("representation '{representation_id}' not found on resource '{resource_id}'")]
    RepresentationNotFound {
        resource_id: String,
        representation_id: String,
    },

    /// More than one representation qualifies as the base of a derived one.
    #[error(
        "base representation for '{representation_id}' on resource '{resource_id}' is ambiguous \
         (candidates: {}), specify one with '#base='",
        .candidates.join(", ")
    )]
    AmbiguousBase {
        resource_id: String,
        representation_id: String,
        candidates: Vec<String>,
    },

    /// An explicitly requested base cannot produce the requested representation.
    #[error("representation '{base_id}' cannot serve as base of '{representation_id}': {reason}")]
    IncompatibleBase {
        representation_id: String,
        base_id: String,
        reason: String,
    },

    /// Two catalog snapshots cannot be reconciled.
    #[error("merge conflict: {0}")]
    MergeConflict(String),
}

impl CatalogError {
    /// Create a Validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a PathSyntax error.
    pub fn path_syntax(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathSyntax {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a MergeConflict error.
    pub fn merge_conflict(msg: impl Into<String>) -> Self {
        Self::MergeConflict(msg.into())
    }

    /// Whether this error means the addressed item does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CatalogNotFound(_)
                | Self::ResourceNotFound { .. }
                | Self::RepresentationNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("JSON error: {}", err))
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
