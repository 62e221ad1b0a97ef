//! Error taxonomy for loading structure definitions and accessing records
//!
//! Load-time errors (`MalformedDefinition`, `SchemaViolation`,
//! `CyclicReference`) abort construction of the whole schema. Call-time errors
//! are scoped to the single call that raised them and never invalidate a
//! loaded schema.

use crate::models::FieldType;
use crate::storage::StorageError;
use crate::transport::TransportError;
use crate::validation::ValidationReport;

/// Errors raised while loading a structure definition or accessing records
#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    /// The definition could not be read as a tab/table/field tree.
    #[error("Malformed definition at '{path}': {reason}")]
    MalformedDefinition { path: String, reason: String },

    /// One or more semantic invariants failed; the report lists all of them.
    #[error("Schema violation: {0}")]
    SchemaViolation(ValidationReport),

    /// A sub-table or source-table chain loops back on itself.
    #[error("Cyclic reference: {}", .path.join(" -> "))]
    CyclicReference { path: Vec<String> },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A name or id that is not part of the table's schema.
    #[error("Unknown field '{field}' in table '{table}'")]
    UnknownField { table: String, field: String },

    #[error("Type mismatch for field '{field}' ({expected}): {reason}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        reason: String,
    },

    /// Opaque failure from the injected transport. Never retried here.
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StructureError {
    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        StructureError::MalformedDefinition {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(field: &str, expected: FieldType, reason: impl Into<String>) -> Self {
        StructureError::TypeMismatch {
            field: field.to_string(),
            expected,
            reason: reason.into(),
        }
    }

    /// Whether the error aborted a schema load rather than a single call.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            StructureError::MalformedDefinition { .. }
                | StructureError::SchemaViolation(_)
                | StructureError::CyclicReference { .. }
                | StructureError::Storage(_)
        )
    }
}

pub type Result<T, E = StructureError> = std::result::Result<T, E>;
