//! Schema definition errors
//!
//! Error codes:
//! - EFFEX_SCHEMA_TABLE_NOT_REPRESENTABLE
//! - EFFEX_SCHEMA_DUPLICATE_TABLE
//! - EFFEX_SCHEMA_DUPLICATE_INDEX
//! - EFFEX_SCHEMA_EMPTY_INDEX
//! - EFFEX_SCHEMA_UNKNOWN_INDEX_FIELD
//! - EFFEX_SCHEMA_UNKNOWN_TABLE_REFERENCE
//! - EFFEX_SCHEMA_UNKNOWN_TABLE
//! - EFFEX_SCHEMA_DOCUMENT_REJECTED

use thiserror::Error;

use crate::compiler::CompileError;
use crate::validator::ValidationError;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("table '{table}' has no validator representation: {source}")]
    TableNotRepresentable {
        table: String,
        #[source]
        source: CompileError,
    },

    #[error("table '{0}' is defined more than once")]
    DuplicateTable(String),

    #[error("table '{table}' already has an index named '{index}'")]
    DuplicateIndex { table: String, index: String },

    #[error("index '{index}' on table '{table}' has no fields")]
    EmptyIndex { table: String, index: String },

    #[error("index '{index}' on table '{table}' references unknown field '{field}'")]
    UnknownIndexField {
        table: String,
        index: String,
        field: String,
    },

    #[error("table '{table}' references undefined table '{target}'")]
    UnknownTableReference { table: String, target: String },

    #[error("table '{0}' is not defined")]
    UnknownTable(String),

    #[error("document rejected by table '{table}': {source}")]
    DocumentRejected {
        table: String,
        #[source]
        source: ValidationError,
    },
}

impl SchemaError {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::TableNotRepresentable { .. } => "EFFEX_SCHEMA_TABLE_NOT_REPRESENTABLE",
            SchemaError::DuplicateTable(_) => "EFFEX_SCHEMA_DUPLICATE_TABLE",
            SchemaError::DuplicateIndex { .. } => "EFFEX_SCHEMA_DUPLICATE_INDEX",
            SchemaError::EmptyIndex { .. } => "EFFEX_SCHEMA_EMPTY_INDEX",
            SchemaError::UnknownIndexField { .. } => "EFFEX_SCHEMA_UNKNOWN_INDEX_FIELD",
            SchemaError::UnknownTableReference { .. } => "EFFEX_SCHEMA_UNKNOWN_TABLE_REFERENCE",
            SchemaError::UnknownTable(_) => "EFFEX_SCHEMA_UNKNOWN_TABLE",
            SchemaError::DocumentRejected { .. } => "EFFEX_SCHEMA_DOCUMENT_REJECTED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(SchemaError::UnknownTable("x".into()).code(), "EFFEX_SCHEMA_UNKNOWN_TABLE");
        assert_eq!(
            SchemaError::DuplicateIndex {
                table: "shows".into(),
                index: "by_name".into()
            }
            .code(),
            "EFFEX_SCHEMA_DUPLICATE_INDEX"
        );
    }

    #[test]
    fn test_rejection_display_includes_details() {
        let err = SchemaError::DocumentRejected {
            table: "shows".into(),
            source: ValidationError::missing_field("$root.name"),
        };
        let display = err.to_string();
        assert!(display.contains("shows"));
        assert!(display.contains("$root.name"));
    }
}
