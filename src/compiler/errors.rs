//! Compile error taxonomy
//!
//! Error codes:
//! - EFFEX_TOP_LEVEL_MUST_BE_OBJECT
//! - EFFEX_TOP_LEVEL_MUST_BE_OBJECT_OR_UNION
//! - EFFEX_INDEX_SIGNATURES_NOT_SUPPORTED
//! - EFFEX_MIXED_INDEX_AND_PROPERTY_SIGNATURES_NOT_SUPPORTED
//! - EFFEX_UNSUPPORTED_PROPERTY_SIGNATURE_KEY_TYPE
//! - EFFEX_EMPTY_TUPLE_NOT_SUPPORTED
//! - EFFEX_OPTIONAL_TUPLE_ELEMENTS_NOT_SUPPORTED
//! - EFFEX_UNSUPPORTED_SCHEMA_TYPE
//!
//! Compile errors are a deterministic function of the input AST and
//! indicate a schema authoring mistake. They are never retried.

use thiserror::Error;

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Why a schema cannot be represented as a validator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("top level schema must be an object")]
    TopLevelMustBeObject,

    #[error("top level schema must be an object or a union")]
    TopLevelMustBeObjectOrUnion,

    #[error("index signatures are not supported")]
    IndexSignaturesNotSupported,

    #[error("mixed index and property signatures are not supported")]
    MixedIndexAndPropertySignaturesNotSupported,

    #[error("unsupported property signature key type: {key}")]
    UnsupportedPropertySignatureKeyType { key: String },

    #[error("empty tuples are not supported")]
    EmptyTupleNotSupported,

    #[error("optional tuple elements are not supported")]
    OptionalTupleElementsNotSupported,

    #[error("unsupported schema type: {tag}")]
    UnsupportedSchemaType { tag: &'static str },
}

impl CompileError {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::TopLevelMustBeObject => "EFFEX_TOP_LEVEL_MUST_BE_OBJECT",
            CompileError::TopLevelMustBeObjectOrUnion => "EFFEX_TOP_LEVEL_MUST_BE_OBJECT_OR_UNION",
            CompileError::IndexSignaturesNotSupported => "EFFEX_INDEX_SIGNATURES_NOT_SUPPORTED",
            CompileError::MixedIndexAndPropertySignaturesNotSupported => {
                "EFFEX_MIXED_INDEX_AND_PROPERTY_SIGNATURES_NOT_SUPPORTED"
            }
            CompileError::UnsupportedPropertySignatureKeyType { .. } => {
                "EFFEX_UNSUPPORTED_PROPERTY_SIGNATURE_KEY_TYPE"
            }
            CompileError::EmptyTupleNotSupported => "EFFEX_EMPTY_TUPLE_NOT_SUPPORTED",
            CompileError::OptionalTupleElementsNotSupported => {
                "EFFEX_OPTIONAL_TUPLE_ELEMENTS_NOT_SUPPORTED"
            }
            CompileError::UnsupportedSchemaType { .. } => "EFFEX_UNSUPPORTED_SCHEMA_TYPE",
        }
    }

    pub(crate) fn unsupported_key(key: impl ToString) -> Self {
        CompileError::UnsupportedPropertySignatureKeyType { key: key.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let all = [
            CompileError::TopLevelMustBeObject,
            CompileError::TopLevelMustBeObjectOrUnion,
            CompileError::IndexSignaturesNotSupported,
            CompileError::MixedIndexAndPropertySignaturesNotSupported,
            CompileError::unsupported_key("0"),
            CompileError::EmptyTupleNotSupported,
            CompileError::OptionalTupleElementsNotSupported,
            CompileError::UnsupportedSchemaType { tag: "SymbolKeyword" },
        ];
        let mut codes: Vec<_> = all.iter().map(CompileError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_messages_carry_context() {
        assert!(CompileError::unsupported_key("0").to_string().ends_with(": 0"));
        assert!(CompileError::UnsupportedSchemaType { tag: "VoidKeyword" }
            .to_string()
            .contains("VoidKeyword"));
    }
}
