//! Validation failure details

use thiserror::Error;

/// Result type for validator checks
pub type ValidationResult<T> = Result<T, ValidationError>;

/// The first violation found while checking a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}': expected {expected}, got {actual}")]
pub struct ValidationError {
    /// Field path (e.g., "$root.show.network")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "extra field present")
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(field, expected, actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ValidationError::type_mismatch("$root.age", "float64", "string");
        let display = err.to_string();
        assert!(display.contains("$root.age"));
        assert!(display.contains("float64"));
        assert!(display.contains("string"));
    }
}
