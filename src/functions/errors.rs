//! Function errors
//!
//! - `ServiceError`: raised by request-scoped services inside a handler
//! - `InvokeError`: the outcome of a failed invocation as seen by the caller
//! - `RegistryError`: lookups and registration in a [`FunctionRegistry`]
//!
//! [`FunctionRegistry`]: super::FunctionRegistry

use thiserror::Error;

use super::cause::Defect;
use crate::parse::ParseError;
use crate::schema::SchemaError;

/// Result type for service calls
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type for invocations
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{capability} is not available to {kind} functions")]
    CapabilityDenied {
        kind: &'static str,
        capability: &'static str,
    },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid document id: {0}")]
    InvalidId(String),

    #[error("Documents must be objects, got {0}")]
    NotAnObject(&'static str),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Scheduled call not found: {0}")]
    ScheduledCallNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::CapabilityDenied { .. } => "EFFEX_CAPABILITY_DENIED",
            ServiceError::DocumentNotFound(_) => "EFFEX_DOCUMENT_NOT_FOUND",
            ServiceError::InvalidId(_) => "EFFEX_INVALID_ID",
            ServiceError::NotAnObject(_) => "EFFEX_NOT_AN_OBJECT",
            ServiceError::Schema(e) => e.code(),
            ServiceError::ScheduledCallNotFound(_) => "EFFEX_SCHEDULED_CALL_NOT_FOUND",
            ServiceError::Internal(_) => "EFFEX_INTERNAL",
        }
    }

    pub(crate) fn poisoned() -> Self {
        ServiceError::Internal("Lock poisoned".into())
    }
}

/// A failure the caller is allowed to see.
///
/// The message is the display text of the handler's domain error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    message: String,
}

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum InvokeError {
    /// Arguments did not decode; the handler never ran
    #[error("Failed to decode arguments: {0}")]
    Decode(#[source] ParseError),

    /// The handler's result did not encode
    #[error("Failed to encode result: {0}")]
    Encode(#[source] ParseError),

    #[error(transparent)]
    Client(#[from] ClientError),

    /// The handler died; the defect is passed through untouched
    #[error("Function died: {0}")]
    Defect(Defect),
}

impl InvokeError {
    pub fn code(&self) -> &'static str {
        match self {
            InvokeError::Decode(_) => "EFFEX_DECODE_FAILED",
            InvokeError::Encode(_) => "EFFEX_ENCODE_FAILED",
            InvokeError::Client(_) => "EFFEX_CLIENT_ERROR",
            InvokeError::Defect(_) => "EFFEX_DEFECT",
        }
    }

    /// Whether the caller may be shown the error message
    pub fn is_client_visible(&self) -> bool {
        matches!(self, InvokeError::Client(_))
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Function not found: {0}")]
    NotFound(String),

    #[error("Function already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NotFound(_) => "EFFEX_FUNCTION_NOT_FOUND",
            RegistryError::AlreadyExists(_) => "EFFEX_FUNCTION_ALREADY_EXISTS",
            RegistryError::Invoke(e) => e.code(),
            RegistryError::Internal(_) => "EFFEX_INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_message_is_verbatim() {
        let err = InvokeError::from(ClientError::new("not found"));
        assert_eq!(err.to_string(), "not found");
        assert!(err.is_client_visible());
    }

    #[test]
    fn test_codes() {
        assert_eq!(
            ServiceError::CapabilityDenied {
                kind: "query",
                capability: "database writes"
            }
            .code(),
            "EFFEX_CAPABILITY_DENIED"
        );
        assert_eq!(RegistryError::NotFound("x".into()).code(), "EFFEX_FUNCTION_NOT_FOUND");
        let decode = InvokeError::Decode(ParseError::binding("bad"));
        assert_eq!(RegistryError::from(decode).code(), "EFFEX_DECODE_FAILED");
    }

    #[test]
    fn test_capability_display() {
        let err = ServiceError::CapabilityDenied {
            kind: "action",
            capability: "database access",
        };
        assert_eq!(err.to_string(), "database access is not available to action functions");
    }
}
