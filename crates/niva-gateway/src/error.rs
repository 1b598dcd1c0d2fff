//! Error types for backend operations.

use niva_core::error::NivaError;

use crate::types::Operation;

/// A backend operation failed. Never retried by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("{operation}: invalid request: {reason}")]
    InvalidRequest {
        operation: Operation,
        reason: String,
    },
    #[error("{operation}: invalid response: {reason}")]
    InvalidResponse {
        operation: Operation,
        reason: String,
    },
    #[error("{operation}: backend returned HTTP {status}: {body}")]
    Status {
        operation: Operation,
        status: u16,
        body: String,
    },
    #[error("{operation}: request timed out")]
    Timeout { operation: Operation },
    #[error("{operation}: transport error: {cause}")]
    Transport { operation: Operation, cause: String },
}

impl BackendError {
    /// The operation that failed.
    pub fn operation(&self) -> Operation {
        match self {
            BackendError::InvalidRequest { operation, .. }
            | BackendError::InvalidResponse { operation, .. }
            | BackendError::Status { operation, .. }
            | BackendError::Timeout { operation }
            | BackendError::Transport { operation, .. } => *operation,
        }
    }

    pub(crate) fn invalid_request(operation: Operation, reason: impl Into<String>) -> Self {
        BackendError::InvalidRequest {
            operation,
            reason: reason.into(),
        }
    }
}

impl From<BackendError> for NivaError {
    fn from(err: BackendError) -> Self {
        NivaError::Backend(err.to_string())
    }
}
