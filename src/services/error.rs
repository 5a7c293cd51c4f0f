use thiserror::Error;

use crate::database::store::{Entity, StoreError};

/// Outcomes of access-control and project operations.
///
/// Every variant is terminal; callers report them and never retry.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("{entity} not found")]
    NotFound { entity: Entity },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl AccessError {
    pub fn not_found(entity: Entity) -> Self {
        AccessError::NotFound { entity }
    }

    pub fn permission_denied(reason: impl Into<String>) -> Self {
        AccessError::PermissionDenied(reason.into())
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        AccessError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => AccessError::NotFound { entity },
            StoreError::Conflict(reason) => AccessError::Conflict { reason },
            other => AccessError::Store(other),
        }
    }
}
