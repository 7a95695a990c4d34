/// Errors returned by the access-controlled services
///
/// Services validate and authorize before they write, so a request fails
/// with exactly one of these kinds. Mapping to HTTP happens in the API crate.

use crate::access::guard::{Action, Denial, DenialKind};
use crate::access::membership::EntityRef;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The guard refused the request
    #[error("{action:?} on {} {} denied: {denial:?}", .entity.kind(), .entity.id())]
    Denied {
        action: Action,
        entity: EntityRef,
        denial: Denial,
    },

    /// A referenced record that is not access-scoped (a user looked up by
    /// email, a subtask id under a visible task) does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Conflict {
        message: String,
        details: Option<String>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict {
            message: message.into(),
            details: None,
        }
    }

    /// How a denial should surface, `None` for non-denials
    pub fn denial_kind(&self) -> Option<DenialKind> {
        match self {
            ServiceError::Denied { action, denial, .. } => Some(denial.kind(*action)),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
