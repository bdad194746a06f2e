use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {entity} transition from {from} to {to}")]
    InvalidTransition { entity: &'static str, from: String, to: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failure taxonomy surfaced by the lifecycle managers. Every variant maps to
/// one HTTP status and a stable error code so callers can branch without
/// parsing messages.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{message}")]
    InvalidState { message: String, current: String },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Gateway(String),
    #[error("storage failure: {0}")]
    Repository(String),
}

impl ServiceError {
    pub fn invalid_state(message: impl Into<String>, current: impl Into<String>) -> Self {
        Self::InvalidState { message: message.into(), current: current.into() }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::BadRequest(_) | Self::InvalidState { .. } | Self::Gateway(_) => 400,
            Self::Conflict(_) => 409,
            Self::Unauthenticated(_) => 401,
            Self::Repository(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Gateway(_) => "PROVIDER_ERROR",
            Self::Repository(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidTransition { ref from, .. } => {
                let current = from.clone();
                Self::InvalidState { message: value.to_string(), current }
            }
            DomainError::InvariantViolation(message) => Self::BadRequest(message),
        }
    }
}
