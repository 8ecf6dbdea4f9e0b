use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgriError {
    #[error("validation failed: {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AgriError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
            Self::InvalidAction(_) => 400,
            Self::InvalidStateTransition(_) => 409,
            Self::Internal(_) => 500,
        }
    }
}

/// One rejected input field. `Validation` carries every failure found so the
/// caller can fix the whole form in one round trip.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
