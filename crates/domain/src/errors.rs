use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Invalid due datetime: {0}")]
    InvalidDueDatetime(String),
}
