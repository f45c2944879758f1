use thiserror::Error;

/// アプリケーション層をまたいで使うエラー型
#[derive(Debug, Clone, Error)]
pub enum AppError {
    // ドメインエラー（検証失敗）
    #[error("Domain error: {0}")]
    Domain(#[from] domain::DomainError),

    // ビジネスロジックエラー
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Concurrent modification detected")]
    ConcurrentModification,

    // インフラストラクチャエラー
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Notification dispatch failed: {0}")]
    NotificationDispatch(String),

    // システムエラー
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// リトライで回復しうる一時的なエラーか
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DomainError;

    #[test]
    fn test_domain_error_converts() {
        let err: AppError = DomainError::Validation("Title cannot be empty.".to_string()).into();
        assert!(matches!(err, AppError::Domain(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_storage_errors_are_transient() {
        assert!(AppError::Storage("throttled".to_string()).is_transient());
        assert!(!AppError::ConcurrentModification.is_transient());
        assert!(!AppError::NotFound("x".to_string()).is_transient());
    }
}
