use lambda_http::{Body, Response};
use shared::AppError;
use thiserror::Error;

/// HTTP 境界のエラー型
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn into_response(self) -> Response<Body> {
        let (status, message) = match &self {
            ApiError::NotFound => (404, self.to_string()),
            ApiError::BadRequest(_) => (400, self.to_string()),
            ApiError::Unauthorized(_) => (401, self.to_string()),
            ApiError::Conflict(_) => (409, self.to_string()),
            // 内部詳細はログのみに残す
            ApiError::Internal(_) => (500, "Internal server error".to_string()),
        };

        let body = serde_json::json!({ "error": message }).to_string();

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Domain(err) => ApiError::BadRequest(err.to_string()),
            // 他の所有者のレコードかどうかは区別せず 404 を返す
            AppError::NotFound(_) => ApiError::NotFound,
            AppError::ConcurrentModification => {
                ApiError::Conflict("Concurrent modification detected".to_string())
            }
            other => {
                tracing::error!(error = %other, "request failed with internal error");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<domain::DomainError> for ApiError {
    fn from(e: domain::DomainError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {e}"))
    }
}
