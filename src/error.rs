use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// 物品池为空或权重总和非正，抽卡无法进行（扣费前校验）
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// 条件扣减未命中任何行：余额不足
    #[error("Insufficient points: {required} required")]
    InsufficientFunds { required: i64 },

    /// 累积权重表查找失败（权重合法时不可达）
    #[error("Selection failure: {0}")]
    SelectionFailure(String),

    /// 扣费后写入失败，整个事务已回滚
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 对外暴露的错误码，与响应体中的 error.code 一致
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) | AppError::JwtError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidCatalog(_) => "NO_ITEMS_AVAILABLE",
            AppError::InsufficientFunds { .. } => "INSUFFICIENT_POINTS",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (actix_web::http::StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (actix_web::http::StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "Invalid access token".to_string(),
                )
            }
            AppError::NotFound(msg) => (actix_web::http::StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidCatalog(msg) => {
                log::warn!("Invalid catalog: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "No items available".to_string(),
                )
            }
            AppError::InsufficientFunds { required } => (
                actix_web::http::StatusCode::BAD_REQUEST,
                format!("Insufficient points: {required} required"),
            ),
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn insufficient_funds_is_client_error() {
        let err = AppError::InsufficientFunds { required: 30 };
        assert_eq!(err.code(), "INSUFFICIENT_POINTS");
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn persistence_failure_hides_details() {
        let err = AppError::PersistenceFailure("insert draw_records failed".into());
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
