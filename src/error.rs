use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::membership::MembershipError;
use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<MembershipError> for AppError {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::NotFound(msg) => AppError::NotFound(msg),
            MembershipError::Conflict(msg) => AppError::Conflict(msg),
            MembershipError::PermissionDenied(msg) => AppError::PermissionDenied(msg),
            MembershipError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
        }
    }
}

impl AppError {
    /// 把 Postgres 的约束冲突映射为对应的业务错误，其余保持为数据库错误
    pub fn from_db(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => return AppError::Conflict(format!("{} already exists", what)),
                // foreign_key_violation
                Some("23503") => return AppError::NotFound(format!("{} references a missing row", what)),
                // check_violation
                Some("23514") => return AppError::InvalidArgument(format!("invalid {}", what)),
                _ => {}
            }
        }
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound(format!("{} not found", what)),
            other => AppError::Database(other),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Token(_)
            | AppError::Password(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> i32 {
        match self {
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::Conflict(_) => error_codes::CONFLICT,
            AppError::PermissionDenied(_) => error_codes::PERMISSION_DENIED,
            AppError::InvalidArgument(_) => error_codes::VALIDATION_ERROR,
            AppError::Unauthorized(_) => error_codes::AUTH_FAILED,
            _ => error_codes::INTERNAL_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            if matches!(self, AppError::PermissionDenied(_)) {
                tracing::warn!("Permission denied: {}", self);
            }
            self.to_string()
        };

        (status, error_to_api_response::<()>(self.error_code(), message)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_errors_keep_their_kind() {
        let cases = [
            (MembershipError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (MembershipError::Conflict("x".into()), StatusCode::CONFLICT),
            (MembershipError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (MembershipError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn missing_row_becomes_not_found() {
        let err = AppError::from_db(sqlx::Error::RowNotFound, "team");
        assert!(matches!(err, AppError::NotFound(ref msg) if msg == "team not found"));
        assert_eq!(err.error_code(), error_codes::NOT_FOUND);
    }

    #[test]
    fn server_errors_hide_details() {
        let response = AppError::Internal("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
