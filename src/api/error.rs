use crate::application::request::RequestApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーと、認証・入力のエラーをHTTPレスポンスにマッピングする。
#[derive(Debug)]
pub enum ApiError {
    Application(RequestApplicationError),
    /// トークンがない、または検証に失敗した
    Unauthorized(String),
    /// パスの利用者にアクセスする権限がない
    Forbidden(String),
    BadRequest(String),
}

impl From<RequestApplicationError> for ApiError {
    fn from(err: RequestApplicationError) -> Self {
        ApiError::Application(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Application(err) => application_error_parts(err),
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}

fn application_error_parts(err: RequestApplicationError) -> (StatusCode, &'static str, String) {
    match err {
        // 404 Not Found - リクエストされたリソースが存在しない
        RequestApplicationError::RequesterNotFound => {
            (StatusCode::NOT_FOUND, "USER_NOT_FOUND", err.to_string())
        }
        RequestApplicationError::BookNotFound => {
            (StatusCode::NOT_FOUND, "BOOK_NOT_FOUND", err.to_string())
        }
        RequestApplicationError::RequestNotFound => {
            (StatusCode::NOT_FOUND, "REQUEST_NOT_FOUND", err.to_string())
        }

        // 403 Forbidden - 上限超過と権限不足
        RequestApplicationError::LimitExceeded { .. } => {
            (StatusCode::FORBIDDEN, "LIMIT_EXCEEDED", err.to_string())
        }
        RequestApplicationError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),

        // 422 Unprocessable Entity - 状態遷移のルール違反
        RequestApplicationError::InvalidTransition(msg) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_TRANSITION", msg)
        }
        RequestApplicationError::AlreadyCancelled => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "ALREADY_CANCELLED",
            err.to_string(),
        ),
        RequestApplicationError::AlreadyReturned => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "ALREADY_RETURNED",
            err.to_string(),
        ),

        // 500 Internal Server Error - システム障害
        // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
        RequestApplicationError::StorageFailure(ref e) => {
            tracing::error!("Loan ledger error: {}", e);
            internal_error("STORAGE_ERROR")
        }
        RequestApplicationError::CatalogFailure(ref e) => {
            tracing::error!("Catalog gateway error: {}", e);
            internal_error("CATALOG_ERROR")
        }
        RequestApplicationError::DirectoryFailure(ref e) => {
            tracing::error!("Member directory error: {}", e);
            internal_error("DIRECTORY_ERROR")
        }
    }
}

fn internal_error(error_type: &'static str) -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_type,
        "internal server error".to_string(),
    )
}
