use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::wallet::WalletError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    Unavailable(&'static str, String),
    BadGateway(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("INVALID_CREDENTIALS", "Username or password is incorrect".into())
    }

    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    pub fn admin_only() -> Self {
        ApiError::Forbidden("FORBIDDEN", "Admin privileges required".into())
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match self {
            ApiError::Unauthorized(code, msg) => (StatusCode::UNAUTHORIZED, code, msg),
            ApiError::Forbidden(code, msg) => (StatusCode::FORBIDDEN, code, msg),
            ApiError::BadRequest(code, msg) => (StatusCode::BAD_REQUEST, code, msg),
            ApiError::NotFound(code, msg) => (StatusCode::NOT_FOUND, code, msg),
            ApiError::Conflict(code, msg) => (StatusCode::CONFLICT, code, msg),
            ApiError::Unavailable(code, msg) => (StatusCode::SERVICE_UNAVAILABLE, code, msg),
            ApiError::BadGateway(code, msg) => (StatusCode::BAD_GATEWAY, code, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg),
        };
        (status, ApiError::to_error_response(code, &msg)).into_response()
    }
}

/// Wallet core errors keep a stable code at the HTTP boundary so clients can
/// branch on `error.code` instead of parsing messages.
impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        let msg = err.to_string();
        match err {
            WalletError::InvalidAmount => ApiError::BadRequest("INVALID_AMOUNT", msg),
            WalletError::DuplicateReference(_) => ApiError::Conflict("DUPLICATE_REFERENCE", msg),
            WalletError::NotFound(_) => ApiError::NotFound("NOT_FOUND", msg),
            WalletError::AlreadyResolved(_) => ApiError::Conflict("ALREADY_RESOLVED", msg),
            WalletError::AccountNotFound(_) => ApiError::NotFound("ACCOUNT_NOT_FOUND", msg),
            WalletError::InsufficientFunds { .. } => ApiError::Conflict("INSUFFICIENT_FUNDS", msg),
            WalletError::BalanceOverflow => ApiError::Conflict("BALANCE_OVERFLOW", msg),
            WalletError::TransientStoreFailure(_) => {
                ApiError::Unavailable("STORE_UNAVAILABLE", msg)
            }
            WalletError::Store(_) => ApiError::Internal(msg),
        }
    }
}
