//! Unified application error model and mapping helpers.
//! Store errors are converted into `AppError` where they reach an HTTP
//! handler; the HTTP mapping lives here so every route renders failures the same way.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone)]
pub enum AppError {
    UserInput { code: String, message: String },
    Unavailable { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Unavailable { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Unavailable { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn unavailable<S: Into<String>>(code: S, msg: S) -> Self { AppError::Unavailable { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    /// A store that never came up maps to a plain 500, not 503.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Unavailable { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "status": "erro",
            "code": self.code_str(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<crate::store::StoreError> for AppError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::Disabled => AppError::unavailable("store_unavailable", "document store unavailable"),
            // Query failures surface as a generic message; the detail only goes to the log.
            other => AppError::internal("store_error".to_string(), format!("lookup failed: {}", other.kind())),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
