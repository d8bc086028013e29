// src/error.rs
//! HTTP-facing error: every failure leaves the API as `{"detail": "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::payments::PaymentError;
use crate::postal::PostalError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// A failed payment write (create/verify/execute). Caller mistakes stay
    /// 400 with the bare message; gateway trouble is a 500 prefixed with
    /// what was being attempted.
    pub fn payment(e: PaymentError, attempted: &str) -> Self {
        if e.is_client_error() {
            AppError::BadRequest(e.to_string())
        } else {
            AppError::Internal(format!("{attempted}: {e}"))
        }
    }

    /// A failed payment read (fetch by id). Anything the gateway says is a
    /// 404; missing credentials remain a server error.
    pub fn lookup(e: PaymentError, what: &str) -> Self {
        match e {
            PaymentError::NotConfigured(_) => AppError::Internal(e.to_string()),
            e if e.is_client_error() => AppError::BadRequest(e.to_string()),
            e => AppError::NotFound(format!("{what} not found: {e}")),
        }
    }
}

impl From<PostalError> for AppError {
    fn from(e: PostalError) -> Self {
        match e {
            PostalError::Unavailable(_) => AppError::Internal(e.to_string()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
