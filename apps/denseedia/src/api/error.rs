//! # Error Translation
//!
//! Maps store errors onto HTTP status codes.
//!
//! | Error | Status |
//! |---|---|
//! | `ObjectNotFound`, `ElementNameNotFound` | 404 |
//! | `DuplicateElementName` | 409 |
//! | `ValueTypeChange` | 428 |
//! | `UnsupportedType`, `InvalidInput` | 400 |
//! | storage errors | 500 |
//!
//! Malformed paths, query strings and bodies keep the status axum picks
//! for them but share the same JSON body, with code `invalid_request`.

use super::types::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use denseedia_core::DenseError;

/// An error on its way out of a handler.
#[derive(Debug)]
pub enum ApiError {
    /// The store refused the operation.
    Store(DenseError),
    /// An extractor rejected the request before it reached the store.
    Request { status: StatusCode, message: String },
}

impl From<DenseError> for ApiError {
    fn from(err: DenseError) -> Self {
        Self::Store(err)
    }
}

impl ApiError {
    pub(crate) fn rejected(status: StatusCode, message: String) -> Self {
        Self::Request { status, message }
    }

    /// HTTP status for the wrapped error.
    pub fn status(&self) -> StatusCode {
        let err = match self {
            Self::Store(err) => err,
            Self::Request { status, .. } => return *status,
        };
        match err {
            DenseError::ObjectNotFound { .. } | DenseError::ElementNameNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            DenseError::DuplicateElementName(_) => StatusCode::CONFLICT,
            DenseError::ValueTypeChange { .. } => StatusCode::PRECONDITION_REQUIRED,
            DenseError::UnsupportedType(_) | DenseError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            DenseError::CorruptedStore(_)
            | DenseError::SerializationError(_)
            | DenseError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable tag carried in the `code` field.
    pub fn code(&self) -> &'static str {
        let err = match self {
            Self::Store(err) => err,
            Self::Request { .. } => return "invalid_request",
        };
        match err {
            DenseError::ObjectNotFound { .. } | DenseError::ElementNameNotFound { .. } => {
                "not_found"
            }
            DenseError::DuplicateElementName(_) => "duplicate_element_name",
            DenseError::ValueTypeChange { .. } => "value_type_change",
            DenseError::UnsupportedType(_) => "unsupported_type",
            DenseError::InvalidInput(_) => "invalid_input",
            DenseError::CorruptedStore(_) => "corrupted_store",
            DenseError::SerializationError(_) => "serialization_error",
            DenseError::IoError(_) => "io_error",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Store(err @ DenseError::ValueTypeChange { .. }) => {
                format!("{}; retry with allow_type_change: true", err)
            }
            Self::Store(err) => err.to_string(),
            Self::Request { message, .. } => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(error = %message, "request failed");
        } else {
            tracing::debug!(error = %message, status = status.as_u16(), "request rejected");
        }
        let body = ErrorResponse {
            error: message,
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
