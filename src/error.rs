//! Error values shared by the request and response layers.
//!
//! Every fallible operation returns `Result<T, EssenError>`. An `Ok` is the
//! "no error" case; the variant of an `Err` carries the error kind and its
//! message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors produced while reading request parameters or writing responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EssenError {
    /// Named parameter is missing or empty.
    #[error("InvalidParam: {0}")]
    InvalidParam(String),

    /// Requested header is absent or empty.
    #[error("NoHeader: {0}")]
    NoHeader(String),

    /// Malformed URL-encoded or multipart body.
    #[error("FormParseError: {0}")]
    FormParseError(String),

    /// A file could not be created or opened.
    #[error("PathError: {0}")]
    PathError(String),

    /// Streaming a file into the response failed.
    #[error("FileCopy: {0}")]
    FileCopy(String),

    /// Template could not be parsed or executed.
    #[error("TemplateError: {0}")]
    TemplateError(String),

    /// Value could not be serialized as JSON.
    #[error("JsonError: {0}")]
    JsonError(String),

    /// The request method resolves no body source.
    #[error("NoBody: {0}")]
    NoBody(String),
}

/// Result type for request/response operations.
pub type EssenResult<T> = Result<T, EssenError>;

impl EssenError {
    /// Missing-parameter error with the standard message.
    pub fn invalid_param(name: &str) -> Self {
        EssenError::InvalidParam(format!("No parameter with key \"{}\"", name))
    }

    /// Name of the error kind, e.g. `"InvalidParam"`.
    pub fn kind(&self) -> &'static str {
        match self {
            EssenError::InvalidParam(_) => "InvalidParam",
            EssenError::NoHeader(_) => "NoHeader",
            EssenError::FormParseError(_) => "FormParseError",
            EssenError::PathError(_) => "PathError",
            EssenError::FileCopy(_) => "FileCopy",
            EssenError::TemplateError(_) => "TemplateError",
            EssenError::JsonError(_) => "JsonError",
            EssenError::NoBody(_) => "NoBody",
        }
    }

    /// Human readable message, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            EssenError::InvalidParam(m)
            | EssenError::NoHeader(m)
            | EssenError::FormParseError(m)
            | EssenError::PathError(m)
            | EssenError::FileCopy(m)
            | EssenError::TemplateError(m)
            | EssenError::JsonError(m)
            | EssenError::NoBody(m) => m,
        }
    }

    /// HTTP status a handler replies with when it propagates this error.
    pub fn status(&self) -> StatusCode {
        match self {
            EssenError::InvalidParam(_)
            | EssenError::NoHeader(_)
            | EssenError::FormParseError(_)
            | EssenError::NoBody(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EssenError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), message = self.message(), "Request failed");
        } else {
            tracing::debug!(kind = self.kind(), message = self.message(), "Rejected request");
        }
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.message(),
        });
        (status, axum::Json(body)).into_response()
    }
}
